//! Condition model (§4.9) and Query Evaluator (§4.10).

pub mod condition;
pub mod evaluator;
pub mod filter;
pub mod multi_condition;

pub use condition::{Comparator, Condition};
pub use evaluator::{find, QueryBackend};
pub use filter::{ClassFilterSpec, GraphFilter};
pub use multi_condition::{BoolOp, Leaf, Node};
