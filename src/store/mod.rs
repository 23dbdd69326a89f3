//! Data Record Store (§4.5) and Graph Relation Store (§4.6).

pub mod datarecord;
pub mod relation;

pub use datarecord::DataRecordStore;
pub use relation::RelationStore;
