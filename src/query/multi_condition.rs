//! `MultiCondition`: a boolean AST of `Condition` leaves, plain predicate
//! leaves, and nested `MultiCondition`s (§4.9).

use crate::error::Result;
use crate::record::Record;
use crate::value::PropertyType;

use super::condition::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

pub enum Leaf {
    Condition(Condition),
    /// A plain record predicate callback — never indexable (§4.10: "indexable
    /// only if every leaf is a `Condition`, no callback leaves").
    Predicate(Box<dyn Fn(&Record) -> bool>),
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leaf::Condition(c) => f.debug_tuple("Condition").field(c).finish(),
            Leaf::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

pub enum Node {
    Leaf(Leaf),
    Branch {
        op: BoolOp,
        negative: bool,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf(l) => write!(f, "{l:?}"),
            Node::Branch { op, negative, left, right } => {
                f.debug_struct("Branch").field("op", op).field("negative", negative).field("left", left).field("right", right).finish()
            }
        }
    }
}

impl Node {
    pub fn leaf(condition: Condition) -> Self {
        Node::Leaf(Leaf::Condition(condition))
    }

    pub fn predicate(f: impl Fn(&Record) -> bool + 'static) -> Self {
        Node::Leaf(Leaf::Predicate(Box::new(f)))
    }

    pub fn and(self, other: Node) -> Self {
        Node::Branch {
            op: BoolOp::And,
            negative: false,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Node) -> Self {
        Node::Branch {
            op: BoolOp::Or,
            negative: false,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn negate(mut self) -> Self {
        match &mut self {
            Node::Branch { negative, .. } => *negative = !*negative,
            Node::Leaf(Leaf::Condition(c)) => c.negative = !c.negative,
            Node::Leaf(Leaf::Predicate(_)) => {}
        }
        self
    }

    /// True only if every leaf under this node is a `Condition` — callback
    /// leaves always force a full scan (§4.10).
    pub fn is_condition_only(&self) -> bool {
        match self {
            Node::Leaf(Leaf::Condition(_)) => true,
            Node::Leaf(Leaf::Predicate(_)) => false,
            Node::Branch { left, right, .. } => left.is_condition_only() && right.is_condition_only(),
        }
    }

    /// Short-circuit evaluation against a record, preferring the right child
    /// when it is cheaper to check first (§4.9: "the right child preferred
    /// when it is a leaf").
    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        match self {
            Node::Leaf(Leaf::Predicate(f)) => Ok(f(record)),
            Node::Leaf(Leaf::Condition(c)) => {
                let stored = record.get(&c.property_name);
                let ty = stored.and_then(|v| v.property_type());
                c.evaluate(stored, ty.unwrap_or(PropertyType::Text))
            }
            Node::Branch { op, negative, left, right } => {
                let result = if matches!(right.as_ref(), Node::Leaf(_)) {
                    let r = right.evaluate(record)?;
                    match (op, r) {
                        (BoolOp::And, false) => false,
                        (BoolOp::Or, true) => true,
                        _ => {
                            let l = left.evaluate(record)?;
                            match op {
                                BoolOp::And => l && r,
                                BoolOp::Or => l || r,
                            }
                        }
                    }
                } else {
                    let l = left.evaluate(record)?;
                    match (op, l) {
                        (BoolOp::And, false) => false,
                        (BoolOp::Or, true) => true,
                        _ => {
                            let r = right.evaluate(record)?;
                            match op {
                                BoolOp::And => l && r,
                                BoolOp::Or => l || r,
                            }
                        }
                    }
                };
                Ok(result ^ negative)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::Comparator;
    use crate::value::Value;

    fn record_with(name: &str, value: Value) -> Record {
        let mut r = Record::new();
        r.set(name, value).unwrap();
        r
    }

    #[test]
    fn and_requires_both_conditions() {
        let node = Node::leaf(Condition::new("a", Comparator::Equal).with_value(Value::Integer(1)))
            .and(Node::leaf(Condition::new("b", Comparator::Equal).with_value(Value::Integer(2))));
        let mut r = Record::new();
        r.set("a", Value::Integer(1)).unwrap();
        r.set("b", Value::Integer(2)).unwrap();
        assert!(node.evaluate(&r).unwrap());

        let mut r2 = Record::new();
        r2.set("a", Value::Integer(1)).unwrap();
        r2.set("b", Value::Integer(3)).unwrap();
        assert!(!node.evaluate(&r2).unwrap());
    }

    #[test]
    fn or_with_negation_flips_result() {
        let node = Node::leaf(Condition::new("a", Comparator::Equal).with_value(Value::Integer(1)))
            .or(Node::leaf(Condition::new("b", Comparator::Equal).with_value(Value::Integer(2))))
            .negate();
        let r = record_with("a", Value::Integer(1));
        assert!(!node.evaluate(&r).unwrap());
    }

    #[test]
    fn predicate_leaf_forces_non_indexable() {
        let node = Node::leaf(Condition::new("a", Comparator::Equal).with_value(Value::Integer(1)))
            .and(Node::predicate(|r: &Record| r.get("a").is_some()));
        assert!(!node.is_condition_only());
    }

    #[test]
    fn condition_only_tree_is_indexable() {
        let node = Node::leaf(Condition::new("a", Comparator::Equal).with_value(Value::Integer(1)))
            .and(Node::leaf(Condition::new("b", Comparator::Equal).with_value(Value::Integer(2))));
        assert!(node.is_condition_only());
    }
}
