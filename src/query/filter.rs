//! `GraphFilter`: a condition/predicate plus class include/exclude sets
//! (§4.9). Used by both the query evaluator and the traversal engine to
//! filter candidate vertices/edges.

use std::collections::HashSet;

use heed3::RoTxn;

use crate::error::Result;
use crate::ids::ClassId;
use crate::record::Record;
use crate::schema::SchemaCatalog;

use super::multi_condition::Node;

/// Four class-name sets, expanded once per evaluation against the schema
/// catalog (§4.9 "Expansion resolves `*subclass-of` into the transitive
/// closure of subclasses").
#[derive(Debug, Clone, Default)]
pub struct ClassFilterSpec {
    pub only_classes: HashSet<String>,
    pub only_subclass_of: HashSet<String>,
    pub ignore_classes: HashSet<String>,
    pub ignore_subclass_of: HashSet<String>,
}

pub struct GraphFilter {
    pub node: Option<Node>,
    classes: ClassFilterSpec,
}

impl GraphFilter {
    pub fn new(node: Option<Node>, classes: ClassFilterSpec) -> Self {
        Self { node, classes }
    }

    pub fn everything() -> Self {
        Self {
            node: None,
            classes: ClassFilterSpec::default(),
        }
    }

    fn class_allowed(&self, catalog: &SchemaCatalog, txn: &RoTxn<'_>, class_id: ClassId) -> Result<bool> {
        let spec = &self.classes;
        if !spec.only_classes.is_empty() || !spec.only_subclass_of.is_empty() {
            let mut allowed = catalog.get_class_by_id(txn, class_id)?.map(|c| spec.only_classes.contains(&c.name)).unwrap_or(false);
            if !allowed && !spec.only_subclass_of.is_empty() {
                let expanded = catalog.expand_subclass_of_names(txn, &spec.only_subclass_of)?;
                allowed = expanded.contains(&class_id);
            }
            if !allowed {
                return Ok(false);
            }
        }
        if !spec.ignore_classes.is_empty() {
            if let Some(c) = catalog.get_class_by_id(txn, class_id)? {
                if spec.ignore_classes.contains(&c.name) {
                    return Ok(false);
                }
            }
        }
        if !spec.ignore_subclass_of.is_empty() {
            let expanded = catalog.expand_subclass_of_names(txn, &spec.ignore_subclass_of)?;
            if expanded.contains(&class_id) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Applies the class-set filter first (cheap, no record decode needed),
    /// then the condition/predicate tree against the record.
    pub fn matches(
        &self,
        catalog: &SchemaCatalog,
        txn: &RoTxn<'_>,
        class_id: ClassId,
        record: &Record,
    ) -> Result<bool> {
        if !self.class_allowed(catalog, txn, class_id)? {
            return Ok(false);
        }
        match &self.node {
            Some(node) => node.evaluate(record),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvEnv, KvEnvOptions};
    use crate::schema::ClassType;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, KvEnv, SchemaCatalog, ClassId, ClassId) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let catalog = SchemaCatalog::open(&env, &mut wtxn).unwrap();
        let animal = catalog.add_class(&mut wtxn, "Animal", 0, ClassType::Vertex).unwrap();
        let dog = catalog.add_class(&mut wtxn, "Dog", animal.id, ClassType::Vertex).unwrap();
        wtxn.commit().unwrap();
        (dir, env, catalog, animal.id, dog.id)
    }

    #[test]
    fn only_subclass_of_admits_descendants() {
        let (_dir, env, catalog, animal_id, dog_id) = setup();
        let txn = env.read_txn().unwrap();
        let mut spec = ClassFilterSpec::default();
        spec.only_subclass_of.insert("Animal".to_string());
        let filter = GraphFilter::new(None, spec);
        assert!(filter.matches(&catalog, &txn, animal_id, &Record::new()).unwrap());
        assert!(filter.matches(&catalog, &txn, dog_id, &Record::new()).unwrap());
    }

    #[test]
    fn ignore_classes_excludes_named_class() {
        let (_dir, env, catalog, animal_id, dog_id) = setup();
        let txn = env.read_txn().unwrap();
        let mut spec = ClassFilterSpec::default();
        spec.ignore_classes.insert("Dog".to_string());
        let filter = GraphFilter::new(None, spec);
        assert!(filter.matches(&catalog, &txn, animal_id, &Record::new()).unwrap());
        assert!(!filter.matches(&catalog, &txn, dog_id, &Record::new()).unwrap());
    }
}
