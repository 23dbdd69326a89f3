//! In-memory `Record` (name → `Value`, plus the `@`-prefixed basic-info
//! sub-map) and the schema-aware encode/decode that sits on top of the raw
//! binary layout in `codec` (§4.4, §3 Record/RecordDescriptor).

pub mod codec;

use std::collections::HashMap;

use heed3::RoTxn;

use crate::error::{EngineError, Result, SchemaError};
use crate::ids::{ClassId, PropertyId, RecordId, VersionId};
use crate::schema::{is_virtual_property_name, SchemaCatalog};
use crate::value::Value;

/// A decoded record: user properties keyed by name, plus the basic-info
/// fields backing the virtual `@className` / `@recordId` / `@depth`
/// properties (§3 Record, RecordDescriptor).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    properties: HashMap<String, Value>,
    class_name: Option<String>,
    record_id: Option<RecordId>,
    depth: Option<u16>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a user property. Rejects any name beginning with `@` — those are
    /// read-only, evaluator/traversal-maintained basic info (§3 Reserved
    /// properties).
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if is_virtual_property_name(name) {
            return Err(SchemaError::InvalidPropertyName(name.to_string()).into());
        }
        self.properties.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn depth(&self) -> Option<u16> {
        self.depth
    }

    pub(crate) fn set_basic_info(&mut self, class_name: &str, record_id: RecordId) {
        self.class_name = Some(class_name.to_string());
        self.record_id = Some(record_id);
    }

    pub(crate) fn set_depth(&mut self, depth: u16) {
        self.depth = Some(depth);
    }
}

fn triples_from_record(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    record: &Record,
) -> Result<Vec<(PropertyId, Vec<u8>)>> {
    let mut triples = Vec::with_capacity(record.properties.len());
    for (name, value) in &record.properties {
        let prop = catalog
            .get_existing_property_extend(txn, class_id, name)?
            .ok_or_else(|| SchemaError::NoExistProperty(name.clone()))?;
        if let Some(value_type) = value.property_type() {
            if value_type != prop.property_type {
                return Err(SchemaError::InvalidPropType.into());
            }
        }
        triples.push((prop.id, value.encode()));
    }
    triples.sort_by_key(|(id, _)| *id);
    Ok(triples)
}

fn record_from_triples(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    triples: Vec<(PropertyId, Vec<u8>)>,
) -> Result<Record> {
    let info = catalog.get_property_name_map_info(txn, class_id)?;
    let mut by_id = HashMap::new();
    for p in &info {
        if p.id != 0 {
            by_id.insert(p.id, p);
        }
    }
    let mut record = Record::new();
    for (id, bytes) in triples {
        // Bytes referencing a since-dropped property id have no schema
        // counterpart left to decode them against; drop them rather than
        // fail the whole record.
        if let Some(p) = by_id.get(&id) {
            let value = Value::decode(p.property_type, &bytes)?;
            record.properties.insert(p.name.clone(), value);
        }
    }
    Ok(record)
}

fn blob_err(e: crate::codec::BlobError) -> EngineError {
    EngineError::Internal(format!("malformed record bytes: {e}"))
}

pub fn encode_vertex(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    record: &Record,
    versioned: bool,
    version: VersionId,
) -> Result<Vec<u8>> {
    let triples = triples_from_record(catalog, txn, class_id, record)?;
    Ok(codec::VertexRecord {
        version: versioned.then_some(version),
        triples,
    }
    .encode())
}

pub fn decode_vertex(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    record_id: RecordId,
    class_name: &str,
    bytes: &[u8],
    versioned: bool,
) -> Result<(Record, Option<VersionId>)> {
    let parsed = codec::VertexRecord::decode(bytes, versioned).map_err(blob_err)?;
    let mut record = record_from_triples(catalog, txn, class_id, parsed.triples)?;
    record.set_basic_info(class_name, record_id);
    Ok((record, parsed.version))
}

#[allow(clippy::too_many_arguments)]
pub fn encode_edge(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    src: RecordId,
    dst: RecordId,
    record: &Record,
    versioned: bool,
    version: VersionId,
) -> Result<Vec<u8>> {
    let triples = triples_from_record(catalog, txn, class_id, record)?;
    Ok(codec::EdgeRecord {
        version: versioned.then_some(version),
        src,
        dst,
        triples,
    }
    .encode())
}

#[allow(clippy::too_many_arguments)]
pub fn decode_edge(
    catalog: &SchemaCatalog,
    txn: &RoTxn<'_>,
    class_id: ClassId,
    record_id: RecordId,
    class_name: &str,
    bytes: &[u8],
    versioned: bool,
) -> Result<(Record, RecordId, RecordId, Option<VersionId>)> {
    let parsed = codec::EdgeRecord::decode(bytes, versioned).map_err(blob_err)?;
    let mut record = record_from_triples(catalog, txn, class_id, parsed.triples)?;
    record.set_basic_info(class_name, record_id);
    Ok((record, parsed.src, parsed.dst, parsed.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvEnv, KvEnvOptions};
    use crate::schema::ClassType;
    use crate::value::{PropertyType, Value};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, KvEnv, SchemaCatalog, ClassId) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let catalog = SchemaCatalog::open(&env, &mut wtxn).unwrap();
        let class = catalog
            .add_class(&mut wtxn, "Words", 0, ClassType::Vertex)
            .unwrap();
        catalog
            .add_property(&mut wtxn, class.id, "messaged", PropertyType::Text)
            .unwrap();
        wtxn.commit().unwrap();
        (dir, env, catalog, class.id)
    }

    #[test]
    fn encode_decode_vertex_roundtrip() {
        let (_dir, env, catalog, class_id) = setup();
        let txn = env.read_txn().unwrap();
        let mut record = Record::new();
        record.set("messaged", Value::Text("Hello".into())).unwrap();

        let bytes = encode_vertex(&catalog, &txn, class_id, &record, true, 1).unwrap();
        let rid = RecordId::new(class_id, 0);
        let (decoded, version) =
            decode_vertex(&catalog, &txn, class_id, rid, "Words", &bytes, true).unwrap();
        assert_eq!(version, Some(1));
        assert_eq!(decoded.get("messaged"), Some(&Value::Text("Hello".into())));
        assert_eq!(decoded.record_id(), Some(rid));
    }

    #[test]
    fn set_rejects_virtual_property_name() {
        let mut record = Record::new();
        let err = record.set("@depth", Value::UnsignedSmallInt(1)).unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::InvalidPropertyName(_))));
    }

    #[test]
    fn encode_unknown_property_name_rejected() {
        let (_dir, env, catalog, class_id) = setup();
        let txn = env.read_txn().unwrap();
        let mut record = Record::new();
        record.set("nope", Value::Text("x".into())).unwrap();
        let err = encode_vertex(&catalog, &txn, class_id, &record, false, 0).unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::NoExistProperty(_))));
    }
}
