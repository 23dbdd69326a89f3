//! Persistent schema catalog: four sub-databases (`classes`, `properties`,
//! `indexes`, `dbinfo`) plus the id allocators built on top of `dbinfo`.
//!
//! Follows the common `heed3` storage-facade pattern of holding typed
//! `heed3::Database` fields on a struct and exposing stateless methods that
//! take the caller's txn — the catalog does the same for its four tables.

use std::collections::HashSet;
use std::sync::OnceLock;

use heed3::{RoTxn, RwTxn};
use regex::Regex;

use crate::error::{EngineError, IndexError, Result, SchemaError};
use crate::ids::{ClassId, IndexId, PropertyId, MAX_CLASS_ID, MAX_INDEX_ID, MAX_PROPERTY_ID};
use crate::kv::{BytesDb, DbOpenFlags, KvEnv, U32Db};
use crate::value::PropertyType;

use super::{
    Class, ClassType, DbInfo, IndexDescriptor, Property, PropertyInfo, VIRTUAL_CLASS_NAME,
    VIRTUAL_DEPTH, VIRTUAL_RECORD_ID,
};

const DB_CLASSES: &str = "classes";
const DB_PROPERTIES: &str = "properties";
const DB_INDEXES: &str = "indexes";
const DB_DBINFO: &str = "dbinfo";

const KEY_MAX_CLASS_ID: &[u8] = b"max_class_id";
const KEY_NUM_CLASS: &[u8] = b"num_class";
const KEY_MAX_PROPERTY_ID: &[u8] = b"max_property_id";
const KEY_NUM_PROPERTY: &[u8] = b"num_property";
const KEY_MAX_INDEX_ID: &[u8] = b"max_index_id";
const KEY_NUM_INDEX: &[u8] = b"num_index";

/// Property-name-key padding width. Keys in `properties` are
/// `"{classId}:{name padded to this width}"` so that ordering is primary by
/// class id and secondary by name (§4.3).
const PROPERTY_NAME_KEY_WIDTH: usize = 64;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && identifier_regex().is_match(name)
}

fn validate_class_name(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(SchemaError::InvalidClassName(name.to_string()).into());
    }
    Ok(())
}

fn validate_property_name(name: &str) -> Result<()> {
    if !is_identifier(name) || super::is_virtual_property_name(name) || name.len() > PROPERTY_NAME_KEY_WIDTH {
        return Err(SchemaError::InvalidPropertyName(name.to_string()).into());
    }
    Ok(())
}

pub struct SchemaCatalog {
    classes: BytesDb,
    properties: BytesDb,
    indexes: U32Db,
    dbinfo: BytesDb,
}

impl SchemaCatalog {
    pub fn open(env: &KvEnv, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let classes = env.open_bytes_db(wtxn, DB_CLASSES, DbOpenFlags::default())?;
        let properties = env.open_bytes_db(wtxn, DB_PROPERTIES, DbOpenFlags::default())?;
        let indexes = env.open_u32_db(wtxn, DB_INDEXES, DbOpenFlags::default())?;
        let dbinfo = env.open_bytes_db(wtxn, DB_DBINFO, DbOpenFlags::default())?;
        let catalog = Self {
            classes,
            properties,
            indexes,
            dbinfo,
        };
        catalog.ensure_dbinfo_initialized(wtxn)?;
        Ok(catalog)
    }

    fn ensure_dbinfo_initialized(&self, wtxn: &mut RwTxn<'_>) -> Result<()> {
        if self.dbinfo.get(wtxn, KEY_MAX_CLASS_ID)?.is_none() {
            self.put_u16(wtxn, KEY_MAX_CLASS_ID, 0)?;
            self.put_u32(wtxn, KEY_NUM_CLASS, 0)?;
            self.put_u16(wtxn, KEY_MAX_PROPERTY_ID, 0)?;
            self.put_u32(wtxn, KEY_NUM_PROPERTY, 0)?;
            self.put_u16(wtxn, KEY_MAX_INDEX_ID, 0)?;
            self.put_u32(wtxn, KEY_NUM_INDEX, 0)?;
        }
        Ok(())
    }

    fn get_u16(&self, txn: &RoTxn<'_>, key: &[u8]) -> Result<u16> {
        Ok(self
            .dbinfo
            .get(txn, key)?
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or(0))
    }

    fn get_u32(&self, txn: &RoTxn<'_>, key: &[u8]) -> Result<u32> {
        Ok(self
            .dbinfo
            .get(txn, key)?
            .map(|b| u32::from_le_bytes(b.try_into().unwrap_or([0; 4])))
            .unwrap_or(0))
    }

    fn put_u16(&self, wtxn: &mut RwTxn<'_>, key: &[u8], v: u16) -> Result<()> {
        self.dbinfo.put(wtxn, key, &v.to_le_bytes())?;
        Ok(())
    }

    fn put_u32(&self, wtxn: &mut RwTxn<'_>, key: &[u8], v: u32) -> Result<()> {
        self.dbinfo.put(wtxn, key, &v.to_le_bytes())?;
        Ok(())
    }

    pub fn get_db_info(&self, txn: &RoTxn<'_>) -> Result<DbInfo> {
        Ok(DbInfo {
            max_class_id: self.get_u16(txn, KEY_MAX_CLASS_ID)?,
            num_class: self.get_u32(txn, KEY_NUM_CLASS)?,
            max_property_id: self.get_u16(txn, KEY_MAX_PROPERTY_ID)?,
            num_property: self.get_u32(txn, KEY_NUM_PROPERTY)?,
            max_index_id: self.get_u16(txn, KEY_MAX_INDEX_ID)?,
            num_index: self.get_u32(txn, KEY_NUM_INDEX)?,
        })
    }

    // ---- encode/decode helpers -------------------------------------------------

    fn encode_class_row(class_id: ClassId, super_class_id: ClassId, class_type: ClassType) -> [u8; 5] {
        let mut buf = [0u8; 5];
        buf[0..2].copy_from_slice(&class_id.to_le_bytes());
        buf[2..4].copy_from_slice(&super_class_id.to_le_bytes());
        buf[4] = class_type as u8;
        buf
    }

    fn decode_class_row(name: &str, bytes: &[u8]) -> Result<Class> {
        if bytes.len() < 5 {
            return Err(EngineError::Internal("truncated class row".into()));
        }
        let id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let super_class_id = u16::from_le_bytes([bytes[2], bytes[3]]);
        let class_type = ClassType::from_u8(bytes[4])
            .ok_or_else(|| EngineError::Internal("bad class type tag".into()))?;
        Ok(Class {
            id,
            name: name.to_string(),
            super_class_id,
            class_type,
        })
    }

    fn property_key(class_id: ClassId, name: &str) -> Vec<u8> {
        format!(
            "{class_id:05}:{name:<width$}",
            width = PROPERTY_NAME_KEY_WIDTH
        )
        .into_bytes()
    }

    fn property_key_prefix(class_id: ClassId) -> Vec<u8> {
        format!("{class_id:05}:").into_bytes()
    }

    fn encode_property_row(property_id: PropertyId, property_type: PropertyType) -> [u8; 3] {
        let mut buf = [0u8; 3];
        buf[0..2].copy_from_slice(&property_id.to_le_bytes());
        buf[2] = property_type.as_u8();
        buf
    }

    fn decode_property_row(class_id: ClassId, name: &str, bytes: &[u8]) -> Result<Property> {
        if bytes.len() < 3 {
            return Err(EngineError::Internal("truncated property row".into()));
        }
        let id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let property_type = PropertyType::from_u8(bytes[2])
            .ok_or_else(|| EngineError::Internal("bad property type tag".into()))?;
        Ok(Property {
            class_id,
            name: name.to_string(),
            id,
            property_type,
        })
    }

    fn index_key(class_id: ClassId, property_id: PropertyId) -> u32 {
        ((class_id as u32) << 16) | property_id as u32
    }

    fn encode_index_row(index_id: IndexId, unique: bool) -> [u8; 3] {
        let mut buf = [0u8; 3];
        buf[0..2].copy_from_slice(&index_id.to_le_bytes());
        buf[2] = unique as u8;
        buf
    }

    fn decode_index_row(class_id: ClassId, property_id: PropertyId, bytes: &[u8]) -> Result<IndexDescriptor> {
        if bytes.len() < 3 {
            return Err(EngineError::Internal("truncated index row".into()));
        }
        let id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let unique = bytes[2] != 0;
        Ok(IndexDescriptor {
            id,
            class_id,
            property_id,
            unique,
        })
    }

    // ---- classes ----------------------------------------------------------

    pub fn get_class_by_name(&self, txn: &RoTxn<'_>, name: &str) -> Result<Option<Class>> {
        match self.classes.get(txn, name.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode_class_row(name, bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_class_by_id(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Option<Class>> {
        for result in self.classes.iter(txn)? {
            let (name, bytes) = result?;
            let name = std::str::from_utf8(name).unwrap_or("");
            if bytes.len() >= 2 && u16::from_le_bytes([bytes[0], bytes[1]]) == class_id {
                return Ok(Some(Self::decode_class_row(name, bytes)?));
            }
        }
        Ok(None)
    }

    pub fn get_classes(&self, txn: &RoTxn<'_>) -> Result<Vec<Class>> {
        let mut out = Vec::new();
        for result in self.classes.iter(txn)? {
            let (name, bytes) = result?;
            let name = std::str::from_utf8(name).unwrap_or("");
            out.push(Self::decode_class_row(name, bytes)?);
        }
        Ok(out)
    }

    /// Direct subclasses only.
    pub fn get_subclasses(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<Class>> {
        Ok(self
            .get_classes(txn)?
            .into_iter()
            .filter(|c| c.super_class_id == class_id)
            .collect())
    }

    /// Transitive closure of subclasses, used by `*SubClassOf` query expansion
    /// (§4.9 GraphFilter expansion) and `findSubClassOf`.
    pub fn get_descendant_classes(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<ClassId>> {
        let all = self.get_classes(txn)?;
        let mut out = Vec::new();
        let mut frontier = vec![class_id];
        while let Some(current) = frontier.pop() {
            for c in &all {
                if c.super_class_id == current && c.super_class_id != 0 {
                    out.push(c.id);
                    frontier.push(c.id);
                }
            }
        }
        Ok(out)
    }

    /// Ancestor chain from `class_id` up to (not including) the root, nearest
    /// first. Used for property-collision checks and inherited lookup.
    pub fn get_ancestor_chain(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<ClassId>> {
        let mut chain = Vec::new();
        let mut current = self.get_class_by_id(txn, class_id)?;
        while let Some(class) = current {
            if class.super_class_id == 0 {
                break;
            }
            chain.push(class.super_class_id);
            current = self.get_class_by_id(txn, class.super_class_id)?;
        }
        Ok(chain)
    }

    pub fn add_class(
        &self,
        wtxn: &mut RwTxn<'_>,
        name: &str,
        super_class_id: ClassId,
        class_type: ClassType,
    ) -> Result<Class> {
        validate_class_name(name)?;
        if self.get_class_by_name(wtxn, name)?.is_some() {
            return Err(SchemaError::DuplicateClass(name.to_string()).into());
        }
        if super_class_id != 0 {
            let super_class = self
                .get_class_by_id(wtxn, super_class_id)?
                .ok_or_else(|| SchemaError::NoExistClass(format!("id {super_class_id}")))?;
            if super_class.class_type != class_type {
                return Err(SchemaError::MismatchClassType.into());
            }
        }
        let max_class_id = self.get_u16(wtxn, KEY_MAX_CLASS_ID)?;
        if max_class_id >= MAX_CLASS_ID {
            return Err(SchemaError::MaxClassReach.into());
        }
        let new_id = max_class_id + 1;
        let row = Self::encode_class_row(new_id, super_class_id, class_type);
        self.classes.put(wtxn, name.as_bytes(), &row)?;
        self.put_u16(wtxn, KEY_MAX_CLASS_ID, new_id)?;
        let num_class = self.get_u32(wtxn, KEY_NUM_CLASS)?;
        self.put_u32(wtxn, KEY_NUM_CLASS, num_class + 1)?;
        tracing::info!(class = name, id = new_id, "class created");
        Ok(Class {
            id: new_id,
            name: name.to_string(),
            super_class_id,
            class_type,
        })
    }

    pub fn rename_class(&self, wtxn: &mut RwTxn<'_>, class_id: ClassId, new_name: &str) -> Result<()> {
        validate_class_name(new_name)?;
        let class = self
            .get_class_by_id(wtxn, class_id)?
            .ok_or_else(|| SchemaError::NoExistClass(format!("id {class_id}")))?;
        if self.get_class_by_name(wtxn, new_name)?.is_some() {
            return Err(SchemaError::DuplicateClass(new_name.to_string()).into());
        }
        self.classes.delete(wtxn, class.name.as_bytes())?;
        let row = Self::encode_class_row(class.id, class.super_class_id, class.class_type);
        self.classes.put(wtxn, new_name.as_bytes(), &row)?;
        Ok(())
    }

    /// Drops the class's catalog rows: refuses if any index remains on any of
    /// its properties, removes property rows, and re-parents direct
    /// subclasses to this class's superclass (no cascade). Returns the
    /// subclass ids that were re-parented so the caller can log/react; data
    /// record / adjacency cleanup is the Transaction's job (§4.3, §4.6).
    pub fn drop_class(&self, wtxn: &mut RwTxn<'_>, class_id: ClassId) -> Result<Vec<ClassId>> {
        let class = self
            .get_class_by_id(wtxn, class_id)?
            .ok_or_else(|| SchemaError::NoExistClass(format!("id {class_id}")))?;

        let props = self.get_native_properties(wtxn, class_id)?;
        for p in &props {
            if self.get_index(wtxn, class_id, p.id)?.is_some() {
                return Err(SchemaError::InUsedProperty(p.name.clone()).into());
            }
        }

        for p in &props {
            let key = Self::property_key(class_id, &p.name);
            self.properties.delete(wtxn, &key)?;
            let num_property = self.get_u32(wtxn, KEY_NUM_PROPERTY)?;
            self.put_u32(wtxn, KEY_NUM_PROPERTY, num_property.saturating_sub(1))?;
        }

        let subclasses = self.get_subclasses(wtxn, class_id)?;
        for sub in &subclasses {
            let row = Self::encode_class_row(sub.id, class.super_class_id, sub.class_type);
            self.classes.put(wtxn, sub.name.as_bytes(), &row)?;
        }

        self.classes.delete(wtxn, class.name.as_bytes())?;
        let num_class = self.get_u32(wtxn, KEY_NUM_CLASS)?;
        self.put_u32(wtxn, KEY_NUM_CLASS, num_class.saturating_sub(1))?;

        Ok(subclasses.into_iter().map(|c| c.id).collect())
    }

    // ---- properties ---------------------------------------------------------

    fn get_native_properties(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<Property>> {
        let prefix = Self::property_key_prefix(class_id);
        let mut out = Vec::new();
        for result in self.properties.prefix_iter(txn, &prefix)? {
            let (key, bytes) = result?;
            let name = std::str::from_utf8(&key[prefix.len()..])
                .unwrap_or("")
                .trim_end();
            out.push(Self::decode_property_row(class_id, name, bytes)?);
        }
        Ok(out)
    }

    pub fn get_property(&self, txn: &RoTxn<'_>, class_id: ClassId, name: &str) -> Result<Option<Property>> {
        let key = Self::property_key(class_id, name);
        match self.properties.get(txn, &key)? {
            Some(bytes) => Ok(Some(Self::decode_property_row(class_id, name, bytes)?)),
            None => Ok(None),
        }
    }

    /// Walks up the superclass chain and returns the first match
    /// (`getExistingPropertyExtend`, §4.3).
    pub fn get_existing_property_extend(
        &self,
        txn: &RoTxn<'_>,
        class_id: ClassId,
        name: &str,
    ) -> Result<Option<Property>> {
        if let Some(p) = self.get_property(txn, class_id, name)? {
            return Ok(Some(p));
        }
        for ancestor in self.get_ancestor_chain(txn, class_id)? {
            if let Some(p) = self.get_property(txn, ancestor, name)? {
                return Ok(Some(p));
            }
        }
        Ok(None)
    }

    /// Union of native + inherited properties (I2), each tagged with whether
    /// it is inherited and from which class.
    pub fn get_properties(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<PropertyInfo>> {
        let mut out: Vec<PropertyInfo> = self
            .get_native_properties(txn, class_id)?
            .into_iter()
            .map(|p| PropertyInfo {
                name: p.name,
                id: p.id,
                property_type: p.property_type,
                owner_class_id: class_id,
                inherited: false,
            })
            .collect();
        for ancestor in self.get_ancestor_chain(txn, class_id)? {
            for p in self.get_native_properties(txn, ancestor)? {
                out.push(PropertyInfo {
                    name: p.name,
                    id: p.id,
                    property_type: p.property_type,
                    owner_class_id: ancestor,
                    inherited: true,
                });
            }
        }
        Ok(out)
    }

    /// `get_properties` plus the three virtual `@`-properties, used by the
    /// evaluator/traversal engine when materializing full records.
    pub fn get_property_name_map_info(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<PropertyInfo>> {
        let mut out = self.get_properties(txn, class_id)?;
        out.push(PropertyInfo {
            name: VIRTUAL_CLASS_NAME.to_string(),
            id: 0,
            property_type: PropertyType::Text,
            owner_class_id: class_id,
            inherited: false,
        });
        out.push(PropertyInfo {
            name: VIRTUAL_RECORD_ID.to_string(),
            id: 0,
            property_type: PropertyType::Text,
            owner_class_id: class_id,
            inherited: false,
        });
        out.push(PropertyInfo {
            name: VIRTUAL_DEPTH.to_string(),
            id: 0,
            property_type: PropertyType::UnsignedSmallInt,
            owner_class_id: class_id,
            inherited: false,
        });
        Ok(out)
    }

    pub fn add_property(
        &self,
        wtxn: &mut RwTxn<'_>,
        class_id: ClassId,
        name: &str,
        property_type: PropertyType,
    ) -> Result<Property> {
        validate_property_name(name)?;
        self.get_class_by_id(wtxn, class_id)?
            .ok_or_else(|| SchemaError::NoExistClass(format!("id {class_id}")))?;

        if self.get_property(wtxn, class_id, name)?.is_some() {
            return Err(SchemaError::DuplicateProperty(name.to_string()).into());
        }
        // Reject collision with any ancestor's or descendant's property of
        // the same name, anywhere in the inheritance chain (§3 Property).
        for ancestor in self.get_ancestor_chain(wtxn, class_id)? {
            if self.get_property(wtxn, ancestor, name)?.is_some() {
                return Err(SchemaError::OverrideProperty(name.to_string()).into());
            }
        }
        for descendant in self.get_descendant_classes(wtxn, class_id)? {
            if self.get_property(wtxn, descendant, name)?.is_some() {
                return Err(SchemaError::OverrideProperty(name.to_string()).into());
            }
        }

        let max_property_id = self.get_u16(wtxn, KEY_MAX_PROPERTY_ID)?;
        if max_property_id >= MAX_PROPERTY_ID {
            return Err(SchemaError::MaxPropertyReach.into());
        }
        let new_id = max_property_id + 1;
        let key = Self::property_key(class_id, name);
        let row = Self::encode_property_row(new_id, property_type);
        self.properties.put(wtxn, &key, &row)?;
        self.put_u16(wtxn, KEY_MAX_PROPERTY_ID, new_id)?;
        let num_property = self.get_u32(wtxn, KEY_NUM_PROPERTY)?;
        self.put_u32(wtxn, KEY_NUM_PROPERTY, num_property + 1)?;
        Ok(Property {
            class_id,
            name: name.to_string(),
            id: new_id,
            property_type,
        })
    }

    pub fn rename_property(
        &self,
        wtxn: &mut RwTxn<'_>,
        class_id: ClassId,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        validate_property_name(new_name)?;
        let prop = self
            .get_property(wtxn, class_id, old_name)?
            .ok_or_else(|| SchemaError::NoExistProperty(old_name.to_string()))?;
        if self.get_property(wtxn, class_id, new_name)?.is_some() {
            return Err(SchemaError::DuplicateProperty(new_name.to_string()).into());
        }
        let old_key = Self::property_key(class_id, old_name);
        self.properties.delete(wtxn, &old_key)?;
        let new_key = Self::property_key(class_id, new_name);
        let row = Self::encode_property_row(prop.id, prop.property_type);
        self.properties.put(wtxn, &new_key, &row)?;
        Ok(())
    }

    pub fn drop_property(&self, wtxn: &mut RwTxn<'_>, class_id: ClassId, name: &str) -> Result<()> {
        let prop = self
            .get_property(wtxn, class_id, name)?
            .ok_or_else(|| SchemaError::NoExistProperty(name.to_string()))?;
        if self.get_index(wtxn, class_id, prop.id)?.is_some() {
            return Err(SchemaError::InUsedProperty(name.to_string()).into());
        }
        let key = Self::property_key(class_id, name);
        self.properties.delete(wtxn, &key)?;
        let num_property = self.get_u32(wtxn, KEY_NUM_PROPERTY)?;
        self.put_u32(wtxn, KEY_NUM_PROPERTY, num_property.saturating_sub(1))?;
        Ok(())
    }

    // ---- indexes ------------------------------------------------------------

    pub fn get_index(&self, txn: &RoTxn<'_>, class_id: ClassId, property_id: PropertyId) -> Result<Option<IndexDescriptor>> {
        let key = Self::index_key(class_id, property_id);
        match self.indexes.get(txn, &key)? {
            Some(bytes) => Ok(Some(Self::decode_index_row(class_id, property_id, bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_index_by_id(&self, txn: &RoTxn<'_>, index_id: IndexId) -> Result<Option<IndexDescriptor>> {
        for result in self.indexes.iter(txn)? {
            let (key, bytes) = result?;
            if bytes.len() >= 2 && u16::from_le_bytes([bytes[0], bytes[1]]) == index_id {
                let class_id = (key >> 16) as ClassId;
                let property_id = (key & 0xFFFF) as PropertyId;
                return Ok(Some(Self::decode_index_row(class_id, property_id, bytes)?));
            }
        }
        Ok(None)
    }

    pub fn get_indexes(&self, txn: &RoTxn<'_>, class_id: ClassId) -> Result<Vec<IndexDescriptor>> {
        let lo: u32 = (class_id as u32) << 16;
        let hi: u32 = lo | 0xFFFF;
        let mut out = Vec::new();
        for result in self.indexes.range(txn, &(lo..=hi))? {
            let (key, bytes) = result?;
            let property_id = (key & 0xFFFF) as PropertyId;
            out.push(Self::decode_index_row(class_id, property_id, bytes)?);
        }
        Ok(out)
    }

    pub fn add_index(
        &self,
        wtxn: &mut RwTxn<'_>,
        class_id: ClassId,
        property_id: PropertyId,
        unique: bool,
    ) -> Result<IndexDescriptor> {
        if self.get_index(wtxn, class_id, property_id)?.is_some() {
            return Err(IndexError::DuplicateIndex.into());
        }
        let max_index_id = self.get_u16(wtxn, KEY_MAX_INDEX_ID)?;
        if max_index_id >= MAX_INDEX_ID {
            return Err(SchemaError::MaxIndexReach.into());
        }
        let new_id = max_index_id + 1;
        let key = Self::index_key(class_id, property_id);
        let row = Self::encode_index_row(new_id, unique);
        self.indexes.put(wtxn, &key, &row)?;
        self.put_u16(wtxn, KEY_MAX_INDEX_ID, new_id)?;
        let num_index = self.get_u32(wtxn, KEY_NUM_INDEX)?;
        self.put_u32(wtxn, KEY_NUM_INDEX, num_index + 1)?;
        Ok(IndexDescriptor {
            id: new_id,
            class_id,
            property_id,
            unique,
        })
    }

    pub fn drop_index(&self, wtxn: &mut RwTxn<'_>, class_id: ClassId, property_id: PropertyId) -> Result<IndexDescriptor> {
        let descriptor = self
            .get_index(wtxn, class_id, property_id)?
            .ok_or(IndexError::NoExistIndex)?;
        let key = Self::index_key(class_id, property_id);
        self.indexes.delete(wtxn, &key)?;
        let num_index = self.get_u32(wtxn, KEY_NUM_INDEX)?;
        self.put_u32(wtxn, KEY_NUM_INDEX, num_index.saturating_sub(1))?;
        Ok(descriptor)
    }

    /// Resolves `*SubClassOf` class-name sets (§4.9 GraphFilter expansion)
    /// into the transitive closure of concrete class ids.
    pub fn expand_subclass_of_names(&self, txn: &RoTxn<'_>, names: &HashSet<String>) -> Result<HashSet<ClassId>> {
        let mut out = HashSet::new();
        for name in names {
            if let Some(class) = self.get_class_by_name(txn, name)? {
                out.insert(class.id);
                out.extend(self.get_descendant_classes(txn, class.id)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvEnvOptions;
    use tempfile::tempdir;

    fn open_catalog() -> (tempfile::TempDir, KvEnv, SchemaCatalog) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let catalog = SchemaCatalog::open(&env, &mut wtxn).unwrap();
        wtxn.commit().unwrap();
        (dir, env, catalog)
    }

    #[test]
    fn add_class_allocates_monotonic_ids() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let a = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let b = catalog.add_class(&mut wtxn, "B", 0, ClassType::Vertex).unwrap();
        assert_eq!(b.id, a.id + 1);
    }

    #[test]
    fn duplicate_class_name_rejected() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let err = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::DuplicateClass(_))));
    }

    #[test]
    fn subclass_must_match_superclass_type() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let v = catalog.add_class(&mut wtxn, "V", 0, ClassType::Vertex).unwrap();
        let err = catalog
            .add_class(&mut wtxn, "E", v.id, ClassType::Edge)
            .unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::MismatchClassType)));
    }

    #[test]
    fn property_collides_with_ancestor_and_descendant() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let a = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let b = catalog.add_class(&mut wtxn, "B", a.id, ClassType::Vertex).unwrap();
        catalog
            .add_property(&mut wtxn, a.id, "p", PropertyType::Text)
            .unwrap();
        let err = catalog
            .add_property(&mut wtxn, b.id, "p", PropertyType::Text)
            .unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::OverrideProperty(_))));
    }

    #[test]
    fn inheritance_chain_lookup_finds_ancestor_property() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let a = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let b = catalog.add_class(&mut wtxn, "B", a.id, ClassType::Vertex).unwrap();
        let c = catalog.add_class(&mut wtxn, "C", b.id, ClassType::Vertex).unwrap();
        catalog
            .add_property(&mut wtxn, a.id, "p", PropertyType::Text)
            .unwrap();
        let found = catalog
            .get_existing_property_extend(&wtxn, c.id, "p")
            .unwrap();
        assert!(found.is_some());
        let props = catalog.get_properties(&wtxn, c.id).unwrap();
        assert!(props.iter().any(|p| p.name == "p" && p.inherited));
    }

    #[test]
    fn drop_class_refuses_while_index_exists() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let a = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let p = catalog
            .add_property(&mut wtxn, a.id, "k", PropertyType::Integer)
            .unwrap();
        catalog.add_index(&mut wtxn, a.id, p.id, false).unwrap();
        let err = catalog.drop_class(&mut wtxn, a.id).unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::InUsedProperty(_))));
    }

    #[test]
    fn drop_class_reparents_direct_subclasses() {
        let (_dir, env, catalog) = open_catalog();
        let mut wtxn = env.write_txn().unwrap();
        let a = catalog.add_class(&mut wtxn, "A", 0, ClassType::Vertex).unwrap();
        let b = catalog.add_class(&mut wtxn, "B", a.id, ClassType::Vertex).unwrap();
        let c = catalog.add_class(&mut wtxn, "C", b.id, ClassType::Vertex).unwrap();
        catalog.drop_class(&mut wtxn, b.id).unwrap();
        let c_after = catalog.get_class_by_id(&wtxn, c.id).unwrap().unwrap();
        assert_eq!(c_after.super_class_id, a.id);
    }
}
