//! Property types and decoded values: a tagged enum over the primitive
//! numeric widths plus text and blob, narrowed to the set §3 "Property"
//! actually names.

use std::cmp::Ordering;

use crate::error::EngineError;

/// A property's declared type (§3 Property). Immutable once a property is
/// created — there is no schema-evolution path for changing it (Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyType {
    TinyInt = 0,
    UnsignedTinyInt = 1,
    SmallInt = 2,
    UnsignedSmallInt = 3,
    Integer = 4,
    UnsignedInteger = 5,
    BigInt = 6,
    UnsignedBigInt = 7,
    Real = 8,
    Text = 9,
    Blob = 10,
}

impl PropertyType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        use PropertyType::*;
        Some(match tag {
            0 => TinyInt,
            1 => UnsignedTinyInt,
            2 => SmallInt,
            3 => UnsignedSmallInt,
            4 => Integer,
            5 => UnsignedInteger,
            6 => BigInt,
            7 => UnsignedBigInt,
            8 => Real,
            9 => Text,
            10 => Blob,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PropertyType::Text | PropertyType::Blob)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PropertyType::TinyInt
                | PropertyType::SmallInt
                | PropertyType::Integer
                | PropertyType::BigInt
                | PropertyType::Real
        )
    }

    /// BLOB (and the sentinel "undefined" state) cannot back a secondary
    /// index (§3 Index invariants).
    pub fn is_indexable(self) -> bool {
        !matches!(self, PropertyType::Blob)
    }
}

/// A decoded property value, used by the condition evaluator and by callers
/// reading records back out. `Bytes(Vec<u8>)` is never produced for anything
/// but `Blob` and genuinely undecodable values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    TinyInt(i8),
    UnsignedTinyInt(u8),
    SmallInt(i16),
    UnsignedSmallInt(u16),
    Integer(i32),
    UnsignedInteger(u32),
    BigInt(i64),
    UnsignedBigInt(u64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Property present in the schema but absent (or zero-length) on this
    /// record — distinct from the property not existing at all.
    Null,
}

impl Value {
    pub fn property_type(&self) -> Option<PropertyType> {
        Some(match self {
            Value::TinyInt(_) => PropertyType::TinyInt,
            Value::UnsignedTinyInt(_) => PropertyType::UnsignedTinyInt,
            Value::SmallInt(_) => PropertyType::SmallInt,
            Value::UnsignedSmallInt(_) => PropertyType::UnsignedSmallInt,
            Value::Integer(_) => PropertyType::Integer,
            Value::UnsignedInteger(_) => PropertyType::UnsignedInteger,
            Value::BigInt(_) => PropertyType::BigInt,
            Value::UnsignedBigInt(_) => PropertyType::UnsignedBigInt,
            Value::Real(_) => PropertyType::Real,
            Value::Text(_) => PropertyType::Text,
            Value::Blob(_) => PropertyType::Blob,
            Value::Null => return None,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Decodes raw little-endian property bytes per the declared type
    /// (§3 Record: "Value bytes are length-prefixed raw bytes in the
    /// property's type's natural little-endian representation").
    pub fn decode(ty: PropertyType, bytes: &[u8]) -> Result<Value, EngineError> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(match ty {
            PropertyType::TinyInt => Value::TinyInt(bytes[0] as i8),
            PropertyType::UnsignedTinyInt => Value::UnsignedTinyInt(bytes[0]),
            PropertyType::SmallInt => Value::SmallInt(i16::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::UnsignedSmallInt => Value::UnsignedSmallInt(u16::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::Integer => Value::Integer(i32::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::UnsignedInteger => Value::UnsignedInteger(u32::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::BigInt => Value::BigInt(i64::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::UnsignedBigInt => Value::UnsignedBigInt(u64::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::Real => Value::Real(f64::from_le_bytes(
                bytes.try_into().map_err(|_| decode_err(ty))?,
            )),
            PropertyType::Text => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
            PropertyType::Blob => Value::Blob(bytes.to_vec()),
        })
    }

    /// Encodes back to the natural little-endian byte representation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::TinyInt(v) => vec![*v as u8],
            Value::UnsignedTinyInt(v) => vec![*v],
            Value::SmallInt(v) => v.to_le_bytes().to_vec(),
            Value::UnsignedSmallInt(v) => v.to_le_bytes().to_vec(),
            Value::Integer(v) => v.to_le_bytes().to_vec(),
            Value::UnsignedInteger(v) => v.to_le_bytes().to_vec(),
            Value::BigInt(v) => v.to_le_bytes().to_vec(),
            Value::UnsignedBigInt(v) => v.to_le_bytes().to_vec(),
            Value::Real(v) => v.to_le_bytes().to_vec(),
            Value::Text(s) => s.as_bytes().to_vec(),
            Value::Blob(b) => b.clone(),
            Value::Null => Vec::new(),
        }
    }

    /// Numeric ordering key used by the secondary index and by range
    /// comparators. Only meaningful for numeric types.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Value::TinyInt(v) => *v as f64,
            Value::UnsignedTinyInt(v) => *v as f64,
            Value::SmallInt(v) => *v as f64,
            Value::UnsignedSmallInt(v) => *v as f64,
            Value::Integer(v) => *v as f64,
            Value::UnsignedInteger(v) => *v as f64,
            Value::BigInt(v) => *v as f64,
            Value::UnsignedBigInt(v) => *v as f64,
            Value::Real(v) => *v,
            _ => return None,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn partial_cmp_numeric(&self, other: &Value) -> Option<Ordering> {
        self.as_f64()?.partial_cmp(&other.as_f64()?)
    }
}

fn decode_err(ty: PropertyType) -> EngineError {
    EngineError::Internal(format!("malformed value bytes for {ty:?}"))
}

impl std::fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PropertyType::TinyInt => "TINYINT",
            PropertyType::UnsignedTinyInt => "UNSIGNED_TINYINT",
            PropertyType::SmallInt => "SMALLINT",
            PropertyType::UnsignedSmallInt => "UNSIGNED_SMALLINT",
            PropertyType::Integer => "INTEGER",
            PropertyType::UnsignedInteger => "UNSIGNED_INTEGER",
            PropertyType::BigInt => "BIGINT",
            PropertyType::UnsignedBigInt => "UNSIGNED_BIGINT",
            PropertyType::Real => "REAL",
            PropertyType::Text => "TEXT",
            PropertyType::Blob => "BLOB",
        };
        f.write_str(s)
    }
}
