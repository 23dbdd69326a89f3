//! Error kinds, layered per component: one `thiserror` enum per layer, all
//! folding into a single top-level `EngineError` via `#[from]`.

use std::fmt;

use thiserror::Error;

/// Errors surfaced by the KV access facade (`crate::kv`).
#[derive(Debug, Error)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("unique key already exists")]
    KeyExist,

    #[error("map is full")]
    MapFull,
}

impl From<heed3::Error> for KvError {
    fn from(error: heed3::Error) -> Self {
        match error {
            heed3::Error::Mdb(heed3::MdbError::KeyExist) => KvError::KeyExist,
            heed3::Error::Mdb(heed3::MdbError::MapFull) => KvError::MapFull,
            other => KvError::Backend(other.to_string()),
        }
    }
}

/// Errors from the schema catalog (§4.3, §7 Context/Schema).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("INVALID_CLASSNAME: {0}")]
    InvalidClassName(String),

    #[error("DUPLICATE_CLASS: {0}")]
    DuplicateClass(String),

    #[error("NOEXST_CLASS: {0}")]
    NoExistClass(String),

    #[error("INVALID_CLASSTYPE")]
    InvalidClassType,

    #[error("MISMATCH_CLASSTYPE")]
    MismatchClassType,

    #[error("DUPLICATE_PROPERTY: {0}")]
    DuplicateProperty(String),

    #[error("OVERRIDE_PROPERTY: {0}")]
    OverrideProperty(String),

    #[error("NOEXST_PROPERTY: {0}")]
    NoExistProperty(String),

    #[error("INVALID_PROPTYPE")]
    InvalidPropType,

    #[error("CONFLICT_PROPTYPE")]
    ConflictPropType,

    #[error("IN_USED_PROPERTY: {0}")]
    InUsedProperty(String),

    #[error("INVALID_PROPERTYNAME: {0}")]
    InvalidPropertyName(String),

    #[error("MAXCLASS_REACH")]
    MaxClassReach,

    #[error("MAXPROPERTY_REACH")]
    MaxPropertyReach,

    #[error("MAXINDEX_REACH")]
    MaxIndexReach,
}

/// Errors from graph data operations (§7 Graph).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("DUP_VERTEX")]
    DupVertex,

    #[error("NOEXST_VERTEX")]
    NoExistVertex,

    #[error("NOEXST_SRC")]
    NoExistSrc,

    #[error("NOEXST_DST")]
    NoExistDst,

    #[error("DUP_EDGE")]
    DupEdge,

    #[error("NOEXST_EDGE")]
    NoExistEdge,

    #[error("NOEXST_RECORD")]
    NoExistRecord,

    #[error("inconsistent adjacency: referenced vertex record missing")]
    DanglingAdjacency,
}

/// Errors from the secondary index subsystem (§4.8).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("NOEXST_INDEX")]
    NoExistIndex,

    #[error("DUPLICATE_INDEX")]
    DuplicateIndex,

    #[error("INVALID_PROPTYPE_INDEX")]
    InvalidPropTypeIndex,

    #[error("UNIQUE_CONSTRAINT: {0}")]
    UniqueConstraint(String),

    #[error("INVALID_INDEX_CONSTRAINT: {0}")]
    InvalidIndexConstraint(String),
}

/// Errors from condition/query evaluation (§4.9, §4.10).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("INVALID_COMPARATOR")]
    InvalidComparator,

    #[error("invalid regex pattern: {0}")]
    InvalidRegex(String),
}

/// Errors from transaction lifecycle management (§4.12).
#[derive(Debug, Error)]
pub enum TxnError {
    #[error("TXN_INVALID_MODE")]
    InvalidMode,

    #[error("TXN_COMPLETED")]
    Completed,

    #[error("NULL_TXN")]
    NullTxn,
}

/// Top-level error type returned by every public operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Kv(#[from] KvError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Txn(#[from] TxnError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<heed3::Error> for EngineError {
    fn from(error: heed3::Error) -> Self {
        KvError::from(error).into()
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        KvError::from(error).into()
    }
}

/// Error "kind" tag, cheap to match on without destructuring the full enum.
/// Mirrors §7's categorisation (Storage / Graph / Context-Schema / Transaction / Internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Graph,
    Schema,
    Index,
    Query,
    Transaction,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Storage => "storage",
            ErrorKind::Graph => "graph",
            ErrorKind::Schema => "schema",
            ErrorKind::Index => "index",
            ErrorKind::Query => "query",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Kv(_) => ErrorKind::Storage,
            EngineError::Schema(_) => ErrorKind::Schema,
            EngineError::Graph(_) => ErrorKind::Graph,
            EngineError::Index(_) => ErrorKind::Index,
            EngineError::Query(_) => ErrorKind::Query,
            EngineError::Txn(_) => ErrorKind::Transaction,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_error_maps_key_exist() {
        // KeyExist should surface as a distinct, matchable variant rather than
        // a stringified backend error, since callers branch on it (§4.1).
        let err = KvError::KeyExist;
        assert!(matches!(err, KvError::KeyExist));
    }

    #[test]
    fn engine_error_kind_routes_correctly() {
        let err: EngineError = SchemaError::NoExistClass("Foo".into()).into();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err: EngineError = GraphError::NoExistEdge.into();
        assert_eq!(err.kind(), ErrorKind::Graph);
    }
}
