//! # Auxiliary-table subsystem
//!
//! Maintains physical shadow tables that act as global secondary indexes for
//! single attributes of sharded master tables. The crate covers the mapping
//! catalog, the name/column synthesizer, the DDL rewrite pipeline and the
//! execution-time column mapper; storage, MVCC and the SQL front end are
//! external services reached through the traits in [`rewrite`].

use thiserror::Error;

pub mod catalog;
pub mod mapper;
pub mod relation;
pub mod rewrite;
pub mod session;

#[derive(Error, Debug)]
pub enum AuxError {
    #[error("relation \"{0}\" does not exist")]
    UndefinedTable(String),
    #[error("column \"{0}\" does not exist")]
    UndefinedColumn(String),
    #[error("must be owner of relation \"{0}\"")]
    PermissionDenied(String),
    #[error("{0}")]
    UnsupportedFeature(String),
    #[error("column \"{column}\" of relation \"{schema}.{table}\": {detail}")]
    TypeMismatch {
        schema: String,
        table: String,
        column: String,
        detail: String,
    },
    #[error("auxiliary catalog uniqueness violated: {0}")]
    ConstraintViolation(String),
    #[error("distribution of relation \"{0}\" does not resolve to a single shard-key attribute")]
    UnsupportedDistribution(String),
}

pub type AuxResult<T> = Result<T, AuxError>;

/// Object identifier. Zero is the invalid oid; everything below
/// [`FIRST_NORMAL_OBJECT_ID`] belongs to system objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(pub u32);

impl Oid {
    pub const INVALID: Oid = Oid(0);

    pub fn is_valid(self) -> bool {
        self != Oid::INVALID
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowest oid handed out to user-created objects. System objects never have
/// auxiliary tables, so catalog probes short-circuit below this.
pub const FIRST_NORMAL_OBJECT_ID: Oid = Oid(16384);

/// Attribute number within a relation. Positive numbers are user-defined
/// columns, negative numbers are system pseudo-columns, zero is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrNumber(pub i16);

impl AttrNumber {
    pub const INVALID: AttrNumber = AttrNumber(0);
    /// Physical row location of a tuple within its own relation.
    pub const SELF_TID: AttrNumber = AttrNumber(-1);
    /// Identifier of the node that owns the tuple.
    pub const NODE_ID: AttrNumber = AttrNumber(-2);

    pub fn is_valid(self) -> bool {
        self != AttrNumber::INVALID
    }

    pub fn is_user_defined(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for AttrNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte limit for identifiers, truncation happens on character boundaries.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Name under which the node-identifier pseudo-column is addressable in SQL.
pub const NODE_ID_COLUMN: &str = "nodeid";
/// Name under which the self-tuple-identifier pseudo-column is addressable.
pub const SELF_TID_COLUMN: &str = "ctid";

/// Column names of the two fixed trailing columns of every auxiliary table.
pub const AUX_NODE_ID_COLUMN: &str = "auxnodeid";
pub const AUX_CTID_COLUMN: &str = "auxctid";

/// Logical ordinals (counted over live columns only) of the fixed auxiliary
/// table layout: indexed attribute, shard key, node id, tuple id.
pub const AUX_ORDINAL_INDEXED: usize = 1;
pub const AUX_ORDINAL_SHARD_KEY: usize = 2;
pub const AUX_ORDINAL_NODE_ID: usize = 3;
pub const AUX_ORDINAL_CTID: usize = 4;
