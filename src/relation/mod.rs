use crate::catalog::RelCacheAuxView;
use crate::{AttrNumber, Oid};

pub mod descriptor;
pub mod store;
pub mod types;

/// One column of a relation descriptor. Dropped columns stay in the list so
/// physical positions remain stable; logical ordinals skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub type_oid: Oid,
    pub typmod: i32,
    pub collation: Oid,
    pub attnum: AttrNumber,
    pub is_dropped: bool,
}

/// How the rows of a relation are spread over the nodes of the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    Replicated,
    RoundRobin,
    Hash(AttrNumber),
    Modulo(AttrNumber),
    Range(AttrNumber),
    Custom(AttrNumber),
    UserDefined { func: Oid, args: Vec<AttrNumber> },
    None,
}

/// Relation descriptor as handed out by the relation cache. `aux_cache` is
/// the derived per-open-relation view of the auxiliary catalog; it is
/// rebuilt whenever the descriptor is loaded and is not authoritative.
#[derive(Debug, Clone)]
pub struct Relation {
    pub oid: Oid,
    pub name: String,
    pub namespace: Oid,
    pub owner: Oid,
    pub attributes: Vec<Attribute>,
    pub distribution: Distribution,
    pub aux_cache: Option<RelCacheAuxView>,
}

/// Namespaces and relation descriptors, keyed by oid and by qualified name.
/// Stands in for the relation metadata service and the namespace existence
/// probe the subsystem consumes.
#[derive(Debug, Default)]
pub struct RelationStore {
    relations: std::collections::HashMap<Oid, Relation>,
    names: std::collections::HashMap<(Oid, String), Oid>,
    namespaces: std::collections::HashMap<Oid, String>,
    namespace_oids: std::collections::HashMap<String, Oid>,
    next_oid: u32,
}
