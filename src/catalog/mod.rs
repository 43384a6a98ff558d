use crate::{AttrNumber, Oid};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub mod aux_class;
pub mod dependency;

/// One persistent row of the auxiliary catalog: which auxiliary relation
/// shadows which attribute of which master relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogRecord {
    pub auxrelid: Oid,
    pub relid: Oid,
    pub attnum: AttrNumber,
}

/// The auxiliary catalog, one backing store with two lookup indices:
/// unique by `auxrelid` and unique by `(relid, attnum)`. The ordered index
/// doubles as the scan path for per-relation cache-view builds.
#[derive(Debug, Default)]
pub struct AuxCatalog {
    by_aux: HashMap<Oid, CatalogRecord>,
    by_master: BTreeMap<(Oid, AttrNumber), Oid>,
}

/// Key for [`AuxCatalog::remove`]: either side of the mapping works.
#[derive(Debug, Clone, Copy)]
pub enum RemoveKey {
    ByAuxId(Oid),
    ByMasterAttr(Oid, AttrNumber),
}

/// Derived per-open-relation view of the auxiliary catalog: the auxiliary
/// relations of a master relation (ordered by attribute number) and the set
/// of attribute numbers that currently have one. Owned by the relation-cache
/// entry, rebuilt on descriptor load; the catalog itself is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelCacheAuxView {
    pub aux_relids: Vec<Oid>,
    pub attnums: BTreeSet<AttrNumber>,
}

/// Kind of a recorded dependency edge. Auto edges drop silently with their
/// referenced object; normal edges require a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Auto,
    Normal,
}

/// Catalog object classes that participate in dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Relation,
    AuxCatalogRecord,
}

/// Address of a catalog object or one of its sub-objects. `sub_id` is the
/// attribute number for column sub-objects and invalid for whole objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAddress {
    pub class: ObjectClass,
    pub oid: Oid,
    pub sub_id: AttrNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub dependent: ObjectAddress,
    pub referenced: ObjectAddress,
    pub kind: DependencyKind,
}

/// Generic object-dependency graph. This subsystem only registers edges;
/// cascading drops walk the graph through [`DependencyGraph::dependents_of`].
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: Vec<DependencyEdge>,
}
