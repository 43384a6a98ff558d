//! Execution-time column mapping between master relations and their
//! auxiliary tables: which master attributes the executor has to read to
//! keep shadow tables current, and how auxiliary columns project back onto
//! master-relation expressions.

use crate::catalog::RelCacheAuxView;
use crate::relation::types::{self, format_type};
use crate::relation::{Attribute, Relation, RelationStore};
use crate::{
    AttrNumber, AuxError, AuxResult, Oid, AUX_ORDINAL_CTID, AUX_ORDINAL_NODE_ID,
};
use std::collections::BTreeSet;

/// Reference to one column of the scan identified by `scan_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var {
    pub scan_id: u32,
    pub attnum: AttrNumber,
    pub type_oid: Oid,
    pub typmod: i32,
    pub collation: Oid,
}

/// A named projection entry with its 1-based output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub expr: Var,
    pub resno: u16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionList {
    Exprs(Vec<Var>),
    TargetEntries(Vec<TargetEntry>),
}

/// The master-relation attributes the executor must read whenever it scans
/// `master` for a write that has to maintain shadow tables: the two system
/// pseudo-columns, the shard key, and every attribute that currently has an
/// auxiliary relation.
pub fn required_master_attributes(
    master: &Relation,
    view: &RelCacheAuxView,
) -> AuxResult<BTreeSet<AttrNumber>> {
    let mut attrs = BTreeSet::new();
    attrs.insert(AttrNumber::SELF_TID);
    attrs.insert(AttrNumber::NODE_ID);

    let shard = master.distribution.shard_key().ok_or_else(|| {
        AuxError::UnsupportedFeature(format!(
            "relation \"{}\" is not distributed by a single shard-key attribute",
            master.name
        ))
    })?;
    attrs.insert(shard);

    attrs.extend(view.attnums.iter().copied());
    Ok(attrs)
}

/// For every live column of the auxiliary relation, in logical ordinal
/// order, produce the master-relation expression that feeds it. The two
/// fixed ordinals map to the node-id and self-tuple-id pseudo-columns;
/// everything else maps by name and must match type and typmod exactly.
/// Name lookup is deliberate: ordinal positions 1 and 2 keep their meaning
/// only through names once columns have been dropped elsewhere.
pub fn project_for_auxiliary(
    store: &RelationStore,
    master: &Relation,
    aux: &Relation,
    scan_id: u32,
    as_target_entries: bool,
) -> AuxResult<ProjectionList> {
    let mut exprs = Vec::new();
    let mut entries = Vec::new();

    for (ordinal, aux_attr) in aux.live_columns() {
        let master_attr = match ordinal {
            AUX_ORDINAL_NODE_ID => types::system_attribute(AttrNumber::NODE_ID),
            AUX_ORDINAL_CTID => types::system_attribute(AttrNumber::SELF_TID),
            _ => master.attribute(&aux_attr.name).cloned(),
        };
        let master_attr = master_attr.ok_or_else(|| AuxError::TypeMismatch {
            schema: schema_of(store, master),
            table: master.name.clone(),
            column: aux_attr.name.clone(),
            detail: format!(
                "auxiliary table \"{}\" has no matching column in its master relation",
                aux.name
            ),
        })?;

        if master_attr.type_oid != aux_attr.type_oid || master_attr.typmod != aux_attr.typmod {
            return Err(AuxError::TypeMismatch {
                schema: schema_of(store, master),
                table: master.name.clone(),
                column: aux_attr.name.clone(),
                detail: format!(
                    "type {} does not match auxiliary column of type {}",
                    format_type(master_attr.type_oid, master_attr.typmod),
                    format_type(aux_attr.type_oid, aux_attr.typmod)
                ),
            });
        }

        let var = make_var(scan_id, &master_attr);
        if as_target_entries {
            entries.push(TargetEntry {
                expr: var,
                resno: ordinal as u16,
                name: master_attr.name.clone(),
            });
        } else {
            exprs.push(var);
        }
    }

    if as_target_entries {
        Ok(ProjectionList::TargetEntries(entries))
    } else {
        Ok(ProjectionList::Exprs(exprs))
    }
}

fn make_var(scan_id: u32, attr: &Attribute) -> Var {
    Var {
        scan_id,
        attnum: attr.attnum,
        type_oid: attr.type_oid,
        typmod: attr.typmod,
        collation: attr.collation,
    }
}

fn schema_of(store: &RelationStore, rel: &Relation) -> String {
    store
        .namespace_name(rel.namespace)
        .unwrap_or("?")
        .to_string()
}
