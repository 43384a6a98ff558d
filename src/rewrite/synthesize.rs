use super::ColumnDef;
use crate::relation::{types, Attribute, Relation};
use crate::{
    AttrNumber, AuxError, AuxResult, Oid, AUX_CTID_COLUMN, AUX_NODE_ID_COLUMN, MAX_IDENTIFIER_LEN,
};

/// Compose `name1_name2_label`, truncating the first two parts (never the
/// label) on character boundaries until the whole name fits the identifier
/// length limit.
fn make_object_name(name1: &str, name2: &str, label: &str) -> String {
    let mut n1 = name1.to_string();
    let mut n2 = name2.to_string();

    while n1.len() + n2.len() + label.len() + 2 > MAX_IDENTIFIER_LEN {
        if n1.is_empty() && n2.is_empty() {
            break;
        }
        if n1.len() >= n2.len() {
            n1.pop();
        } else {
            n2.pop();
        }
    }
    format!("{}_{}_{}", n1, n2, label)
}

/// Pick a table name that does not collide with any existing relation in
/// the target namespace: try the plain label first, then `label1`,
/// `label2`, ... until a free name turns up. `name_exists` is the namespace
/// existence probe.
pub fn choose_aux_table_name<F>(name_exists: F, master: &str, attr: &str, label: &str) -> String
where
    F: Fn(&str) -> bool,
{
    let mut pass = 0;
    let mut modlabel = label.to_string();

    loop {
        let candidate = make_object_name(master, attr, &modlabel);
        if !name_exists(&candidate) {
            return candidate;
        }
        // found a conflict, try a new label component
        pass += 1;
        modlabel = format!("{}{}", label, pass);
    }
}

/// Derive the fixed four-column layout of an auxiliary table for
/// `indexed`: the indexed attribute, the master's shard-key attribute
/// (both with the master's type, typmod and collation), then the two fixed
/// maintenance columns. Also returns the resolved shard-key attribute
/// number. The caller has already gated the distribution strategy, so a
/// descriptor that does not resolve to one attribute here is an internal
/// invariant violation.
pub fn synthesize_columns(
    master: &Relation,
    indexed: &Attribute,
) -> AuxResult<(Vec<ColumnDef>, AttrNumber)> {
    let shard_attnum = master
        .distribution
        .shard_key()
        .ok_or_else(|| AuxError::UnsupportedDistribution(master.name.clone()))?;
    debug_assert!(shard_attnum.is_user_defined());

    let shard_attr = master
        .attribute_by_num(shard_attnum)
        .ok_or_else(|| AuxError::UnsupportedDistribution(master.name.clone()))?;

    let columns = vec![
        ColumnDef {
            name: indexed.name.clone(),
            type_oid: indexed.type_oid,
            typmod: indexed.typmod,
            collation: indexed.collation,
        },
        ColumnDef {
            name: shard_attr.name.clone(),
            type_oid: shard_attr.type_oid,
            typmod: shard_attr.typmod,
            collation: shard_attr.collation,
        },
        ColumnDef {
            name: AUX_NODE_ID_COLUMN.to_string(),
            type_oid: types::INT4,
            typmod: -1,
            collation: Oid::INVALID,
        },
        ColumnDef {
            name: AUX_CTID_COLUMN.to_string(),
            type_oid: types::TID,
            typmod: -1,
            collation: Oid::INVALID,
        },
    ];

    Ok((columns, shard_attnum))
}
