use crate::relation::Attribute;
use crate::{AttrNumber, Oid, NODE_ID_COLUMN, SELF_TID_COLUMN};

/// Built-in type oids. The auxiliary-table layout only ever synthesizes
/// `INT4` and `TID` itself; the rest shows up through master-table columns.
pub const BOOL: Oid = Oid(16);
pub const INT4: Oid = Oid(23);
pub const INT8: Oid = Oid(20);
pub const FLOAT8: Oid = Oid(701);
pub const TEXT: Oid = Oid(25);
pub const VARCHAR: Oid = Oid(1043);
/// Physical tuple identifier.
pub const TID: Oid = Oid(27);

/// Render a type for user-facing messages, e.g. `varchar(20)`.
pub fn format_type(type_oid: Oid, typmod: i32) -> String {
    let name = match type_oid {
        BOOL => "boolean",
        INT4 => "integer",
        INT8 => "bigint",
        FLOAT8 => "double precision",
        TEXT => "text",
        VARCHAR => "varchar",
        TID => "tid",
        other => return format!("type {}", other),
    };
    if typmod >= 0 {
        format!("{}({})", name, typmod)
    } else {
        name.to_string()
    }
}

/// Descriptor of a system pseudo-column, shared by every relation.
pub fn system_attribute(attnum: AttrNumber) -> Option<Attribute> {
    let (name, type_oid) = match attnum {
        AttrNumber::SELF_TID => (SELF_TID_COLUMN, TID),
        AttrNumber::NODE_ID => (NODE_ID_COLUMN, INT4),
        _ => return None,
    };
    Some(Attribute {
        name: name.to_string(),
        type_oid,
        typmod: -1,
        collation: Oid::INVALID,
        attnum,
        is_dropped: false,
    })
}
