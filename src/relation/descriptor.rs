use super::{Attribute, Distribution, Relation};
use crate::AttrNumber;

impl Distribution {
    /// Resolve the descriptor to its single shard-key attribute. Value-based
    /// strategies carry the attribute directly; a user-defined function
    /// qualifies only with exactly one argument. Everything else has no
    /// usable shard key.
    pub fn shard_key(&self) -> Option<AttrNumber> {
        match self {
            Distribution::Hash(attnum)
            | Distribution::Modulo(attnum)
            | Distribution::Range(attnum)
            | Distribution::Custom(attnum) => Some(*attnum),
            Distribution::UserDefined { args, .. } if args.len() == 1 => Some(args[0]),
            _ => None,
        }
    }
}

impl Relation {
    /// Look up a live column by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| !a.is_dropped && a.name == name)
    }

    pub fn attribute_by_num(&self, attnum: AttrNumber) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| !a.is_dropped && a.attnum == attnum)
    }

    /// Live columns paired with their logical ordinal (1-based, dropped
    /// columns do not count). Physical position and logical ordinal diverge
    /// after column drops, so callers must never index `attributes` raw.
    pub fn live_columns(&self) -> impl Iterator<Item = (usize, &Attribute)> {
        self.attributes
            .iter()
            .filter(|a| !a.is_dropped)
            .enumerate()
            .map(|(i, a)| (i + 1, a))
    }

    /// Whether `attnum` is the relation's shard key.
    pub fn is_shard_key(&self, attnum: AttrNumber) -> bool {
        self.distribution.shard_key() == Some(attnum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::types;
    use crate::Oid;

    fn attr(name: &str, attnum: i16, dropped: bool) -> Attribute {
        Attribute {
            name: name.to_string(),
            type_oid: types::INT4,
            typmod: -1,
            collation: Oid::INVALID,
            attnum: AttrNumber(attnum),
            is_dropped: dropped,
        }
    }

    #[test]
    fn test_shard_key_resolution() {
        assert_eq!(Distribution::Hash(AttrNumber(2)).shard_key(), Some(AttrNumber(2)));
        assert_eq!(Distribution::Modulo(AttrNumber(1)).shard_key(), Some(AttrNumber(1)));
        assert_eq!(Distribution::Replicated.shard_key(), None);
        assert_eq!(Distribution::RoundRobin.shard_key(), None);
        assert_eq!(
            Distribution::UserDefined {
                func: Oid(500),
                args: vec![AttrNumber(3)]
            }
            .shard_key(),
            Some(AttrNumber(3))
        );
        assert_eq!(
            Distribution::UserDefined {
                func: Oid(500),
                args: vec![AttrNumber(1), AttrNumber(2)]
            }
            .shard_key(),
            None
        );
    }

    #[test]
    fn test_live_ordinals_skip_dropped() {
        let rel = Relation {
            oid: Oid(20000),
            name: String::from("t"),
            namespace: Oid(2200),
            owner: Oid(10),
            attributes: vec![
                attr("a", 1, false),
                attr("b", 2, true),
                attr("c", 3, false),
            ],
            distribution: Distribution::Hash(AttrNumber(1)),
            aux_cache: None,
        };

        let live: Vec<_> = rel.live_columns().map(|(ord, a)| (ord, a.name.as_str())).collect();
        assert_eq!(live, vec![(1, "a"), (2, "c")]);

        assert!(rel.attribute("b").is_none());
        assert!(rel.attribute_by_num(AttrNumber(2)).is_none());
        assert_eq!(rel.attribute("c").unwrap().attnum, AttrNumber(3));
    }
}
