use super::{
    AuxCatalog, CatalogRecord, DependencyGraph, DependencyKind, ObjectAddress, ObjectClass,
    RelCacheAuxView, RemoveKey,
};
use crate::{AttrNumber, AuxError, AuxResult, Oid, FIRST_NORMAL_OBJECT_ID};

impl AuxCatalog {
    pub fn new() -> Self {
        AuxCatalog::default()
    }

    /// Insert one catalog record and register its two dependency edges: an
    /// auto edge from the record onto the master attribute, and a normal
    /// edge from the auxiliary relation onto the same attribute. Dropping
    /// the attribute thus cascades over both; dropping the auxiliary
    /// relation directly leaves the master attribute alone.
    pub fn insert(
        &mut self,
        auxrelid: Oid,
        relid: Oid,
        attnum: AttrNumber,
        deps: &mut DependencyGraph,
    ) -> AuxResult<()> {
        // Sanity check
        debug_assert!(auxrelid.is_valid());
        debug_assert!(relid.is_valid());
        debug_assert!(attnum.is_user_defined());

        if self.by_aux.contains_key(&auxrelid) {
            return Err(AuxError::ConstraintViolation(format!(
                "auxrelid {} is already mapped",
                auxrelid
            )));
        }
        if self.by_master.contains_key(&(relid, attnum)) {
            return Err(AuxError::ConstraintViolation(format!(
                "relation {} attribute {} already has an auxiliary relation",
                relid, attnum
            )));
        }

        let record = CatalogRecord {
            auxrelid,
            relid,
            attnum,
        };
        self.by_aux.insert(auxrelid, record);
        self.by_master.insert((relid, attnum), auxrelid);

        let referenced = ObjectAddress {
            class: ObjectClass::Relation,
            oid: relid,
            sub_id: attnum,
        };
        deps.record(
            ObjectAddress {
                class: ObjectClass::AuxCatalogRecord,
                oid: auxrelid,
                sub_id: AttrNumber::INVALID,
            },
            referenced,
            DependencyKind::Auto,
        );
        deps.record(
            ObjectAddress {
                class: ObjectClass::Relation,
                oid: auxrelid,
                sub_id: AttrNumber::INVALID,
            },
            referenced,
            DependencyKind::Normal,
        );

        Ok(())
    }

    /// Remove a record by either key. A missing record is a silent no-op;
    /// cascading drop paths call this best-effort.
    pub fn remove(&mut self, key: RemoveKey) {
        let record = match key {
            RemoveKey::ByAuxId(auxrelid) if auxrelid.is_valid() => {
                self.by_aux.get(&auxrelid).copied()
            }
            RemoveKey::ByAuxId(_) => None,
            RemoveKey::ByMasterAttr(relid, attnum) => self
                .by_master
                .get(&(relid, attnum))
                .and_then(|auxrelid| self.by_aux.get(auxrelid))
                .copied(),
        };

        if let Some(record) = record {
            self.by_aux.remove(&record.auxrelid);
            self.by_master.remove(&(record.relid, record.attnum));
        }
    }

    /// The auxiliary relation shadowing `(relid, attnum)`, if any.
    pub fn lookup_aux_relation(&self, relid: Oid, attnum: AttrNumber) -> Option<Oid> {
        if !relid.is_valid() || !attnum.is_user_defined() {
            return None;
        }
        self.by_master.get(&(relid, attnum)).copied()
    }

    /// The master relation and attribute an auxiliary relation shadows.
    pub fn lookup_master(&self, auxrelid: Oid) -> Option<(Oid, AttrNumber)> {
        if !auxrelid.is_valid() {
            return None;
        }
        let record = self.by_aux.get(&auxrelid)?;
        debug_assert!(record.attnum.is_user_defined());
        Some((record.relid, record.attnum))
    }

    /// Membership test: is `auxrelid` an auxiliary relation? Returns the
    /// shadowed attribute number if so.
    pub fn aux_attnum(&self, auxrelid: Oid) -> Option<AttrNumber> {
        self.lookup_master(auxrelid).map(|(_, attnum)| attnum)
    }

    /// Whether any auxiliary relation references `relid`.
    pub fn has_aux_relations(&self, relid: Oid) -> bool {
        if relid < FIRST_NORMAL_OBJECT_ID {
            return false;
        }
        self.records_for(relid).next().is_some()
    }

    /// Scan all records for `relid` into the relation-cache view shape.
    pub fn build_cache_view(&self, relid: Oid) -> RelCacheAuxView {
        let mut view = RelCacheAuxView::default();
        for record in self.records_for(relid) {
            view.aux_relids.push(record.auxrelid);
            view.attnums.insert(record.attnum);
        }
        view
    }

    /// Records referencing `relid`, in attribute-number order.
    fn records_for(&self, relid: Oid) -> impl Iterator<Item = CatalogRecord> + '_ {
        self.by_master
            .range((relid, AttrNumber(i16::MIN))..=(relid, AttrNumber(i16::MAX)))
            .filter_map(move |(_, auxrelid)| self.by_aux.get(auxrelid).copied())
    }
}
