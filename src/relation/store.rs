use super::{Attribute, Distribution, Relation, RelationStore};
use crate::catalog::AuxCatalog;
use crate::{AuxError, AuxResult, Oid, FIRST_NORMAL_OBJECT_ID};

impl RelationStore {
    pub fn new() -> Self {
        RelationStore {
            relations: std::collections::HashMap::new(),
            names: std::collections::HashMap::new(),
            namespaces: std::collections::HashMap::new(),
            namespace_oids: std::collections::HashMap::new(),
            next_oid: FIRST_NORMAL_OBJECT_ID.0,
        }
    }

    pub fn create_namespace(&mut self, name: &str) -> Oid {
        if let Some(oid) = self.namespace_oids.get(name) {
            return *oid;
        }
        let oid = Oid(self.next_oid);
        self.next_oid += 1;
        self.namespaces.insert(oid, name.to_string());
        self.namespace_oids.insert(name.to_string(), oid);
        oid
    }

    pub fn namespace_oid(&self, name: &str) -> Option<Oid> {
        self.namespace_oids.get(name).copied()
    }

    pub fn namespace_name(&self, oid: Oid) -> Option<&str> {
        self.namespaces.get(&oid).map(String::as_str)
    }

    /// Register a new relation and hand out its oid.
    pub fn register(
        &mut self,
        name: &str,
        namespace: Oid,
        owner: Oid,
        attributes: Vec<Attribute>,
        distribution: Distribution,
    ) -> Oid {
        let oid = Oid(self.next_oid);
        self.next_oid += 1;

        self.names.insert((namespace, name.to_string()), oid);
        self.relations.insert(
            oid,
            Relation {
                oid,
                name: name.to_string(),
                namespace,
                owner,
                attributes,
                distribution,
                aux_cache: None,
            },
        );
        oid
    }

    pub fn get(&self, oid: Oid) -> Option<&Relation> {
        self.relations.get(&oid)
    }

    pub fn get_mut(&mut self, oid: Oid) -> Option<&mut Relation> {
        self.relations.get_mut(&oid)
    }

    /// Open a relation descriptor, reporting a missing one as an error.
    pub fn open(&self, oid: Oid) -> AuxResult<&Relation> {
        self.relations
            .get(&oid)
            .ok_or_else(|| AuxError::UndefinedTable(format!("oid {}", oid)))
    }

    pub fn resolve(&self, namespace: Oid, name: &str) -> Option<Oid> {
        self.names.get(&(namespace, name.to_string())).copied()
    }

    /// Namespace existence probe used by name synthesis.
    pub fn name_exists(&self, namespace: Oid, name: &str) -> bool {
        self.names.contains_key(&(namespace, name.to_string()))
    }

    pub fn drop_relation(&mut self, oid: Oid) -> Option<Relation> {
        let rel = self.relations.remove(&oid)?;
        self.names.remove(&(rel.namespace, rel.name.clone()));
        Some(rel)
    }

    /// Rebuild the relation-cache extension for `relid` from the auxiliary
    /// catalog. System relations never carry auxiliary tables, so their view
    /// stays empty without a catalog scan.
    pub fn load_aux_cache(&mut self, relid: Oid, catalog: &AuxCatalog) {
        if relid < FIRST_NORMAL_OBJECT_ID {
            return;
        }
        if let Some(rel) = self.relations.get_mut(&relid) {
            rel.aux_cache = Some(catalog.build_cache_view(relid));
        }
    }

    /// Drop the cached view, as relation-cache invalidation would.
    pub fn invalidate_aux_cache(&mut self, relid: Oid) {
        if let Some(rel) = self.relations.get_mut(&relid) {
            rel.aux_cache = None;
        }
    }
}
