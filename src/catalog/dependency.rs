use super::{DependencyEdge, DependencyGraph, DependencyKind, ObjectAddress};

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Record one typed edge: `dependent` depends on `referenced`.
    pub fn record(
        &mut self,
        dependent: ObjectAddress,
        referenced: ObjectAddress,
        kind: DependencyKind,
    ) {
        self.edges.push(DependencyEdge {
            dependent,
            referenced,
            kind,
        });
    }

    /// All edges pointing at `referenced`. Drop paths walk these to find
    /// what must go along with the referenced object.
    pub fn dependents_of(&self, referenced: ObjectAddress) -> Vec<DependencyEdge> {
        self.edges
            .iter()
            .filter(|edge| edge.referenced == referenced)
            .copied()
            .collect()
    }

    /// Transitive closure of objects that must be dropped when `referenced`
    /// is dropped, in discovery order. The generic walker; which edges are
    /// auto versus normal only matters for user-facing cascade reporting.
    pub fn cascade_from(&self, referenced: ObjectAddress) -> Vec<ObjectAddress> {
        let mut result: Vec<ObjectAddress> = Vec::new();
        let mut frontier = vec![referenced];

        while let Some(current) = frontier.pop() {
            for edge in self.dependents_of(current) {
                if !result.contains(&edge.dependent) {
                    result.push(edge.dependent);
                    frontier.push(edge.dependent);
                }
            }
        }
        result
    }

    /// Drop all edges touching `object`, in either role.
    pub fn remove_object(&mut self, object: ObjectAddress) {
        self.edges
            .retain(|edge| edge.dependent != object && edge.referenced != object);
    }
}
