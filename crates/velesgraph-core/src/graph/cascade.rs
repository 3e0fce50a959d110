//! Cascading deletes that keep referential integrity across graphs.
//!
//! Removing a vertex removes every edge touching it, in every registered
//! graph whose edge definitions name the vertex collection. Removing an edge
//! also removes edges that use the removed edge as an endpoint (edge
//! collections may themselves be vertex collections of another definition).
//! The full closure is computed first; then one transaction write-locks
//! every affected collection and deletes everything.

use indexmap::IndexSet;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::registry::{GraphDocument, GraphRegistry};
use crate::error::Result;
use crate::store::{
    CollectionStore, DocumentHandle, RemoveOptions, TransactionEngine, TransactionSpec,
};

/// Ids and collections collected for one remove call.
///
/// Empty between calls.
#[derive(Debug, Default)]
pub struct PendingDeleteSet {
    ids: IndexSet<DocumentHandle>,
    collections: IndexSet<String>,
}

impl PendingDeleteSet {
    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.collections.is_empty()
    }

    /// Ids to remove, in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &DocumentHandle> {
        self.ids.iter()
    }

    /// Collections to write-lock, in discovery order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(String::as_str)
    }

    /// Marks `id`; returns false if it was already pending.
    fn mark(&mut self, id: DocumentHandle) -> bool {
        self.ids.insert(id)
    }

    fn is_pending(&self, id: &DocumentHandle) -> bool {
        self.ids.contains(id)
    }

    fn lock_collection(&mut self, collection: &str) {
        if !self.collections.contains(collection) {
            self.collections.insert(collection.to_string());
        }
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.collections.clear();
    }
}

/// Holds the pending set for one call and empties it on every exit path.
struct PendingScope<'a>(MutexGuard<'a, PendingDeleteSet>);

impl Drop for PendingScope<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Computes delete closures and executes them atomically.
pub(crate) struct CascadingDelete<'a, R: GraphRegistry + ?Sized> {
    pub(crate) registry: &'a R,
    pub(crate) store: &'a dyn CollectionStore,
    pub(crate) transactions: &'a dyn TransactionEngine,
}

impl<R: GraphRegistry + ?Sized> CascadingDelete<'_, R> {
    /// Removes one edge and everything depending on it.
    pub(crate) fn remove_edge(
        &self,
        pending: &Mutex<PendingDeleteSet>,
        edge: &DocumentHandle,
        options: &RemoveOptions,
    ) -> Result<()> {
        let mut scope = PendingScope(pending.lock());
        let graphs = self.registry.list()?;

        scope.0.lock_collection(edge.collection());
        self.collect_edge_closure(&graphs, &mut scope.0, edge.clone())?;

        debug!(
            target_id = %edge,
            closure = scope.0.ids.len(),
            locks = scope.0.collections.len(),
            "cascade closure computed"
        );
        self.execute(&scope.0, None, options)
    }

    /// Removes one vertex, all edges touching it in any graph, and
    /// everything depending on those edges.
    pub(crate) fn remove_vertex(
        &self,
        pending: &Mutex<PendingDeleteSet>,
        vertex: &DocumentHandle,
        options: &RemoveOptions,
    ) -> Result<()> {
        let mut scope = PendingScope(pending.lock());
        let graphs = self.registry.list()?;
        let vertex_id = vertex.to_string();

        scope.0.lock_collection(vertex.collection());
        for graph in &graphs {
            for definition in &graph.edge_definitions {
                if !definition.references_vertex(vertex.collection()) {
                    continue;
                }
                let edges = self.store.edges(&definition.collection, &vertex_id)?;
                if !edges.is_empty() {
                    scope.0.lock_collection(&definition.collection);
                }
                for edge in &edges {
                    let edge_id = DocumentHandle::of_document(edge)?;
                    self.collect_edge_closure(&graphs, &mut scope.0, edge_id)?;
                }
            }
        }

        debug!(
            target_id = %vertex,
            closure = scope.0.ids.len(),
            locks = scope.0.collections.len(),
            "cascade closure computed"
        );
        self.execute(&scope.0, Some(vertex), options)
    }

    /// Marks `start` and every edge transitively incident to it.
    ///
    /// Terminates because the pending set only grows and ids are marked at
    /// most once.
    fn collect_edge_closure(
        &self,
        graphs: &[GraphDocument],
        pending: &mut PendingDeleteSet,
        start: DocumentHandle,
    ) -> Result<()> {
        let mut worklist = vec![start];

        while let Some(edge) = worklist.pop() {
            if !pending.mark(edge.clone()) {
                continue;
            }
            let edge_id = edge.to_string();

            for graph in graphs {
                for definition in &graph.edge_definitions {
                    // Only definitions that use this edge collection as an
                    // endpoint can hold edges pointing at the edge.
                    if !definition.references_vertex(edge.collection()) {
                        continue;
                    }
                    for dependent in self.store.edges(&definition.collection, &edge_id)? {
                        let dependent = DocumentHandle::of_document(&dependent)?;
                        if !pending.is_pending(&dependent) {
                            pending.lock_collection(&definition.collection);
                            worklist.push(dependent);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        pending: &PendingDeleteSet,
        vertex: Option<&DocumentHandle>,
        options: &RemoveOptions,
    ) -> Result<()> {
        let spec = TransactionSpec {
            write: pending.collections().map(str::to_string).collect(),
        };
        let ids: Vec<&DocumentHandle> = pending.ids().chain(vertex).collect();

        self.transactions.execute(&spec, &mut |store| {
            for id in &ids {
                store.remove(id, options)?;
            }
            Ok(())
        })
    }
}

