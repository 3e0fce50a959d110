//! The graph aggregate: persisted definition, bound collections, queries.
//!
//! A [`GraphDefinition`] starts Unbound when built from a persisted
//! document. [`GraphDefinition::bind`] resolves every referenced
//! collection and makes it Bound. Structural edits persist the new
//! document, drop the binding and bind again from scratch.

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde_json::Value;

use super::binder::{Bindings, BoundEdgeCollection, BoundVertexCollection};
use super::cascade::PendingDeleteSet;
use super::edge_definition::{
    check_collection, check_cross_graph, validate_against_store, EdgeDefinition,
};
use super::manager::GraphContext;
use super::query::centrality::{self, Metric};
use super::query::{
    CommonPropertiesOptions, ComposedQuery, Direction, Example, PathOptions, PathsOptions,
    QueryComposer, TraversalOptions,
};
use super::registry::{GraphDocument, GraphRegistry, GraphRegistryMut};
use crate::error::{Error, Result};
use crate::store::{CollectionType, Document, DocumentHandle, TransactionSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Unbound,
    Bound(Bindings),
}

/// A named graph over vertex and edge collections.
#[derive(Debug)]
pub struct GraphDefinition {
    document: GraphDocument,
    binding: Binding,
    ctx: GraphContext,
    pending: Mutex<PendingDeleteSet>,
}

/// Vertex collections named by edge definition endpoints.
fn endpoint_collections(definitions: &[EdgeDefinition]) -> IndexSet<String> {
    definitions
        .iter()
        .flat_map(|d| d.vertex_collections())
        .map(str::to_string)
        .collect()
}

/// Turns collections that lost their last edge definition into orphans and
/// drops orphans that gained one.
fn reconcile_orphans(document: &mut GraphDocument, previous_endpoints: &IndexSet<String>) {
    let endpoints = endpoint_collections(&document.edge_definitions);
    document.orphan_collections.retain(|o| !endpoints.contains(o));
    for freed in previous_endpoints.difference(&endpoints) {
        if !document.orphan_collections.contains(freed) {
            document.orphan_collections.push(freed.clone());
        }
    }
    document.orphan_collections.sort();
}

impl GraphDefinition {
    /// Wraps a persisted document. The graph is Unbound until
    /// [`Self::bind`] succeeds.
    #[must_use]
    pub fn new(document: GraphDocument, ctx: GraphContext) -> Self {
        Self {
            document,
            binding: Binding::Unbound,
            ctx,
            pending: Mutex::new(PendingDeleteSet::default()),
        }
    }

    /// Resolves every referenced collection and binds it.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionNotFound`, `Error::CollectionTypeInvalid`,
    /// `Error::MalformedEdgeDefinition` or `Error::Forbidden`. The graph
    /// stays Unbound on error.
    pub fn bind(&mut self) -> Result<()> {
        self.binding = Binding::Unbound;
        let access = self.ctx.access();
        validate_against_store(
            &self.document.edge_definitions,
            self.ctx.store.as_ref(),
            &access,
        )?;
        for orphan in &self.document.orphan_collections {
            check_collection(
                self.ctx.store.as_ref(),
                &access,
                orphan,
                CollectionType::Document,
            )?;
        }
        self.binding = Binding::Bound(Bindings::of(&self.document));
        Ok(())
    }

    /// Returns true once all collections are bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }

    fn bindings(&self) -> Result<&Bindings> {
        match &self.binding {
            Binding::Bound(bindings) => Ok(bindings),
            Binding::Unbound => Err(Error::InvalidGraph(format!(
                "graph '{}' is not bound",
                self.document.key
            ))),
        }
    }

    /// Graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.document.key
    }

    /// Persisted document as last written.
    #[must_use]
    pub fn document(&self) -> &GraphDocument {
        &self.document
    }

    pub(crate) fn context(&self) -> &GraphContext {
        &self.ctx
    }

    pub(crate) fn pending(&self) -> &Mutex<PendingDeleteSet> {
        &self.pending
    }

    /// Returns true while a remove call is collecting its closure.
    #[must_use]
    pub fn has_pending_deletes(&self) -> bool {
        self.pending.try_lock().map_or(true, |set| !set.is_empty())
    }

    /// Edge definitions in persisted order.
    #[must_use]
    pub fn edge_definitions(&self) -> &[EdgeDefinition] {
        &self.document.edge_definitions
    }

    /// Vertex collections not used by any edge definition.
    #[must_use]
    pub fn orphan_collections(&self) -> &[String] {
        &self.document.orphan_collections
    }

    /// Bound vertex collections: edge definition endpoints, then orphans.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGraph` while Unbound.
    pub fn vertex_collection_names(&self) -> Result<Vec<&str>> {
        Ok(self.bindings()?.vertex_collections().collect())
    }

    /// Bound edge collections.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGraph` while Unbound.
    pub fn edge_collection_names(&self) -> Result<Vec<&str>> {
        Ok(self.bindings()?.edge_collections().collect())
    }

    /// Handle on a bound edge collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::EdgeCollectionDoesNotExist` if `name` is not an edge
    /// collection of this graph, `Error::InvalidGraph` while Unbound.
    pub fn edge_collection(&self, name: &str) -> Result<BoundEdgeCollection<'_>> {
        self.bindings()?
            .edge_name(name)
            .map(|bound| BoundEdgeCollection::new(self, bound))
            .ok_or_else(|| Error::EdgeCollectionDoesNotExist(name.to_string()))
    }

    /// Handle on a bound vertex collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::VertexCollectionDoesNotExist` if `name` is not a
    /// vertex collection of this graph, `Error::InvalidGraph` while Unbound.
    pub fn vertex_collection(&self, name: &str) -> Result<BoundVertexCollection<'_>> {
        self.bindings()?
            .vertex_name(name)
            .map(|bound| BoundVertexCollection::new(self, bound))
            .ok_or_else(|| Error::VertexCollectionDoesNotExist(name.to_string()))
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    fn endpoint_vertex(&self, edge_id: &str, attribute: &str) -> Result<Document> {
        let bindings = self.bindings()?;
        let edge = DocumentHandle::parse(edge_id)?;
        if !bindings.has_edge_collection(edge.collection()) {
            return Err(Error::EdgeCollectionDoesNotExist(edge.collection().to_string()));
        }
        let access = self.ctx.access();
        access.require_read(edge.collection())?;

        let document = self.ctx.store.document(&edge)?;
        let vertex = match document.get(attribute) {
            Some(Value::String(id)) => DocumentHandle::parse(id)?,
            _ => return Err(Error::DocumentHandleBad(edge_id.to_string())),
        };
        if !bindings.has_vertex_collection(vertex.collection()) {
            return Err(Error::VertexCollectionDoesNotExist(
                vertex.collection().to_string(),
            ));
        }
        access.require_read(vertex.collection())?;
        self.ctx.store.document(&vertex)
    }

    /// Source vertex of an edge.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::EdgeCollectionDoesNotExist`,
    /// `Error::VertexCollectionDoesNotExist` or the store's error.
    pub fn from_vertex(&self, edge_id: &str) -> Result<Document> {
        self.endpoint_vertex(edge_id, "_from")
    }

    /// Target vertex of an edge.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_vertex`].
    pub fn to_vertex(&self, edge_id: &str) -> Result<Document> {
        self.endpoint_vertex(edge_id, "_to")
    }

    /// Edges of every edge collection of this graph touching `vertex_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the store's
    /// error.
    pub fn vertex_edges(&self, vertex_id: &str) -> Result<Vec<Document>> {
        let bindings = self.bindings()?;
        DocumentHandle::parse(vertex_id)?;
        let access = self.ctx.access();
        let mut edges = Vec::new();
        for collection in bindings.edge_collections() {
            access.require_read(collection)?;
            edges.extend(self.ctx.store.edges(collection, vertex_id)?);
        }
        Ok(edges)
    }

    // ---------------------------------------------------------------------
    // Structural edits
    // ---------------------------------------------------------------------

    /// Persists `document`, then rebinds from scratch.
    fn restructure(&mut self, document: GraphDocument) -> Result<()> {
        self.ctx
            .access()
            .require_write(self.ctx.registry.collection())?;
        let saved = self.ctx.registry.update(&document)?;
        self.binding = Binding::Unbound;
        self.document = saved;
        self.bind()
    }

    /// Returns true if a graph other than this one names `collection`.
    fn used_elsewhere(&self, collection: &str) -> Result<bool> {
        Ok(self
            .ctx
            .registry
            .list()?
            .iter()
            .any(|g| g.key != self.document.key && g.references(collection)))
    }

    fn drop_collection(&self, collection: &str) -> Result<()> {
        self.ctx.store.drop_collection(collection)
    }

    /// Adds an edge definition to this graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionMultiUse` if the edge collection is already
    /// part of this graph, `Error::CollectionUseInMultiGraphs` if another
    /// graph defines it differently, or any store validation error.
    pub fn extend_edge_definitions(&mut self, definition: EdgeDefinition) -> Result<()> {
        definition.validate_shape()?;
        if self.document.edge_definition(&definition.collection).is_some() {
            return Err(Error::CollectionMultiUse(definition.collection));
        }
        let graphs = self.ctx.registry.list()?;
        check_cross_graph(
            std::slice::from_ref(&definition),
            graphs
                .iter()
                .filter(|g| g.key != self.document.key)
                .flat_map(|g| &g.edge_definitions),
        )?;
        validate_against_store(
            std::slice::from_ref(&definition),
            self.ctx.store.as_ref(),
            &self.ctx.access(),
        )?;

        let mut document = self.document.clone();
        let previous = endpoint_collections(&document.edge_definitions);
        document.edge_definitions.push(definition.sorted());
        reconcile_orphans(&mut document, &previous);
        self.restructure(document)
    }

    /// Replaces the definition of an edge collection in every graph that
    /// uses it.
    ///
    /// # Errors
    ///
    /// Returns `Error::EdgeCollectionNotUsed` if this graph does not use the
    /// edge collection, or any store validation error.
    pub fn edit_edge_definition(&mut self, definition: EdgeDefinition) -> Result<()> {
        definition.validate_shape()?;
        if self.document.edge_definition(&definition.collection).is_none() {
            return Err(Error::EdgeCollectionNotUsed(definition.collection));
        }
        validate_against_store(
            std::slice::from_ref(&definition),
            self.ctx.store.as_ref(),
            &self.ctx.access(),
        )?;

        let sorted = definition.sorted();
        let apply = |document: &mut GraphDocument| {
            let previous = endpoint_collections(&document.edge_definitions);
            for existing in &mut document.edge_definitions {
                if existing.collection == sorted.collection {
                    *existing = sorted.clone();
                }
            }
            reconcile_orphans(document, &previous);
        };

        let registry = self.ctx.registry.as_ref();
        self.ctx.access().require_write(registry.collection())?;

        let mut document = self.document.clone();
        apply(&mut document);
        let mut changed = vec![document];
        for mut other in registry.list()? {
            if other.key != self.document.key && other.edge_definition(&sorted.collection).is_some()
            {
                apply(&mut other);
                changed.push(other);
            }
        }

        let spec = TransactionSpec {
            write: vec![registry.collection().to_string()],
        };
        self.ctx.transactions.execute(&spec, &mut |store| {
            for graph in &mut changed {
                *graph = registry.update_in(store, graph)?;
            }
            Ok(())
        })?;

        self.binding = Binding::Unbound;
        self.document = changed.swap_remove(0);
        self.bind()
    }

    /// Removes the definition of `edge_collection` from this graph. Its
    /// vertex collections that lose their last definition become orphans.
    /// With `drop_collection`, the edge collection is dropped unless
    /// another graph still uses it.
    ///
    /// # Errors
    ///
    /// Returns `Error::EdgeCollectionNotUsed`, `Error::Forbidden`, or the
    /// store's error.
    pub fn delete_edge_definition(
        &mut self,
        edge_collection: &str,
        drop_collection: bool,
    ) -> Result<()> {
        if self.document.edge_definition(edge_collection).is_none() {
            return Err(Error::EdgeCollectionNotUsed(edge_collection.to_string()));
        }
        let drop = drop_collection && !self.used_elsewhere(edge_collection)?;
        if drop {
            self.ctx.access().require_write(edge_collection)?;
        }

        let mut document = self.document.clone();
        let previous = endpoint_collections(&document.edge_definitions);
        document
            .edge_definitions
            .retain(|d| d.collection != edge_collection);
        reconcile_orphans(&mut document, &previous);
        self.restructure(document)?;

        if drop {
            self.drop_collection(edge_collection)?;
        }
        Ok(())
    }

    /// Adds an orphan vertex collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionNotFound`, `Error::WrongCollectionTypeVertex`,
    /// `Error::CollectionUsedInEdgeDefinition` or
    /// `Error::CollectionUsedInOrphans`.
    pub fn add_vertex_collection(&mut self, name: &str) -> Result<()> {
        match self.ctx.store.collection_type(name) {
            None => return Err(Error::CollectionNotFound(name.to_string())),
            Some(CollectionType::Edge) => {
                return Err(Error::WrongCollectionTypeVertex(name.to_string()))
            }
            Some(CollectionType::Document) => {}
        }
        if self
            .document
            .edge_definitions
            .iter()
            .any(|d| d.references_vertex(name))
        {
            return Err(Error::CollectionUsedInEdgeDefinition(name.to_string()));
        }
        if self.document.orphan_collections.iter().any(|o| o == name) {
            return Err(Error::CollectionUsedInOrphans(name.to_string()));
        }
        self.ctx.access().require_read(name)?;

        let mut document = self.document.clone();
        document.orphan_collections.push(name.to_string());
        document.orphan_collections.sort();
        self.restructure(document)
    }

    /// Removes an orphan vertex collection. With `drop_collection`, the
    /// collection is dropped unless another graph still uses it.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionNotFound`, `Error::NotInOrphanCollection`,
    /// `Error::Forbidden`, or the store's error.
    pub fn remove_vertex_collection(&mut self, name: &str, drop_collection: bool) -> Result<()> {
        if self.ctx.store.collection_type(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        if !self.document.orphan_collections.iter().any(|o| o == name) {
            return Err(Error::NotInOrphanCollection(name.to_string()));
        }
        let drop = drop_collection && !self.used_elsewhere(name)?;
        if drop {
            self.ctx.access().require_write(name)?;
        }

        let mut document = self.document.clone();
        document.orphan_collections.retain(|o| o != name);
        self.restructure(document)?;

        if drop {
            self.drop_collection(name)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Composer over the bound collections of this graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGraph` while Unbound, `Error::GraphEmpty`
    /// without vertex collections.
    pub fn composer(&self) -> Result<QueryComposer<'_>> {
        let bindings = self.bindings()?;
        QueryComposer::new(
            &self.document.key,
            bindings.vertex_collections().collect(),
            bindings.edge_collections().collect(),
            &self.ctx.config.query,
        )
    }

    fn run(&self, query: &ComposedQuery) -> Result<Vec<Value>> {
        self.ctx.query_engine()?.execute(query)
    }

    /// Edges reachable from vertices matching `example`.
    ///
    /// # Errors
    ///
    /// Composition errors, `Error::Config` without a query engine, or the
    /// engine's error.
    pub fn edges(&self, example: &Example, options: &TraversalOptions) -> Result<Vec<Value>> {
        self.run(&self.composer()?.edges(example, options)?)
    }

    /// Vertices matching `example`.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn vertices(&self, example: &Example, options: &TraversalOptions) -> Result<Vec<Value>> {
        self.run(&self.composer()?.vertices(example, options)?)
    }

    /// Neighbors of vertices matching `example`.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn neighbors(&self, example: &Example, options: &TraversalOptions) -> Result<Vec<Value>> {
        self.run(&self.composer()?.neighbors(example, options)?)
    }

    /// `{left, right, neighbors}` rows for pairs with shared neighbors.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn common_neighbors(
        &self,
        left: &Example,
        right: &Example,
        left_options: &TraversalOptions,
        right_options: &TraversalOptions,
    ) -> Result<Vec<Value>> {
        self.run(
            &self
                .composer()?
                .common_neighbors(left, right, left_options, right_options)?,
        )
    }

    /// Shared neighbor counts keyed by left id, then right id.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn count_common_neighbors(
        &self,
        left: &Example,
        right: &Example,
        left_options: &TraversalOptions,
        right_options: &TraversalOptions,
    ) -> Result<IndexMap<String, IndexMap<String, usize>>> {
        let options = (
            TraversalOptions {
                include_data: false,
                ..left_options.clone()
            },
            TraversalOptions {
                include_data: false,
                ..right_options.clone()
            },
        );
        let rows = self.common_neighbors(left, right, &options.0, &options.1)?;
        centrality::count_neighbors(&rows)
    }

    /// Vertices sharing attribute values, per left vertex id.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn common_properties(
        &self,
        left: &Example,
        right: &Example,
        options: &CommonPropertiesOptions,
    ) -> Result<IndexMap<String, Value>> {
        let rows = self.run(&self.composer()?.common_properties(left, right, options)?)?;
        centrality::merge_objects(rows)
    }

    /// Number of vertices sharing attribute values, per left vertex id.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn count_common_properties(
        &self,
        left: &Example,
        right: &Example,
        options: &CommonPropertiesOptions,
    ) -> Result<IndexMap<String, Value>> {
        let rows = self.run(
            &self
                .composer()?
                .count_common_properties(left, right, options)?,
        )?;
        centrality::merge_objects(rows)
    }

    /// All paths within the length bounds.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn paths(&self, options: &PathsOptions) -> Result<Vec<Value>> {
        self.run(&self.composer()?.paths(options)?)
    }

    /// Shortest paths between vertices matching the two examples.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn shortest_path(
        &self,
        start: &Example,
        target: &Example,
        options: &PathOptions,
    ) -> Result<Vec<Value>> {
        self.run(&self.composer()?.shortest_path(start, target, options)?)
    }

    /// Shortest-path distances between vertices matching the two examples.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn distance_to(
        &self,
        start: &Example,
        target: &Example,
        options: &PathOptions,
    ) -> Result<Vec<Value>> {
        self.run(&self.composer()?.distance_to(start, target, options)?)
    }

    /// Raw eccentricity of vertices matching `example`.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn absolute_eccentricity(&self, example: &Example, options: &PathOptions) -> Result<Metric> {
        let rows = self.run(&self.composer()?.absolute_eccentricity(example, options)?)?;
        centrality::parse_metric(&rows)
    }

    /// Eccentricity of every vertex relative to the smallest one.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn eccentricity(&self, options: &PathOptions) -> Result<Metric> {
        Ok(centrality::normalize_by_min(
            self.absolute_eccentricity(&Example::All, options)?,
        ))
    }

    /// Raw closeness (sum of distances) of vertices matching `example`.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn absolute_closeness(&self, example: &Example, options: &PathOptions) -> Result<Metric> {
        let rows = self.run(&self.composer()?.absolute_closeness(example, options)?)?;
        centrality::parse_metric(&rows)
    }

    /// Same as [`Self::absolute_closeness`].
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn farness(&self, example: &Example, options: &PathOptions) -> Result<Metric> {
        self.absolute_closeness(example, options)
    }

    /// Closeness of every vertex relative to the smallest farness.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn closeness(&self, options: &PathOptions) -> Result<Metric> {
        Ok(centrality::normalize_by_min(
            self.absolute_closeness(&Example::All, options)?,
        ))
    }

    /// Raw betweenness of vertices matching `example`.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn absolute_betweenness(&self, example: &Example, options: &PathOptions) -> Result<Metric> {
        let rows = self.run(&self.composer()?.absolute_betweenness(example, options)?)?;
        centrality::parse_betweenness(&rows, options.direction == Direction::Any)
    }

    /// Betweenness of every vertex relative to the largest one.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn betweenness(&self, options: &PathOptions) -> Result<Metric> {
        Ok(centrality::normalize_by_max(
            self.absolute_betweenness(&Example::All, options)?,
        ))
    }

    /// Smallest eccentricity, `None` without any path.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn radius(&self, options: &PathOptions) -> Result<Option<f64>> {
        centrality::parse_scalar(&self.run(&self.composer()?.radius(options)?)?)
    }

    /// Largest shortest-path distance, `None` without any path.
    ///
    /// # Errors
    ///
    /// See [`Self::edges`].
    pub fn diameter(&self, options: &PathOptions) -> Result<Option<f64>> {
        centrality::parse_scalar(&self.run(&self.composer()?.diameter(options)?)?)
    }
}
