//! Graph lifecycle: create, load, drop, rename collections.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::definition::GraphDefinition;
use super::edge_definition::{
    check_collection, check_cross_graph, check_unique_edge_collections, validate_against_store,
    EdgeDefinition,
};
use super::registry::{GraphDocument, GraphRegistry, GraphRegistryMut, SystemGraphRegistry};
use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::store::memory::MemoryDatabase;
use crate::store::{
    AccessCheck, CollectionStore, CollectionType, PermissionService, QueryEngine,
    TransactionEngine, TransactionSpec,
};

/// Collaborators and configuration shared by every graph.
#[derive(Clone)]
pub struct GraphContext {
    pub(crate) store: Arc<dyn CollectionStore>,
    pub(crate) transactions: Arc<dyn TransactionEngine>,
    pub(crate) queries: Option<Arc<dyn QueryEngine>>,
    pub(crate) permissions: Option<Arc<dyn PermissionService>>,
    pub(crate) registry: Arc<dyn GraphRegistryMut>,
    pub(crate) config: Arc<GraphConfig>,
}

impl GraphContext {
    /// Creates a context over `store`, registering graphs in the configured
    /// system collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(
        store: Arc<dyn CollectionStore>,
        transactions: Arc<dyn TransactionEngine>,
        config: GraphConfig,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(SystemGraphRegistry::new(
            Arc::clone(&store),
            config.registry.collection.clone(),
        ));
        Ok(Self {
            store,
            transactions,
            queries: None,
            permissions: None,
            registry,
            config: Arc::new(config),
        })
    }

    /// Context backed by one [`MemoryDatabase`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn in_memory(database: Arc<MemoryDatabase>, config: GraphConfig) -> Result<Self> {
        Self::new(database.clone(), database, config)
    }

    /// Sets the engine that executes composed queries.
    #[must_use]
    pub fn with_query_engine(mut self, queries: Arc<dyn QueryEngine>) -> Self {
        self.queries = Some(queries);
        self
    }

    /// Sets the permission service.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionService>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Replaces the graph registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn GraphRegistryMut>) -> Self {
        self.registry = registry;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn access(&self) -> AccessCheck<'_> {
        if self.config.permissions.enforce {
            AccessCheck::new(self.permissions.as_deref(), &self.config.registry.database)
        } else {
            AccessCheck::disabled()
        }
    }

    pub(crate) fn query_engine(&self) -> Result<&dyn QueryEngine> {
        self.queries
            .as_deref()
            .ok_or_else(|| Error::Config("no query engine configured".to_string()))
    }
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("registry", &self.registry.collection())
            .field("queries", &self.queries.is_some())
            .field("permissions", &self.permissions.is_some())
            .finish_non_exhaustive()
    }
}

/// Shard hints for [`GraphManager::create_graph`]; configured defaults
/// apply when unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateGraphOptions {
    /// Shard count hint.
    pub number_of_shards: Option<u32>,
    /// Replication factor hint.
    pub replication_factor: Option<u32>,
}

/// Entry point for creating, loading and dropping graphs.
#[derive(Debug, Clone)]
pub struct GraphManager {
    ctx: GraphContext,
}

impl GraphManager {
    /// Creates a manager over `ctx`.
    #[must_use]
    pub fn new(ctx: GraphContext) -> Self {
        Self { ctx }
    }

    /// Shared context.
    #[must_use]
    pub fn context(&self) -> &GraphContext {
        &self.ctx
    }

    /// Creates and persists a graph, returning it bound.
    ///
    /// Edge definitions keep their order with from/to sorted; orphans are
    /// sorted and deduplicated.
    ///
    /// # Errors
    ///
    /// - `Error::MissingGraphName` for an empty name
    /// - `Error::GraphDuplicate` if the name is taken
    /// - `Error::MalformedEdgeDefinition` / `Error::CollectionMultiUse` for
    ///   invalid definitions
    /// - `Error::CollectionUseInMultiGraphs` if another graph defines one of
    ///   the edge collections differently
    /// - `Error::CollectionNotFound` / `Error::CollectionTypeInvalid` /
    ///   `Error::Forbidden` from store validation
    /// - `Error::CollectionUsedInEdgeDefinition` if an orphan is also an
    ///   edge definition endpoint
    pub fn create_graph(
        &self,
        name: &str,
        edge_definitions: Vec<EdgeDefinition>,
        orphan_collections: Vec<String>,
        options: CreateGraphOptions,
    ) -> Result<GraphDefinition> {
        if name.is_empty() {
            return Err(Error::MissingGraphName);
        }
        if self.ctx.registry.exists(name)? {
            return Err(Error::GraphDuplicate(name.to_string()));
        }

        for definition in &edge_definitions {
            definition.validate_shape()?;
        }
        check_unique_edge_collections(&edge_definitions)?;
        let others = self.ctx.registry.list()?;
        check_cross_graph(
            &edge_definitions,
            others.iter().flat_map(|g| &g.edge_definitions),
        )?;

        let access = self.ctx.access();
        validate_against_store(&edge_definitions, self.ctx.store.as_ref(), &access)?;
        let mut orphans = orphan_collections;
        orphans.sort();
        orphans.dedup();
        for orphan in &orphans {
            if edge_definitions.iter().any(|d| d.references_vertex(orphan)) {
                return Err(Error::CollectionUsedInEdgeDefinition(orphan.clone()));
            }
            check_collection(
                self.ctx.store.as_ref(),
                &access,
                orphan,
                CollectionType::Document,
            )?;
        }
        access.require_write(self.ctx.registry.collection())?;

        let defaults = &self.ctx.config.defaults;
        let mut document = GraphDocument::new(
            name,
            edge_definitions.iter().map(EdgeDefinition::sorted).collect(),
            orphans,
        );
        document.number_of_shards = Some(options.number_of_shards.unwrap_or(defaults.number_of_shards));
        document.replication_factor =
            Some(options.replication_factor.unwrap_or(defaults.replication_factor));

        let saved = self.ctx.registry.save(&document)?;
        let mut graph = GraphDefinition::new(saved, self.ctx.clone());
        graph.bind()?;

        info!(
            graph = name,
            edge_definitions = graph.edge_definitions().len(),
            orphans = graph.orphan_collections().len(),
            "graph created"
        );
        Ok(graph)
    }

    /// Loads and binds a persisted graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::GraphNotFound` if it does not exist, or any binding
    /// error if a referenced collection has vanished.
    pub fn graph(&self, name: &str) -> Result<GraphDefinition> {
        let document = self.ctx.registry.document(name)?;
        let mut graph = GraphDefinition::new(document, self.ctx.clone());
        graph.bind()?;
        Ok(graph)
    }

    /// Removes a graph. With `drop_collections`, also drops every
    /// collection of the graph that no other graph uses.
    ///
    /// Permission on every collection to drop is checked before anything
    /// is removed. Individual drop failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::GraphNotFound` or `Error::Forbidden`.
    pub fn drop_graph(&self, name: &str, drop_collections: bool) -> Result<()> {
        let graph = self.ctx.registry.document(name)?;
        let access = self.ctx.access();
        access.require_write(self.ctx.registry.collection())?;

        let mut to_drop = Vec::new();
        if drop_collections {
            let others: Vec<GraphDocument> = self
                .ctx
                .registry
                .list()?
                .into_iter()
                .filter(|g| g.key != graph.key)
                .collect();
            for collection in collections_of(&graph) {
                if !others.iter().any(|g| g.references(&collection)) {
                    access.require_write(&collection)?;
                    to_drop.push(collection);
                }
            }
        }

        self.ctx.registry.remove(name)?;
        for collection in &to_drop {
            if let Err(error) = self.ctx.store.drop_collection(collection) {
                warn!(graph = name, collection = %collection, %error, "failed to drop collection");
            }
        }

        info!(graph = name, dropped_collections = to_drop.len(), "graph dropped");
        Ok(())
    }

    /// Rewrites every graph document referencing `old` to reference `new`,
    /// in one transaction on the registry collection. Returns the number of
    /// graphs changed.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for empty names, or the
    /// transaction's error.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<usize> {
        if old.is_empty() || new.is_empty() {
            return Err(Error::InvalidParameter(
                "collection names must be non empty".to_string(),
            ));
        }

        let mut changed: Vec<GraphDocument> = self
            .ctx
            .registry
            .list()?
            .into_iter()
            .filter_map(|mut g| g.rename_collection(old, new).then_some(g))
            .collect();
        if changed.is_empty() {
            return Ok(0);
        }

        let registry = self.ctx.registry.as_ref();
        let spec = TransactionSpec {
            write: vec![registry.collection().to_string()],
        };
        self.ctx.transactions.execute(&spec, &mut |store| {
            for graph in &mut changed {
                *graph = registry.update_in(store, graph)?;
            }
            Ok(())
        })?;

        info!(old, new, graphs = changed.len(), "collection renamed in graphs");
        Ok(changed.len())
    }

    /// Returns true if a graph named `name` exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoGraphCollection` if the registry is missing.
    pub fn graph_exists(&self, name: &str) -> Result<bool> {
        self.ctx.registry.exists(name)
    }

    /// Names of all graphs.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoGraphCollection` if the registry is missing.
    pub fn list_graphs(&self) -> Result<Vec<String>> {
        self.ctx.registry.names()
    }

    /// Persisted documents of all graphs.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoGraphCollection` if the registry is missing.
    pub fn list_graph_documents(&self) -> Result<Vec<GraphDocument>> {
        self.ctx.registry.list()
    }
}

/// Every collection a graph document names, edge collections first.
fn collections_of(graph: &GraphDocument) -> Vec<String> {
    let mut collections = indexmap::IndexSet::new();
    for definition in &graph.edge_definitions {
        collections.insert(definition.collection.clone());
    }
    for definition in &graph.edge_definitions {
        collections.extend(definition.vertex_collections().map(str::to_string));
    }
    collections.extend(graph.orphan_collections.iter().cloned());
    collections.into_iter().collect()
}
