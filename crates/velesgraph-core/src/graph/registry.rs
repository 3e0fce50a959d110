//! Persisted graph documents and the registry that lists them.
//!
//! Each graph is one document in a system collection (`_graphs` by default)
//! keyed by the graph name. The cascading delete consults [`GraphRegistry`]
//! to find every graph sharing a collection; the manager writes through
//! [`GraphRegistryMut`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::edge_definition::EdgeDefinition;
use crate::error::{Error, Result};
use crate::store::{CollectionStore, Document, DocumentHandle, InsertOptions, RemoveOptions};

/// One graph as stored in the registry collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    /// Graph name.
    #[serde(rename = "_key")]
    pub key: String,
    /// Storage id, set once persisted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Storage revision, set once persisted.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Ordered edge definitions.
    #[serde(default)]
    pub edge_definitions: Vec<EdgeDefinition>,
    /// Vertex collections not referenced by any edge definition.
    #[serde(default)]
    pub orphan_collections: Vec<String>,
    /// Shard count hint, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_shards: Option<u32>,
    /// Replication factor hint, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<u32>,
}

impl GraphDocument {
    /// Creates an unsaved graph document.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        edge_definitions: Vec<EdgeDefinition>,
        orphan_collections: Vec<String>,
    ) -> Self {
        Self {
            key: key.into(),
            id: None,
            rev: None,
            edge_definitions,
            orphan_collections,
            number_of_shards: None,
            replication_factor: None,
        }
    }

    /// Returns the definition of `edge_collection`, if this graph uses it.
    #[must_use]
    pub fn edge_definition(&self, edge_collection: &str) -> Option<&EdgeDefinition> {
        self.edge_definitions
            .iter()
            .find(|d| d.collection == edge_collection)
    }

    /// Returns true if `collection` appears anywhere in this graph: as edge
    /// collection, as from/to endpoint, or as orphan.
    #[must_use]
    pub fn references(&self, collection: &str) -> bool {
        self.edge_definitions
            .iter()
            .any(|d| d.collection == collection || d.references_vertex(collection))
            || self.orphan_collections.iter().any(|o| o == collection)
    }

    /// Renames `old` to `new` everywhere. Returns true if anything changed.
    pub fn rename_collection(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        let mut rename = |name: &mut String| {
            if *name == old {
                *name = new.to_string();
                changed = true;
            }
        };
        for definition in &mut self.edge_definitions {
            rename(&mut definition.collection);
            definition.from.iter_mut().for_each(&mut rename);
            definition.to.iter_mut().for_each(&mut rename);
        }
        self.orphan_collections.iter_mut().for_each(&mut rename);
        changed
    }

    /// Parses a stored document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the document is not a graph.
    pub fn from_document(document: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(document))?)
    }

    /// Converts to a storable document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if serialization fails.
    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidGraph(format!(
                "graph document serialized to non-object {other}"
            ))),
        }
    }
}

/// Read access to all persisted graphs.
pub trait GraphRegistry: Send + Sync {
    /// Returns true if a graph named `name` exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Returns every persisted graph document.
    fn list(&self) -> Result<Vec<GraphDocument>>;

    /// Returns the graph document named `name`.
    ///
    /// Fails with `Error::GraphNotFound` if it does not exist.
    fn document(&self, name: &str) -> Result<GraphDocument>;

    /// Returns the names of all persisted graphs.
    fn names(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|g| g.key).collect())
    }
}

/// Write access to the persisted graphs.
pub trait GraphRegistryMut: GraphRegistry {
    /// Name of the collection that holds graph documents.
    fn collection(&self) -> &str;

    /// Persists a new graph. Fails with `Error::GraphDuplicate` if the name
    /// is taken.
    fn save(&self, graph: &GraphDocument) -> Result<GraphDocument>;

    /// Replaces an existing graph document.
    fn update(&self, graph: &GraphDocument) -> Result<GraphDocument>;

    /// Replaces an existing graph document through `store`, e.g. a
    /// transaction scope.
    fn update_in(&self, store: &dyn CollectionStore, graph: &GraphDocument)
        -> Result<GraphDocument>;

    /// Removes a graph document.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Registry backed by a system collection of the collection store.
pub struct SystemGraphRegistry {
    store: Arc<dyn CollectionStore>,
    collection: String,
}

impl SystemGraphRegistry {
    /// Creates a registry over `collection` in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CollectionStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    fn ensure_collection(&self, store: &dyn CollectionStore) -> Result<()> {
        if store.collection_type(&self.collection).is_some() {
            Ok(())
        } else {
            Err(Error::NoGraphCollection(self.collection.clone()))
        }
    }

    fn handle(&self, name: &str) -> Result<DocumentHandle> {
        if name.is_empty() {
            return Err(Error::MissingGraphName);
        }
        Ok(DocumentHandle::new(self.collection.as_str(), name))
    }

    fn with_meta(graph: &GraphDocument, id: &DocumentHandle, rev: String) -> GraphDocument {
        GraphDocument {
            id: Some(id.to_string()),
            rev: Some(rev),
            ..graph.clone()
        }
    }
}

impl std::fmt::Debug for SystemGraphRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemGraphRegistry")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl GraphRegistry for SystemGraphRegistry {
    fn exists(&self, name: &str) -> Result<bool> {
        self.ensure_collection(self.store.as_ref())?;
        match self.store.document(&self.handle(name)?) {
            Ok(_) => Ok(true),
            Err(Error::DocumentNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list(&self) -> Result<Vec<GraphDocument>> {
        self.ensure_collection(self.store.as_ref())?;
        self.store
            .all_documents(&self.collection)?
            .into_iter()
            .map(GraphDocument::from_document)
            .collect()
    }

    fn document(&self, name: &str) -> Result<GraphDocument> {
        self.ensure_collection(self.store.as_ref())?;
        match self.store.document(&self.handle(name)?) {
            Ok(document) => GraphDocument::from_document(document),
            Err(Error::DocumentNotFound(_)) => Err(Error::GraphNotFound(name.to_string())),
            Err(e) => Err(e),
        }
    }
}

impl GraphRegistryMut for SystemGraphRegistry {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn save(&self, graph: &GraphDocument) -> Result<GraphDocument> {
        if self.exists(&graph.key)? {
            return Err(Error::GraphDuplicate(graph.key.clone()));
        }
        let document = GraphDocument {
            id: None,
            rev: None,
            ..graph.clone()
        }
        .to_document()?;
        let meta = self
            .store
            .insert(&self.collection, document, &InsertOptions::default())?;
        Ok(Self::with_meta(graph, &meta.id, meta.rev))
    }

    fn update(&self, graph: &GraphDocument) -> Result<GraphDocument> {
        self.update_in(self.store.as_ref(), graph)
    }

    fn update_in(
        &self,
        store: &dyn CollectionStore,
        graph: &GraphDocument,
    ) -> Result<GraphDocument> {
        self.ensure_collection(store)?;
        let handle = self.handle(&graph.key)?;
        let document = GraphDocument {
            id: None,
            rev: None,
            ..graph.clone()
        }
        .to_document()?;
        match store.replace(&handle, document) {
            Ok(meta) => Ok(Self::with_meta(graph, &meta.id, meta.rev)),
            Err(Error::DocumentNotFound(_)) => Err(Error::GraphNotFound(graph.key.clone())),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.ensure_collection(self.store.as_ref())?;
        match self.store.remove(&self.handle(name)?, &RemoveOptions::default()) {
            Ok(()) => Ok(()),
            Err(Error::DocumentNotFound(_)) => Err(Error::GraphNotFound(name.to_string())),
            Err(e) => Err(e),
        }
    }
}
