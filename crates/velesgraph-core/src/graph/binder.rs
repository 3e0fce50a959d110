//! Graph-bound collection handles.
//!
//! A bound handle forwards to the collection store, checking edge
//! definitions on insert and running the cascading delete on remove.
//! Handles borrow their [`GraphDefinition`] and are rebuilt from
//! [`Bindings`] after every structural edit.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use super::cascade::CascadingDelete;
use super::definition::GraphDefinition;
use super::registry::GraphDocument;
use crate::error::{Error, Result};
use crate::store::{Document, DocumentHandle, DocumentMeta, InsertOptions, RemoveOptions};

/// Collection names bound to a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    vertices: IndexSet<String>,
    edges: IndexSet<String>,
}

impl Bindings {
    /// Binds every collection of `graph`: edge collections from the edge
    /// definitions, vertex collections from their endpoints followed by the
    /// orphans.
    #[must_use]
    pub fn of(graph: &GraphDocument) -> Self {
        let mut bindings = Self::default();
        for definition in &graph.edge_definitions {
            bindings.edges.insert(definition.collection.clone());
            for vertex in definition.vertex_collections() {
                bindings.vertices.insert(vertex.to_string());
            }
        }
        for orphan in &graph.orphan_collections {
            bindings.vertices.insert(orphan.clone());
        }

        debug!(
            graph = %graph.key,
            vertex_collections = bindings.vertices.len(),
            edge_collections = bindings.edges.len(),
            "graph collections bound"
        );
        bindings
    }

    /// Bound vertex collections.
    pub fn vertex_collections(&self) -> impl Iterator<Item = &str> {
        self.vertices.iter().map(String::as_str)
    }

    /// Bound edge collections.
    pub fn edge_collections(&self) -> impl Iterator<Item = &str> {
        self.edges.iter().map(String::as_str)
    }

    /// Returns true if `name` is a bound vertex collection.
    #[must_use]
    pub fn has_vertex_collection(&self, name: &str) -> bool {
        self.vertices.contains(name)
    }

    /// Returns true if `name` is a bound edge collection.
    #[must_use]
    pub fn has_edge_collection(&self, name: &str) -> bool {
        self.edges.contains(name)
    }

    pub(crate) fn vertex_name(&self, name: &str) -> Option<&str> {
        self.vertices.get(name).map(String::as_str)
    }

    pub(crate) fn edge_name(&self, name: &str) -> Option<&str> {
        self.edges.get(name).map(String::as_str)
    }
}

fn endpoint(data: &Document, attribute: &str) -> Result<DocumentHandle> {
    match data.get(attribute) {
        Some(Value::String(id)) => DocumentHandle::parse(id),
        Some(other) => Err(Error::DocumentHandleBad(other.to_string())),
        None => Err(Error::DocumentHandleBad(format!("<missing {attribute}>"))),
    }
}

/// An edge collection bound to one graph.
#[derive(Debug, Clone, Copy)]
pub struct BoundEdgeCollection<'g> {
    graph: &'g GraphDefinition,
    name: &'g str,
}

impl<'g> BoundEdgeCollection<'g> {
    pub(crate) fn new(graph: &'g GraphDefinition, name: &'g str) -> Self {
        Self { graph, name }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    fn handle(&self, id_or_key: &str) -> Result<DocumentHandle> {
        let handle = DocumentHandle::resolve(id_or_key, self.name)?;
        if handle.collection() == self.name {
            Ok(handle)
        } else {
            Err(Error::DocumentHandleBad(id_or_key.to_string()))
        }
    }

    /// Inserts an edge from `from` to `to` carrying `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::insert_with_options`].
    pub fn insert_between(&self, from: &str, to: &str, mut data: Document) -> Result<DocumentMeta> {
        data.insert("_from".to_string(), Value::from(from));
        data.insert("_to".to_string(), Value::from(to));
        self.insert_with_options(data, &InsertOptions::default())
    }

    /// Inserts an edge whose `_from`/`_to` are part of `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::insert_with_options`].
    pub fn insert(&self, data: Document) -> Result<DocumentMeta> {
        self.insert_with_options(data, &InsertOptions::default())
    }

    /// Inserts an edge after checking it against the edge definition of
    /// this collection in this graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` if `_from` or `_to` is not a
    /// `collection/key` id, `Error::InvalidEdge` if the pair of endpoint
    /// collections is not allowed, `Error::Forbidden` without write access,
    /// or the store's error.
    pub fn insert_with_options(
        &self,
        data: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta> {
        let from = endpoint(&data, "_from")?;
        let to = endpoint(&data, "_to")?;

        let allowed = self
            .graph
            .document()
            .edge_definition(self.name)
            .is_some_and(|d| d.allows(from.collection(), to.collection()));
        if !allowed {
            return Err(Error::InvalidEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;
        ctx.store.insert(self.name, data, options)
    }

    /// Fetches an edge by id or key.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// store's error.
    pub fn document(&self, id_or_key: &str) -> Result<Document> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_read(self.name)?;
        ctx.store.document(&handle)
    }

    /// Replaces the body of an edge, keeping its endpoints.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// store's error.
    pub fn replace(&self, id_or_key: &str, data: Document) -> Result<DocumentMeta> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;
        ctx.store.replace(&handle, data)
    }

    /// Edges of this collection incident to `vertex_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` or the store's error.
    pub fn edges(&self, vertex_id: &str) -> Result<Vec<Document>> {
        let ctx = self.graph.context();
        ctx.access().require_read(self.name)?;
        ctx.store.edges(self.name, vertex_id)
    }

    /// Every edge of this collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` or the store's error.
    pub fn all(&self) -> Result<Vec<Document>> {
        let ctx = self.graph.context();
        ctx.access().require_read(self.name)?;
        ctx.store.all_documents(self.name)
    }

    /// Removes an edge together with every edge that depends on it, in any
    /// graph, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// transaction's error unchanged. Nothing is removed on error.
    pub fn remove(&self, id_or_key: &str, options: &RemoveOptions) -> Result<()> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;

        CascadingDelete {
            registry: ctx.registry.as_ref(),
            store: ctx.store.as_ref(),
            transactions: ctx.transactions.as_ref(),
        }
        .remove_edge(self.graph.pending(), &handle, options)
    }
}

/// A vertex collection bound to one graph.
#[derive(Debug, Clone, Copy)]
pub struct BoundVertexCollection<'g> {
    graph: &'g GraphDefinition,
    name: &'g str,
}

impl<'g> BoundVertexCollection<'g> {
    pub(crate) fn new(graph: &'g GraphDefinition, name: &'g str) -> Self {
        Self { graph, name }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    fn handle(&self, id_or_key: &str) -> Result<DocumentHandle> {
        let handle = DocumentHandle::resolve(id_or_key, self.name)?;
        if handle.collection() == self.name {
            Ok(handle)
        } else {
            Err(Error::DocumentHandleBad(id_or_key.to_string()))
        }
    }

    /// Inserts a vertex.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` or the store's error.
    pub fn insert(&self, data: Document) -> Result<DocumentMeta> {
        self.insert_with_options(data, &InsertOptions::default())
    }

    /// Inserts a vertex with store options.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` or the store's error.
    pub fn insert_with_options(
        &self,
        data: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta> {
        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;
        ctx.store.insert(self.name, data, options)
    }

    /// Fetches a vertex by id or key.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// store's error.
    pub fn document(&self, id_or_key: &str) -> Result<Document> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_read(self.name)?;
        ctx.store.document(&handle)
    }

    /// Replaces a vertex body.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// store's error.
    pub fn replace(&self, id_or_key: &str, data: Document) -> Result<DocumentMeta> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;
        ctx.store.replace(&handle, data)
    }

    /// Every vertex of this collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` or the store's error.
    pub fn all(&self) -> Result<Vec<Document>> {
        let ctx = self.graph.context();
        ctx.access().require_read(self.name)?;
        ctx.store.all_documents(self.name)
    }

    /// Removes a vertex and every edge touching it in any graph, in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::Forbidden` or the
    /// transaction's error unchanged. Nothing is removed on error.
    pub fn remove(&self, id_or_key: &str, options: &RemoveOptions) -> Result<()> {
        let handle = self.handle(id_or_key)?;
        let ctx = self.graph.context();
        ctx.access().require_write(self.name)?;

        CascadingDelete {
            registry: ctx.registry.as_ref(),
            store: ctx.store.as_ref(),
            transactions: ctx.transactions.as_ref(),
        }
        .remove_vertex(self.graph.pending(), &handle, options)
    }
}
