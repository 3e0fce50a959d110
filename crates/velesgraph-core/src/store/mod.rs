//! Collaborator interfaces consumed by the graph layer.
//!
//! The graph layer never stores documents, runs transactions, or executes
//! queries itself. It talks to four external services through the traits in
//! this module:
//!
//! - [`CollectionStore`]: document/edge collections
//! - [`TransactionEngine`]: atomic multi-collection writes
//! - [`QueryEngine`]: execution of composed traversal queries
//! - [`PermissionService`]: per-collection access levels
//!
//! [`memory::MemoryDatabase`] implements the store and transaction engine in
//! memory for embedding and tests.

pub mod memory;
#[cfg(test)]
mod memory_tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::graph::ComposedQuery;

/// A stored document: a JSON object including its `_id`, `_key`, `_rev`
/// system attributes (and `_from`/`_to` for edges).
pub type Document = Map<String, Value>;

/// Type of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Document collection, used for vertices.
    Document,
    /// Edge collection, documents carry `_from` and `_to`.
    Edge,
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Edge => f.write_str("edge"),
        }
    }
}

/// A validated `collection/key` document handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentHandle {
    collection: String,
    key: String,
}

impl DocumentHandle {
    /// Creates a handle from its parts without validation.
    #[must_use]
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Parses a `collection/key` id.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` if either part is missing.
    pub fn parse(id: &str) -> Result<Self> {
        match id.split_once('/') {
            Some((collection, key))
                if !collection.is_empty() && !key.is_empty() && !key.contains('/') =>
            {
                Ok(Self::new(collection, key))
            }
            _ => Err(Error::DocumentHandleBad(id.to_string())),
        }
    }

    /// Resolves either a full id or a bare key relative to `collection`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for empty or malformed input.
    pub fn resolve(id_or_key: &str, collection: &str) -> Result<Self> {
        if id_or_key.contains('/') {
            Self::parse(id_or_key)
        } else if id_or_key.is_empty() {
            Err(Error::DocumentHandleBad(id_or_key.to_string()))
        } else {
            Ok(Self::new(collection, id_or_key))
        }
    }

    /// Reads the `_id` attribute of a stored document.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` if `_id` is absent or malformed.
    pub fn of_document(document: &Document) -> Result<Self> {
        match document.get("_id") {
            Some(Value::String(id)) => Self::parse(id),
            _ => Err(Error::DocumentHandleBad("<missing _id>".to_string())),
        }
    }

    /// Returns the collection part.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the key part.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

impl FromStr for DocumentHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Identity of a written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Document handle.
    pub id: DocumentHandle,
    /// Revision assigned by the store.
    pub rev: String,
}

impl DocumentMeta {
    /// Returns the document key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.id.key()
    }
}

/// Options forwarded to the store on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsertOptions {
    /// Wait until the write is synced to disk.
    pub wait_for_sync: bool,
    /// Replace an existing document with the same key.
    pub overwrite: bool,
}

/// Options forwarded to the store on remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveOptions {
    /// Wait until the write is synced to disk.
    pub wait_for_sync: bool,
    /// Only remove if the stored revision matches.
    pub rev: Option<String>,
}

/// Collections a transaction declares for writing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSpec {
    /// Write-locked collections.
    pub write: Vec<String>,
}

/// Document/edge collection storage.
pub trait CollectionStore: Send + Sync {
    /// Returns the type of a collection, or `None` if it does not exist.
    fn collection_type(&self, name: &str) -> Option<CollectionType>;

    /// Inserts a document, assigning `_key` if absent.
    fn insert(
        &self,
        collection: &str,
        document: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta>;

    /// Replaces a stored document, keeping its key.
    fn replace(&self, id: &DocumentHandle, document: Document) -> Result<DocumentMeta>;

    /// Removes a document.
    fn remove(&self, id: &DocumentHandle, options: &RemoveOptions) -> Result<()>;

    /// Fetches a document.
    fn document(&self, id: &DocumentHandle) -> Result<Document>;

    /// Returns edges of `edge_collection` whose `_from` or `_to` equals
    /// `vertex_id`.
    fn edges(&self, edge_collection: &str, vertex_id: &str) -> Result<Vec<Document>>;

    /// Returns every document of a collection.
    fn all_documents(&self, collection: &str) -> Result<Vec<Document>>;

    /// Drops a collection.
    fn drop_collection(&self, name: &str) -> Result<()>;
}

/// Atomic multi-collection writes.
pub trait TransactionEngine: Send + Sync {
    /// Runs `action` inside one transaction that write-locks `spec.write`.
    ///
    /// Commits when `action` returns `Ok`; otherwise rolls back completely and
    /// returns the action's error unchanged.
    fn execute(
        &self,
        spec: &TransactionSpec,
        action: &mut dyn FnMut(&dyn CollectionStore) -> Result<()>,
    ) -> Result<()>;
}

/// Executes composed queries.
pub trait QueryEngine: Send + Sync {
    /// Runs the query with its bind variables and returns all result rows.
    fn execute(&self, query: &ComposedQuery) -> Result<Vec<Value>>;
}

/// Access level of a user on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    /// No access.
    #[serde(rename = "none")]
    None,
    /// Read only.
    #[serde(rename = "ro")]
    ReadOnly,
    /// Read and write.
    #[serde(rename = "rw")]
    ReadWrite,
}

impl AccessLevel {
    /// Returns true if documents may be read.
    #[must_use]
    pub fn can_read(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns true if documents may be written.
    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Delegated authorization checks.
pub trait PermissionService: Send + Sync {
    /// Returns the acting user, or `None` when authentication is inactive.
    fn current_user(&self) -> Option<String>;

    /// Returns the access level of `user` on `database`/`collection`.
    fn permission(&self, user: &str, database: &str, collection: &str) -> AccessLevel;
}

/// Permission checks for one database, skipped when no service is wired.
#[derive(Clone, Copy)]
pub struct AccessCheck<'a> {
    permissions: Option<&'a dyn PermissionService>,
    database: &'a str,
}

impl<'a> AccessCheck<'a> {
    /// Checks against `permissions` for collections of `database`.
    #[must_use]
    pub fn new(permissions: Option<&'a dyn PermissionService>, database: &'a str) -> Self {
        Self {
            permissions,
            database,
        }
    }

    /// A check that allows everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            permissions: None,
            database: "",
        }
    }

    fn level(&self, collection: &str) -> Option<AccessLevel> {
        let service = self.permissions?;
        let user = service.current_user()?;
        Some(service.permission(&user, self.database, collection))
    }

    /// Fails with `Error::Forbidden` unless the acting user may read.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` on insufficient permission.
    pub fn require_read(&self, collection: &str) -> Result<()> {
        match self.level(collection) {
            Some(level) if !level.can_read() => Err(Error::Forbidden(collection.to_string())),
            _ => Ok(()),
        }
    }

    /// Fails with `Error::Forbidden` unless the acting user may write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` on insufficient permission.
    pub fn require_write(&self, collection: &str) -> Result<()> {
        match self.level(collection) {
            Some(level) if !level.can_write() => Err(Error::Forbidden(collection.to_string())),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for AccessCheck<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCheck")
            .field("enabled", &self.permissions.is_some())
            .field("database", &self.database)
            .finish()
    }
}
