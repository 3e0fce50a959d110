//! In-memory collection store and transaction engine.
//!
//! `MemoryDatabase` keeps every collection behind one `RwLock`. Transactions
//! run one at a time. A failed transaction restores the collections of its
//! write set from a snapshot; other collections are left as they are.

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    CollectionStore, CollectionType, Document, DocumentHandle, DocumentMeta, InsertOptions,
    RemoveOptions, TransactionEngine, TransactionSpec,
};
use crate::config::DEFAULT_GRAPH_COLLECTION;
use crate::error::{Error, Result};

/// Collaborator code for a revision mismatch on remove.
const CONFLICT: u32 = 1200;
/// Collaborator code for a duplicate collection name.
const DUPLICATE_NAME: u32 = 1207;
/// Collaborator code for a unique key violation.
const UNIQUE_CONSTRAINT_VIOLATED: u32 = 1210;
/// Collaborator code for an edge without `_from`/`_to`.
const INVALID_EDGE_ATTRIBUTE: u32 = 1233;
/// Collaborator code for a write to a collection outside the write set.
const UNREGISTERED_COLLECTION: u32 = 1652;

#[derive(Debug, Clone)]
struct MemoryCollection {
    kind: CollectionType,
    documents: IndexMap<String, Document>,
}

#[derive(Debug, Clone, Default)]
struct State {
    collections: FxHashMap<String, MemoryCollection>,
}

impl State {
    fn collection(&self, name: &str) -> Result<&MemoryCollection> {
        self.collections
            .get(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut MemoryCollection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }
}

/// In-memory implementation of [`CollectionStore`] and [`TransactionEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use velesgraph_core::store::{memory::MemoryDatabase, CollectionType};
///
/// let db = MemoryDatabase::new();
/// db.create_collection("person", CollectionType::Document)?;
/// db.create_collection("knows", CollectionType::Edge)?;
/// ```
#[derive(Debug)]
pub struct MemoryDatabase {
    state: RwLock<State>,
    /// Serializes transactions so snapshots never interleave.
    transaction_lock: Mutex<()>,
    next_key: AtomicU64,
    next_rev: AtomicU64,
    /// Ids whose removal fails, for rollback tests.
    failing_removals: Mutex<FxHashSet<String>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Creates a database holding only the default graph registry collection.
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        state.collections.insert(
            DEFAULT_GRAPH_COLLECTION.to_string(),
            MemoryCollection {
                kind: CollectionType::Document,
                documents: IndexMap::new(),
            },
        );

        Self {
            state: RwLock::new(state),
            transaction_lock: Mutex::new(()),
            next_key: AtomicU64::new(1),
            next_rev: AtomicU64::new(1),
            failing_removals: Mutex::new(FxHashSet::default()),
        }
    }

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the name is already taken.
    pub fn create_collection(&self, name: &str, kind: CollectionType) -> Result<()> {
        let mut state = self.state.write();
        if state.collections.contains_key(name) {
            return Err(Error::collaborator(
                DUPLICATE_NAME,
                format!("duplicate collection name '{name}'"),
            ));
        }
        state.collections.insert(
            name.to_string(),
            MemoryCollection {
                kind,
                documents: IndexMap::new(),
            },
        );
        Ok(())
    }

    /// Returns true if the document with `id` is stored.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        let Ok(handle) = DocumentHandle::parse(id) else {
            return false;
        };
        self.state
            .read()
            .collections
            .get(handle.collection())
            .is_some_and(|c| c.documents.contains_key(handle.key()))
    }

    /// Returns the number of documents in a collection (0 if absent).
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .collections
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    /// Makes every later removal of `id` fail.
    pub fn fail_removal_of(&self, id: &str) {
        self.failing_removals.lock().insert(id.to_string());
    }

    fn generate_key(&self) -> String {
        self.next_key.fetch_add(1, Ordering::Relaxed).to_string()
    }

    fn generate_rev(&self) -> String {
        format!("_{}", self.next_rev.fetch_add(1, Ordering::Relaxed))
    }

    fn insert_document(
        &self,
        collection: &str,
        mut document: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta> {
        let key = match document.get("_key") {
            Some(Value::String(key)) if !key.is_empty() => key.clone(),
            Some(other) if !other.is_null() => {
                return Err(Error::DocumentHandleBad(other.to_string()));
            }
            _ => self.generate_key(),
        };

        let mut state = self.state.write();
        let target = state.collection_mut(collection)?;

        if target.kind == CollectionType::Edge {
            for attribute in ["_from", "_to"] {
                let valid = matches!(document.get(attribute), Some(Value::String(id)) if DocumentHandle::parse(id).is_ok());
                if !valid {
                    return Err(Error::collaborator(
                        INVALID_EDGE_ATTRIBUTE,
                        format!("edge attribute missing or invalid: {attribute}"),
                    ));
                }
            }
        }

        if target.documents.contains_key(&key) && !options.overwrite {
            return Err(Error::collaborator(
                UNIQUE_CONSTRAINT_VIOLATED,
                format!("unique constraint violated for key '{key}' in '{collection}'"),
            ));
        }

        let id = DocumentHandle::new(collection, key.clone());
        let rev = self.generate_rev();
        document.insert("_key".to_string(), Value::String(key.clone()));
        document.insert("_id".to_string(), Value::String(id.to_string()));
        document.insert("_rev".to_string(), Value::String(rev.clone()));
        target.documents.insert(key, document);

        Ok(DocumentMeta { id, rev })
    }

    fn replace_document(&self, id: &DocumentHandle, mut document: Document) -> Result<DocumentMeta> {
        let mut state = self.state.write();
        let target = state.collection_mut(id.collection())?;
        let existing = target
            .documents
            .get(id.key())
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        if target.kind == CollectionType::Edge {
            for attribute in ["_from", "_to"] {
                if !document.contains_key(attribute) {
                    if let Some(value) = existing.get(attribute) {
                        document.insert(attribute.to_string(), value.clone());
                    }
                }
            }
        }

        let rev = self.generate_rev();
        document.insert("_key".to_string(), Value::String(id.key().to_string()));
        document.insert("_id".to_string(), Value::String(id.to_string()));
        document.insert("_rev".to_string(), Value::String(rev.clone()));
        target.documents.insert(id.key().to_string(), document);

        Ok(DocumentMeta {
            id: id.clone(),
            rev,
        })
    }

    fn remove_document(&self, id: &DocumentHandle, options: &RemoveOptions) -> Result<()> {
        if self.failing_removals.lock().contains(&id.to_string()) {
            return Err(Error::collaborator(
                CONFLICT,
                format!("injected failure removing '{id}'"),
            ));
        }

        let mut state = self.state.write();
        let target = state.collection_mut(id.collection())?;
        let stored = target
            .documents
            .get(id.key())
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        if let Some(expected) = &options.rev {
            let actual = stored.get("_rev").and_then(Value::as_str).unwrap_or_default();
            if actual != expected {
                return Err(Error::collaborator(
                    CONFLICT,
                    format!("revision conflict on '{id}': expected {expected}, found {actual}"),
                ));
            }
        }

        target.documents.shift_remove(id.key());
        Ok(())
    }

    fn read_document(&self, id: &DocumentHandle) -> Result<Document> {
        let state = self.state.read();
        state
            .collection(id.collection())?
            .documents
            .get(id.key())
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    fn incident_edges(&self, edge_collection: &str, vertex_id: &str) -> Result<Vec<Document>> {
        let state = self.state.read();
        let collection = state.collection(edge_collection)?;
        if collection.kind != CollectionType::Edge {
            return Err(Error::CollectionTypeInvalid(format!(
                "'{edge_collection}' is not an edge collection"
            )));
        }

        let touches = |doc: &Document, attribute: &str| {
            doc.get(attribute).and_then(Value::as_str) == Some(vertex_id)
        };
        Ok(collection
            .documents
            .values()
            .filter(|doc| touches(doc, "_from") || touches(doc, "_to"))
            .cloned()
            .collect())
    }

    fn documents_of(&self, collection: &str) -> Result<Vec<Document>> {
        let state = self.state.read();
        Ok(state
            .collection(collection)?
            .documents
            .values()
            .cloned()
            .collect())
    }

    fn drop_named(&self, name: &str) -> Result<()> {
        self.state
            .write()
            .collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }
}

impl CollectionStore for MemoryDatabase {
    fn collection_type(&self, name: &str) -> Option<CollectionType> {
        self.state.read().collections.get(name).map(|c| c.kind)
    }

    fn insert(
        &self,
        collection: &str,
        document: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta> {
        self.insert_document(collection, document, options)
    }

    fn replace(&self, id: &DocumentHandle, document: Document) -> Result<DocumentMeta> {
        self.replace_document(id, document)
    }

    fn remove(&self, id: &DocumentHandle, options: &RemoveOptions) -> Result<()> {
        self.remove_document(id, options)
    }

    fn document(&self, id: &DocumentHandle) -> Result<Document> {
        self.read_document(id)
    }

    fn edges(&self, edge_collection: &str, vertex_id: &str) -> Result<Vec<Document>> {
        self.incident_edges(edge_collection, vertex_id)
    }

    fn all_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.documents_of(collection)
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        self.drop_named(name)
    }
}

/// Store view handed to a transaction action.
///
/// Reads see the whole database; writes are limited to the declared set.
struct TransactionScope<'a> {
    db: &'a MemoryDatabase,
    write: FxHashSet<&'a str>,
}

impl TransactionScope<'_> {
    fn check_write(&self, collection: &str) -> Result<()> {
        if self.write.contains(collection) {
            Ok(())
        } else {
            Err(Error::collaborator(
                UNREGISTERED_COLLECTION,
                format!("collection '{collection}' was not declared for writing"),
            ))
        }
    }
}

impl CollectionStore for TransactionScope<'_> {
    fn collection_type(&self, name: &str) -> Option<CollectionType> {
        self.db.collection_type(name)
    }

    fn insert(
        &self,
        collection: &str,
        document: Document,
        options: &InsertOptions,
    ) -> Result<DocumentMeta> {
        self.check_write(collection)?;
        self.db.insert_document(collection, document, options)
    }

    fn replace(&self, id: &DocumentHandle, document: Document) -> Result<DocumentMeta> {
        self.check_write(id.collection())?;
        self.db.replace_document(id, document)
    }

    fn remove(&self, id: &DocumentHandle, options: &RemoveOptions) -> Result<()> {
        self.check_write(id.collection())?;
        self.db.remove_document(id, options)
    }

    fn document(&self, id: &DocumentHandle) -> Result<Document> {
        self.db.read_document(id)
    }

    fn edges(&self, edge_collection: &str, vertex_id: &str) -> Result<Vec<Document>> {
        self.db.incident_edges(edge_collection, vertex_id)
    }

    fn all_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.db.documents_of(collection)
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        Err(Error::collaborator(
            UNREGISTERED_COLLECTION,
            format!("cannot drop '{name}' inside a transaction"),
        ))
    }
}

impl TransactionEngine for MemoryDatabase {
    fn execute(
        &self,
        spec: &TransactionSpec,
        action: &mut dyn FnMut(&dyn CollectionStore) -> Result<()>,
    ) -> Result<()> {
        let _serialized = self.transaction_lock.lock();

        let snapshot = {
            let state = self.state.read();
            spec.write
                .iter()
                .map(|name| {
                    state
                        .collection(name)
                        .map(|collection| (name.clone(), collection.clone()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let scope = TransactionScope {
            db: self,
            write: spec.write.iter().map(String::as_str).collect(),
        };

        match action(&scope) {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut state = self.state.write();
                for (name, collection) in snapshot {
                    state.collections.insert(name, collection);
                }
                Err(e)
            }
        }
    }
}
