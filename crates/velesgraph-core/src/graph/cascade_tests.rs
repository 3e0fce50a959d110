//! Tests for cascading deletes.

use super::cascade::*;
use super::edge_definition::EdgeDefinition;
use super::registry::{GraphDocument, GraphRegistry};
use crate::error::{Error, Result};
use crate::store::memory::MemoryDatabase;
use crate::store::{
    CollectionStore, CollectionType, Document, DocumentHandle, InsertOptions, RemoveOptions,
};
use parking_lot::Mutex;
use serde_json::json;

/// Registry over a fixed list of graphs.
struct StaticRegistry(Vec<GraphDocument>);

impl GraphRegistry for StaticRegistry {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.0.iter().any(|g| g.key == name))
    }

    fn list(&self) -> Result<Vec<GraphDocument>> {
        Ok(self.0.clone())
    }

    fn document(&self, name: &str) -> Result<GraphDocument> {
        self.0
            .iter()
            .find(|g| g.key == name)
            .cloned()
            .ok_or_else(|| Error::GraphNotFound(name.to_string()))
    }
}

fn def(collection: &str, from: &[&str], to: &[&str]) -> EdgeDefinition {
    EdgeDefinition {
        collection: collection.to_string(),
        from: from.iter().map(|s| (*s).to_string()).collect(),
        to: to.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn graph(name: &str, definitions: Vec<EdgeDefinition>) -> GraphDocument {
    GraphDocument::new(name, definitions, vec![])
}

fn doc(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test documents must be objects"),
    }
}

fn database(documents: &[&str], edges: &[&str]) -> MemoryDatabase {
    let db = MemoryDatabase::new();
    for name in documents {
        db.create_collection(name, CollectionType::Document)
            .expect("create document collection");
    }
    for name in edges {
        db.create_collection(name, CollectionType::Edge)
            .expect("create edge collection");
    }
    db
}

fn vertex(db: &MemoryDatabase, collection: &str, key: &str) {
    db.insert(collection, doc(json!({"_key": key})), &InsertOptions::default())
        .expect("insert vertex");
}

fn edge(db: &MemoryDatabase, collection: &str, key: &str, from: &str, to: &str) {
    db.insert(
        collection,
        doc(json!({"_key": key, "_from": from, "_to": to})),
        &InsertOptions::default(),
    )
    .expect("insert edge");
}

fn coordinator<'a>(
    registry: &'a StaticRegistry,
    db: &'a MemoryDatabase,
) -> CascadingDelete<'a, StaticRegistry> {
    CascadingDelete {
        registry,
        store: db,
        transactions: db,
    }
}

// =========================================================================
// Edge removal
// =========================================================================

#[test]
fn test_sole_edge_removes_only_itself() {
    // Arrange
    let db = database(&["person"], &["knows"]);
    vertex(&db, "person", "a");
    vertex(&db, "person", "b");
    edge(&db, "knows", "k1", "person/a", "person/b");
    let registry = StaticRegistry(vec![graph("social", vec![def("knows", &["person"], &["person"])])]);
    let pending = Mutex::new(PendingDeleteSet::default());

    // Act
    coordinator(&registry, &db)
        .remove_edge(&pending, &DocumentHandle::new("knows", "k1"), &RemoveOptions::default())
        .expect("remove");

    // Assert
    assert!(!db.contains("knows/k1"));
    assert!(db.contains("person/a"));
    assert!(db.contains("person/b"));
    assert!(pending.lock().is_empty());
}

#[test]
fn test_edge_removal_cascades_into_other_graph() {
    // Arrange: `annotates` edges point at `knows` edges.
    let db = database(&["person", "note"], &["knows", "annotates"]);
    vertex(&db, "person", "a");
    vertex(&db, "person", "b");
    vertex(&db, "note", "n1");
    edge(&db, "knows", "k1", "person/a", "person/b");
    edge(&db, "knows", "k2", "person/b", "person/a");
    edge(&db, "annotates", "x1", "note/n1", "knows/k1");
    edge(&db, "annotates", "x2", "note/n1", "knows/k2");
    let registry = StaticRegistry(vec![
        graph("social", vec![def("knows", &["person"], &["person"])]),
        graph("notes", vec![def("annotates", &["note"], &["knows"])]),
    ]);
    let pending = Mutex::new(PendingDeleteSet::default());

    // Act
    coordinator(&registry, &db)
        .remove_edge(&pending, &DocumentHandle::new("knows", "k1"), &RemoveOptions::default())
        .expect("remove");

    // Assert
    assert!(!db.contains("knows/k1"));
    assert!(!db.contains("annotates/x1"));
    assert!(db.contains("knows/k2"));
    assert!(db.contains("annotates/x2"));
    assert!(db.contains("note/n1"));
}

#[test]
fn test_mutually_dependent_edge_collections_terminate() {
    // Arrange: e1/x and e2/y point at each other.
    let db = database(&["person"], &["e1", "e2"]);
    vertex(&db, "person", "a");
    edge(&db, "e1", "x", "e2/y", "person/a");
    edge(&db, "e2", "y", "e1/x", "person/a");
    let registry = StaticRegistry(vec![
        graph("left", vec![def("e1", &["e2"], &["person"])]),
        graph("right", vec![def("e2", &["e1"], &["person"])]),
    ]);
    let pending = Mutex::new(PendingDeleteSet::default());

    // Act
    coordinator(&registry, &db)
        .remove_edge(&pending, &DocumentHandle::new("e1", "x"), &RemoveOptions::default())
        .expect("remove");

    // Assert
    assert_eq!(db.count("e1"), 0);
    assert_eq!(db.count("e2"), 0);
    assert!(db.contains("person/a"));
}

// =========================================================================
// Vertex removal
// =========================================================================

#[test]
fn test_vertex_removal_removes_incident_edges_in_every_graph() {
    // Arrange
    let db = database(&["person", "city"], &["knows", "lives"]);
    for key in ["a", "b", "c"] {
        vertex(&db, "person", key);
    }
    vertex(&db, "city", "x");
    edge(&db, "knows", "k1", "person/a", "person/b");
    edge(&db, "knows", "k2", "person/b", "person/c");
    edge(&db, "knows", "k3", "person/a", "person/c");
    edge(&db, "lives", "l1", "person/b", "city/x");
    let registry = StaticRegistry(vec![
        graph("social", vec![def("knows", &["person"], &["person"])]),
        graph("geo", vec![def("lives", &["person"], &["city"])]),
    ]);
    let pending = Mutex::new(PendingDeleteSet::default());

    // Act
    coordinator(&registry, &db)
        .remove_vertex(&pending, &DocumentHandle::new("person", "b"), &RemoveOptions::default())
        .expect("remove");

    // Assert
    assert!(!db.contains("person/b"));
    assert!(!db.contains("knows/k1"));
    assert!(!db.contains("knows/k2"));
    assert!(!db.contains("lives/l1"));
    assert!(db.contains("knows/k3"));
    assert!(db.contains("city/x"));
    assert!(pending.lock().is_empty());
}

#[test]
fn test_vertex_without_edges_is_removed_alone() {
    let db = database(&["person"], &["knows"]);
    vertex(&db, "person", "a");
    let registry = StaticRegistry(vec![graph("social", vec![def("knows", &["person"], &["person"])])]);
    let pending = Mutex::new(PendingDeleteSet::default());

    coordinator(&registry, &db)
        .remove_vertex(&pending, &DocumentHandle::new("person", "a"), &RemoveOptions::default())
        .expect("remove");

    assert_eq!(db.count("person"), 0);
}

// =========================================================================
// Atomicity
// =========================================================================

#[test]
fn test_failed_transaction_removes_nothing_and_resets_pending() {
    // Arrange
    let db = database(&["person"], &["knows"]);
    vertex(&db, "person", "a");
    vertex(&db, "person", "b");
    edge(&db, "knows", "k1", "person/a", "person/b");
    db.fail_removal_of("person/b");
    let registry = StaticRegistry(vec![graph("social", vec![def("knows", &["person"], &["person"])])]);
    let pending = Mutex::new(PendingDeleteSet::default());
    let delete = coordinator(&registry, &db);

    // Act
    let result =
        delete.remove_vertex(&pending, &DocumentHandle::new("person", "b"), &RemoveOptions::default());

    // Assert
    assert!(matches!(result, Err(Error::Collaborator { code: 1200, .. })));
    assert!(db.contains("knows/k1"));
    assert!(db.contains("person/b"));
    assert!(pending.lock().is_empty());

    // A later independent delete starts from an empty closure.
    delete
        .remove_vertex(&pending, &DocumentHandle::new("person", "a"), &RemoveOptions::default())
        .expect("remove a");
    assert!(!db.contains("person/a"));
    assert!(!db.contains("knows/k1"));
    assert!(db.contains("person/b"));
}

#[test]
fn test_remove_options_are_honored() {
    let db = database(&["person"], &["knows"]);
    vertex(&db, "person", "a");
    let registry = StaticRegistry(vec![graph("social", vec![def("knows", &["person"], &["person"])])]);
    let pending = Mutex::new(PendingDeleteSet::default());
    let options = RemoveOptions {
        rev: Some("_stale".to_string()),
        ..RemoveOptions::default()
    };

    let result =
        coordinator(&registry, &db).remove_vertex(&pending, &DocumentHandle::new("person", "a"), &options);

    assert!(matches!(result, Err(Error::Collaborator { code: 1200, .. })));
    assert!(db.contains("person/a"));
}

#[test]
fn test_registry_failure_leaves_pending_empty() {
    struct BrokenRegistry;

    impl GraphRegistry for BrokenRegistry {
        fn exists(&self, _name: &str) -> Result<bool> {
            Err(Error::NoGraphCollection("_graphs".to_string()))
        }
        fn list(&self) -> Result<Vec<GraphDocument>> {
            Err(Error::NoGraphCollection("_graphs".to_string()))
        }
        fn document(&self, name: &str) -> Result<GraphDocument> {
            Err(Error::GraphNotFound(name.to_string()))
        }
    }

    let db = database(&["person"], &["knows"]);
    vertex(&db, "person", "a");
    let pending = Mutex::new(PendingDeleteSet::default());
    let delete = CascadingDelete {
        registry: &BrokenRegistry,
        store: &db,
        transactions: &db,
    };

    let result =
        delete.remove_vertex(&pending, &DocumentHandle::new("person", "a"), &RemoveOptions::default());

    assert!(matches!(result, Err(Error::NoGraphCollection(_))));
    assert!(pending.lock().is_empty());
    assert!(db.contains("person/a"));
}
