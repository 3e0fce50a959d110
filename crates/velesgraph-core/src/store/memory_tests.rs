//! Tests for `MemoryDatabase`.

use super::memory::MemoryDatabase;
use super::*;
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test documents must be objects"),
    }
}

fn people() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_collection("person", CollectionType::Document)
        .expect("create person");
    db.create_collection("knows", CollectionType::Edge)
        .expect("create knows");
    db
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_new_database_has_graph_registry_collection() {
    let db = MemoryDatabase::new();
    assert_eq!(
        db.collection_type("_graphs"),
        Some(CollectionType::Document)
    );
}

#[test]
fn test_insert_assigns_system_attributes() {
    // Arrange
    let db = people();

    // Act
    let meta = db
        .insert("person", doc(json!({"_key": "alice", "age": 30})), &InsertOptions::default())
        .expect("insert");

    // Assert
    assert_eq!(meta.id.to_string(), "person/alice");
    assert_eq!(meta.key(), "alice");
    let stored = db.document(&meta.id).expect("document");
    assert_eq!(stored["_id"], json!("person/alice"));
    assert_eq!(stored["_rev"], json!(meta.rev));
    assert_eq!(stored["age"], json!(30));
}

#[test]
fn test_insert_generates_key_when_absent() {
    let db = people();

    let first = db
        .insert("person", Document::new(), &InsertOptions::default())
        .expect("insert");
    let second = db
        .insert("person", Document::new(), &InsertOptions::default())
        .expect("insert");

    assert_ne!(first.key(), second.key());
    assert_eq!(db.count("person"), 2);
}

#[test]
fn test_insert_duplicate_key_requires_overwrite() {
    // Arrange
    let db = people();
    let options = InsertOptions::default();
    db.insert("person", doc(json!({"_key": "a"})), &options)
        .expect("insert");

    // Act
    let duplicate = db.insert("person", doc(json!({"_key": "a"})), &options);
    let overwritten = db.insert(
        "person",
        doc(json!({"_key": "a", "v": 2})),
        &InsertOptions {
            overwrite: true,
            ..InsertOptions::default()
        },
    );

    // Assert
    assert_eq!(duplicate.unwrap_err().code(), 1210);
    assert!(overwritten.is_ok());
    assert_eq!(db.count("person"), 1);
}

#[test]
fn test_insert_edge_requires_endpoints() {
    let db = people();

    let result = db.insert("knows", doc(json!({"_from": "person/a"})), &InsertOptions::default());

    assert_eq!(result.unwrap_err().code(), 1233);
}

#[test]
fn test_insert_into_missing_collection() {
    let db = MemoryDatabase::new();

    let result = db.insert("ghost", Document::new(), &InsertOptions::default());

    assert!(matches!(result, Err(Error::CollectionNotFound(_))));
}

#[test]
fn test_replace_keeps_key_and_bumps_revision() {
    // Arrange
    let db = people();
    let meta = db
        .insert("person", doc(json!({"_key": "a", "v": 1})), &InsertOptions::default())
        .expect("insert");

    // Act
    let replaced = db
        .replace(&meta.id, doc(json!({"v": 2})))
        .expect("replace");

    // Assert
    assert_eq!(replaced.id, meta.id);
    assert_ne!(replaced.rev, meta.rev);
    assert_eq!(db.document(&meta.id).expect("document")["v"], json!(2));
}

#[test]
fn test_remove_honors_revision() {
    // Arrange
    let db = people();
    let meta = db
        .insert("person", doc(json!({"_key": "a"})), &InsertOptions::default())
        .expect("insert");

    // Act
    let stale = db.remove(
        &meta.id,
        &RemoveOptions {
            rev: Some("_stale".to_string()),
            ..RemoveOptions::default()
        },
    );
    let current = db.remove(
        &meta.id,
        &RemoveOptions {
            rev: Some(meta.rev.clone()),
            ..RemoveOptions::default()
        },
    );

    // Assert
    assert_eq!(stale.unwrap_err().code(), 1200);
    assert!(current.is_ok());
    assert!(!db.contains("person/a"));
}

#[test]
fn test_remove_missing_document() {
    let db = people();

    let result = db.remove(&DocumentHandle::new("person", "nobody"), &RemoveOptions::default());

    assert!(matches!(result, Err(Error::DocumentNotFound(_))));
}

#[test]
fn test_edges_returns_both_directions() {
    // Arrange
    let db = people();
    let options = InsertOptions::default();
    db.insert("knows", doc(json!({"_key": "ab", "_from": "person/a", "_to": "person/b"})), &options)
        .expect("insert");
    db.insert("knows", doc(json!({"_key": "ca", "_from": "person/c", "_to": "person/a"})), &options)
        .expect("insert");
    db.insert("knows", doc(json!({"_key": "bc", "_from": "person/b", "_to": "person/c"})), &options)
        .expect("insert");

    // Act
    let edges = db.edges("knows", "person/a").expect("edges");

    // Assert
    let ids: Vec<&str> = edges.iter().filter_map(|e| e["_id"].as_str()).collect();
    assert_eq!(ids, vec!["knows/ab", "knows/ca"]);
}

#[test]
fn test_edges_rejects_document_collection() {
    let db = people();

    let result = db.edges("person", "person/a");

    assert!(matches!(result, Err(Error::CollectionTypeInvalid(_))));
}

#[test]
fn test_drop_collection() {
    let db = people();

    db.drop_collection("knows").expect("drop");

    assert_eq!(db.collection_type("knows"), None);
    assert!(matches!(
        db.drop_collection("knows"),
        Err(Error::CollectionNotFound(_))
    ));
}

// =============================================================================
// Transactions
// =============================================================================

#[test]
fn test_transaction_commits_on_success() {
    // Arrange
    let db = people();
    let spec = TransactionSpec {
        write: vec!["person".to_string()],
    };

    // Act
    let result = TransactionEngine::execute(&db, &spec, &mut |store| {
        store.insert("person", doc(json!({"_key": "a"})), &InsertOptions::default())?;
        store.insert("person", doc(json!({"_key": "b"})), &InsertOptions::default())?;
        Ok(())
    });

    // Assert
    assert!(result.is_ok());
    assert_eq!(db.count("person"), 2);
}

#[test]
fn test_transaction_rolls_back_on_failure() {
    // Arrange
    let db = people();
    let options = InsertOptions::default();
    db.insert("person", doc(json!({"_key": "a"})), &options)
        .expect("insert");
    db.insert("person", doc(json!({"_key": "b"})), &options)
        .expect("insert");
    db.fail_removal_of("person/b");
    let spec = TransactionSpec {
        write: vec!["person".to_string()],
    };

    // Act
    let result = TransactionEngine::execute(&db, &spec, &mut |store| {
        store.remove(&DocumentHandle::new("person", "a"), &RemoveOptions::default())?;
        store.remove(&DocumentHandle::new("person", "b"), &RemoveOptions::default())?;
        Ok(())
    });

    // Assert
    assert_eq!(result.unwrap_err().code(), 1200);
    assert!(db.contains("person/a"));
    assert!(db.contains("person/b"));
}

#[test]
fn test_rollback_keeps_writes_outside_write_set() {
    // Arrange
    let db = people();
    db.create_collection("city", CollectionType::Document)
        .expect("create city");
    let spec = TransactionSpec {
        write: vec!["person".to_string()],
    };

    // Act: a direct write lands while the transaction is still running.
    let result = TransactionEngine::execute(&db, &spec, &mut |store| {
        store.insert("person", doc(json!({"_key": "a"})), &InsertOptions::default())?;
        db.insert("city", doc(json!({"_key": "paris"})), &InsertOptions::default())?;
        Err(Error::collaborator(1200, "abort"))
    });

    // Assert
    assert_eq!(result.unwrap_err().code(), 1200);
    assert_eq!(db.count("person"), 0);
    assert!(db.contains("city/paris"));
}

#[test]
fn test_transaction_rejects_undeclared_write() {
    let db = people();
    let spec = TransactionSpec {
        write: vec!["knows".to_string()],
    };

    let result = TransactionEngine::execute(&db, &spec, &mut |store| {
        store.insert("person", Document::new(), &InsertOptions::default())?;
        Ok(())
    });

    assert_eq!(result.unwrap_err().code(), 1652);
    assert_eq!(db.count("person"), 0);
}

#[test]
fn test_transaction_requires_existing_write_collections() {
    let db = people();
    let spec = TransactionSpec {
        write: vec!["ghost".to_string()],
    };

    let result = TransactionEngine::execute(&db, &spec, &mut |_| Ok(()));

    assert!(matches!(result, Err(Error::CollectionNotFound(_))));
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn test_handle_parse_and_resolve() {
    assert_eq!(
        DocumentHandle::parse("person/a").expect("parse"),
        DocumentHandle::new("person", "a")
    );
    assert!(DocumentHandle::parse("person").is_err());
    assert!(DocumentHandle::parse("/a").is_err());
    assert!(DocumentHandle::parse("person/").is_err());
    assert_eq!(
        DocumentHandle::resolve("a", "person").expect("resolve"),
        DocumentHandle::new("person", "a")
    );
    assert_eq!(
        DocumentHandle::resolve("city/x", "person").expect("resolve"),
        DocumentHandle::new("city", "x")
    );
    assert!(matches!(
        DocumentHandle::resolve("", "person"),
        Err(Error::DocumentHandleBad(_))
    ));
}
