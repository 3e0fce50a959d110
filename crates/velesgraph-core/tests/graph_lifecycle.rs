//! End-to-end graph scenarios over the in-memory database.
//!
//! These tests only use the public API: a `MemoryDatabase` as store and
//! transaction engine, graphs created through `GraphManager`, writes through
//! bound collection handles.
#![allow(clippy::float_cmp)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use velesgraph_core::{
    relation, CollectionType, ComposedQuery, CreateGraphOptions, Direction, Document, Error,
    Example, GraphConfig, GraphContext, GraphManager, MemoryDatabase, PathOptions, QueryEngine,
    RemoveOptions, Result, TraversalOptions,
};

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test documents must be objects"),
    }
}

fn world() -> Arc<MemoryDatabase> {
    let db = Arc::new(MemoryDatabase::new());
    db.create_collection("person", CollectionType::Document)
        .expect("person");
    db.create_collection("city", CollectionType::Document)
        .expect("city");
    db.create_collection("knows", CollectionType::Edge)
        .expect("knows");
    db.create_collection("lives", CollectionType::Edge)
        .expect("lives");
    db
}

fn manager_over(db: &Arc<MemoryDatabase>) -> GraphManager {
    GraphManager::new(GraphContext::in_memory(db.clone(), GraphConfig::default()).expect("context"))
}

/// Builds `social` (person knows person) and `geo` (person lives in city)
/// sharing the `person` collection.
fn two_graphs(manager: &GraphManager) {
    manager
        .create_graph(
            "social",
            vec![relation("knows", "person", "person").expect("relation")],
            vec![],
            CreateGraphOptions::default(),
        )
        .expect("social");
    manager
        .create_graph(
            "geo",
            vec![relation("lives", "person", "city").expect("relation")],
            vec![],
            CreateGraphOptions::default(),
        )
        .expect("geo");
}

// =============================================================================
// Referential integrity
// =============================================================================

mod referential_integrity {
    use super::*;

    #[test]
    fn test_vertex_delete_cascades_across_graphs() {
        // Arrange
        let db = world();
        let manager = manager_over(&db);
        two_graphs(&manager);
        let social = manager.graph("social").expect("social");
        let geo = manager.graph("geo").expect("geo");

        let person = social.vertex_collection("person").expect("person");
        for key in ["alice", "bob", "carol"] {
            person.insert(doc(json!({"_key": key}))).expect("person");
        }
        geo.vertex_collection("city")
            .expect("city")
            .insert(doc(json!({"_key": "paris"})))
            .expect("city");

        let knows = social.edge_collection("knows").expect("knows");
        knows
            .insert_between("person/alice", "person/bob", Document::new())
            .expect("alice knows bob");
        knows
            .insert_between("person/carol", "person/alice", Document::new())
            .expect("carol knows alice");
        knows
            .insert_between("person/bob", "person/carol", Document::new())
            .expect("bob knows carol");
        let lives = geo.edge_collection("lives").expect("lives");
        lives
            .insert_between("person/alice", "city/paris", Document::new())
            .expect("alice lives in paris");
        lives
            .insert_between("person/bob", "city/paris", Document::new())
            .expect("bob lives in paris");

        // Act
        person
            .remove("alice", &RemoveOptions::default())
            .expect("remove alice");

        // Assert
        assert!(!db.contains("person/alice"));
        assert_eq!(db.count("knows"), 1);
        assert_eq!(db.count("lives"), 1);
        assert!(social.vertex_edges("person/alice").expect("edges").is_empty());
        assert_eq!(
            geo.vertex_edges("person/bob").expect("edges")[0]["_to"],
            json!("city/paris")
        );
    }

    #[test]
    fn test_failed_delete_rolls_back_whole_closure() {
        // Arrange
        let db = world();
        let manager = manager_over(&db);
        two_graphs(&manager);
        let social = manager.graph("social").expect("social");
        let person = social.vertex_collection("person").expect("person");
        person.insert(doc(json!({"_key": "alice"}))).expect("alice");
        person.insert(doc(json!({"_key": "bob"}))).expect("bob");
        social
            .edge_collection("knows")
            .expect("knows")
            .insert_between("person/alice", "person/bob", doc(json!({"_key": "ab"})))
            .expect("edge");
        db.fail_removal_of("person/bob");

        // Act
        let result = person.remove("bob", &RemoveOptions::default());

        // Assert
        let err = result.expect_err("injected failure");
        assert_eq!(err.code(), 1200);
        assert!(db.contains("person/bob"));
        assert!(db.contains("knows/ab"));
        assert!(!social.has_pending_deletes());
    }
}

// =============================================================================
// Edge constraints
// =============================================================================

mod edge_constraints {
    use super::*;

    #[test]
    fn test_edges_must_match_a_definition() {
        let db = world();
        let manager = manager_over(&db);
        two_graphs(&manager);
        let social = manager.graph("social").expect("social");
        let knows = social.edge_collection("knows").expect("knows");

        knows
            .insert_between("person/a", "person/b", Document::new())
            .expect("person to person");
        let err = knows
            .insert_between("person/a", "city/paris", Document::new())
            .expect_err("person to city");

        assert!(matches!(err, Error::InvalidEdge { .. }));
        assert!(err.to_string().starts_with("[VGRAPH-1906]"));
        assert!(matches!(
            social.edge_collection("lives"),
            Err(Error::EdgeCollectionDoesNotExist(_))
        ));
    }

    #[test]
    fn test_bound_collections_follow_structural_edits() {
        // Arrange
        let db = world();
        let manager = manager_over(&db);
        let mut graph = manager
            .create_graph(
                "social",
                vec![relation("knows", "person", "person").expect("relation")],
                vec!["city".to_string()],
                CreateGraphOptions::default(),
            )
            .expect("social");

        // Act
        graph
            .extend_edge_definitions(relation("lives", "person", "city").expect("relation"))
            .expect("extend");

        // Assert
        assert_eq!(
            graph.edge_collection_names().expect("edges"),
            vec!["knows", "lives"]
        );
        assert_eq!(
            graph.vertex_collection_names().expect("vertices"),
            vec!["person", "city"]
        );
        let reloaded = manager.graph("social").expect("reload");
        assert!(reloaded.orphan_collections().is_empty());
        reloaded
            .edge_collection("lives")
            .expect("lives")
            .insert_between("person/a", "city/paris", Document::new())
            .expect("now allowed");
    }
}

// =============================================================================
// Queries
// =============================================================================

mod queries {
    use super::*;

    /// Answers every query with the same rows and keeps the last query.
    struct CannedEngine {
        rows: Vec<Value>,
        last: Mutex<Option<ComposedQuery>>,
    }

    impl QueryEngine for CannedEngine {
        fn execute(&self, query: &ComposedQuery) -> Result<Vec<Value>> {
            *self.last.lock() = Some(query.clone());
            Ok(self.rows.clone())
        }
    }

    fn social_with(engine: Arc<CannedEngine>) -> velesgraph_core::GraphDefinition {
        let db = world();
        let ctx = GraphContext::in_memory(db, GraphConfig::default())
            .expect("context")
            .with_query_engine(engine);
        GraphManager::new(ctx)
            .create_graph(
                "social",
                vec![relation("knows", "person", "person").expect("relation")],
                vec![],
                CreateGraphOptions::default(),
            )
            .expect("social")
    }

    #[test]
    fn test_closeness_relative_to_smallest_farness() {
        let engine = Arc::new(CannedEngine {
            rows: vec![
                json!(["person/a", 2]),
                json!(["person/b", 4]),
                json!(["person/c", null]),
            ],
            last: Mutex::new(None),
        });
        let graph = social_with(engine.clone());

        let closeness = graph
            .closeness(&PathOptions::default().with_direction(Direction::Any))
            .expect("closeness");

        assert_eq!(closeness["person/a"], 1.0);
        assert_eq!(closeness["person/b"], 0.5);
        assert_eq!(closeness["person/c"], 0.0);
        let query = engine.last.lock().clone().expect("query ran");
        assert_eq!(query.bind_vars["graphName"], json!("social"));
    }

    #[test]
    fn test_user_values_travel_as_bind_vars() {
        let engine = Arc::new(CannedEngine {
            rows: vec![],
            last: Mutex::new(None),
        });
        let graph = social_with(engine.clone());
        let hostile = "x\" || true || \"";

        let mut example = serde_json::Map::new();
        example.insert("name".to_string(), json!(hostile));
        graph
            .neighbors(&Example::from(example), &TraversalOptions::default())
            .expect("neighbors");

        let query = engine.last.lock().clone().expect("query ran");
        assert!(!query.query.contains(hostile));
        assert!(query.bind_vars.values().any(|v| v == &json!(hostile)));
    }

    #[test]
    fn test_depth_above_limit_is_rejected_before_execution() {
        let engine = Arc::new(CannedEngine {
            rows: vec![],
            last: Mutex::new(None),
        });
        let graph = social_with(engine.clone());

        let result = graph.neighbors(
            &Example::All,
            &TraversalOptions::default().with_depth(1, 1000),
        );

        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert!(engine.last.lock().is_none());
    }
}
