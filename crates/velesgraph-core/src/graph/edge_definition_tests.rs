//! Tests for edge definition construction and validation.

use super::edge_definition::*;
use crate::error::Error;
use crate::store::memory::MemoryDatabase;
use crate::store::{AccessCheck, AccessLevel, CollectionType, PermissionService};

fn store() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_collection("person", CollectionType::Document)
        .expect("person");
    db.create_collection("city", CollectionType::Document)
        .expect("city");
    db.create_collection("knows", CollectionType::Edge)
        .expect("knows");
    db.create_collection("lives_in", CollectionType::Edge)
        .expect("lives_in");
    db
}

struct FixedPermissions {
    user: Option<String>,
    level: AccessLevel,
}

impl PermissionService for FixedPermissions {
    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }

    fn permission(&self, _user: &str, _database: &str, _collection: &str) -> AccessLevel {
        self.level
    }
}

// =========================================================================
// relation()
// =========================================================================

#[test]
fn test_relation_string_equals_single_element_list() {
    let from_strings = relation("knows", "person", "person").expect("relation");
    let from_lists = relation("knows", vec!["person"], vec!["person"]).expect("relation");

    assert_eq!(from_strings, from_lists);
    assert_eq!(from_strings.from, vec!["person".to_string()]);
}

#[test]
fn test_relation_rejects_empty_name() {
    let result = relation("", "person", "person");
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_relation_rejects_empty_endpoints() {
    let empty: Vec<String> = Vec::new();

    assert!(matches!(
        relation("knows", empty.clone(), "person"),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        relation("knows", "person", empty),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        relation("knows", "", "person"),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_compose_then_extend_preserves_order() {
    // Arrange
    let d1 = relation("knows", "person", "person").expect("d1");
    let d2 = relation("lives_in", "person", "city").expect("d2");

    // Act
    let list = extend_edge_definitions(compose_edge_definitions([d1.clone()]), [d2.clone()]);

    // Assert
    assert_eq!(list, vec![d1, d2]);
}

#[test]
fn test_display_lists_endpoints() {
    let definition = relation("lives_in", ["person", "pet"], "city").expect("relation");

    assert_eq!(definition.to_string(), "lives_in: [person, pet] -> [city]");
}

#[test]
fn test_allows_checks_both_endpoints() {
    let definition = relation("knows", "person", "person").expect("relation");

    assert!(definition.allows("person", "person"));
    assert!(!definition.allows("person", "city"));
    assert!(!definition.allows("city", "person"));
}

#[test]
fn test_validate_shape_rejects_self_reference() {
    let definition = relation("knows", "knows", "person").expect("relation");

    assert!(matches!(
        definition.validate_shape(),
        Err(Error::MalformedEdgeDefinition(_))
    ));
}

#[test]
fn test_serde_uses_plain_field_names() {
    let definition = relation("knows", "person", "person").expect("relation");

    let json = serde_json::to_value(&definition).expect("serialize");

    assert_eq!(
        json,
        serde_json::json!({"collection": "knows", "from": ["person"], "to": ["person"]})
    );
}

// =========================================================================
// Multi-use checks
// =========================================================================

#[test]
fn test_duplicate_edge_collection_is_multi_use() {
    let definitions = vec![
        relation("knows", "person", "person").expect("d1"),
        relation("knows", "person", "city").expect("d2"),
    ];

    let result = check_unique_edge_collections(&definitions);

    assert!(matches!(result, Err(Error::CollectionMultiUse(c)) if c == "knows"));
}

#[test]
fn test_cross_graph_compares_sorted_definitions() {
    // Arrange
    let registered = relation("lives_in", ["pet", "person"], "city").expect("registered");
    let same = relation("lives_in", ["person", "pet"], "city").expect("same");
    let different = relation("lives_in", "person", "city").expect("different");

    // Act & Assert
    assert!(check_cross_graph(&[same], [&registered]).is_ok());
    assert!(matches!(
        check_cross_graph(&[different], [&registered]),
        Err(Error::CollectionUseInMultiGraphs(c)) if c == "lives_in"
    ));
}

// =========================================================================
// validate_against_store()
// =========================================================================

#[test]
fn test_validate_against_store_accepts_existing_collections() {
    let db = store();
    let definitions = vec![relation("lives_in", "person", "city").expect("relation")];

    assert!(validate_against_store(&definitions, &db, &AccessCheck::disabled()).is_ok());
}

#[test]
fn test_validate_against_store_missing_collection() {
    let db = store();
    let definitions = vec![relation("knows", "person", "robot").expect("relation")];

    let result = validate_against_store(&definitions, &db, &AccessCheck::disabled());

    assert!(matches!(result, Err(Error::CollectionNotFound(c)) if c == "robot"));
}

#[test]
fn test_validate_against_store_wrong_types() {
    let db = store();

    let edge_as_vertex = vec![relation("knows", "lives_in", "person").expect("relation")];
    let vertex_as_edge = vec![relation("city", "person", "person").expect("relation")];

    assert!(matches!(
        validate_against_store(&edge_as_vertex, &db, &AccessCheck::disabled()),
        Err(Error::CollectionTypeInvalid(_))
    ));
    assert!(matches!(
        validate_against_store(&vertex_as_edge, &db, &AccessCheck::disabled()),
        Err(Error::CollectionTypeInvalid(_))
    ));
}

#[test]
fn test_validate_against_store_requires_read_permission() {
    // Arrange
    let db = store();
    let definitions = vec![relation("knows", "person", "person").expect("relation")];
    let denied = FixedPermissions {
        user: Some("bob".to_string()),
        level: AccessLevel::None,
    };
    let read_only = FixedPermissions {
        user: Some("bob".to_string()),
        level: AccessLevel::ReadOnly,
    };
    let anonymous = FixedPermissions {
        user: None,
        level: AccessLevel::None,
    };

    let check = |service: &dyn PermissionService| {
        validate_against_store(&definitions, &db, &AccessCheck::new(Some(service), "_system"))
    };

    // Act & Assert
    assert!(matches!(check(&denied), Err(Error::Forbidden(_))));
    assert!(check(&read_only).is_ok());
    assert!(check(&anonymous).is_ok());
}

// =========================================================================
// Property-based tests
// =========================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn names() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[a-z]{1,8}", 1..6)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: relation() never yields empty endpoint sets
        #[test]
        fn prop_relation_endpoints_non_empty(from in names(), to in names()) {
            let definition = relation("edges", from, to).expect("relation");
            prop_assert!(!definition.from.is_empty());
            prop_assert!(!definition.to.is_empty());
        }

        /// Property: sorting is idempotent
        #[test]
        fn prop_sort_idempotent(from in names(), to in names()) {
            let definition = relation("edges", from, to).expect("relation");
            let once = sort_edge_definition(definition);
            let twice = sort_edge_definition(once.clone());
            prop_assert_eq!(once, twice);
        }

        /// Property: sorting ignores input order
        #[test]
        fn prop_sort_order_independent(from in names(), to in names()) {
            let forward = relation("edges", from.clone(), to.clone()).expect("relation");
            let mut reversed_from = from;
            reversed_from.reverse();
            let mut reversed_to = to;
            reversed_to.reverse();
            let backward = relation("edges", reversed_from, reversed_to).expect("relation");
            prop_assert_eq!(forward.sorted(), backward.sorted());
        }
    }
}
