//! Edge definitions: which vertex collections an edge collection may connect.
//!
//! Everything here is pure value construction except
//! [`validate_against_store`], which resolves the referenced collections
//! through a [`CollectionStore`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::store::{AccessCheck, CollectionStore, CollectionType};

/// A rule constraining which `(from, to)` collection pairs may terminate
/// edges stored in `collection`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// Edge collection name.
    pub collection: String,
    /// Allowed source vertex collections.
    pub from: Vec<String>,
    /// Allowed target vertex collections.
    pub to: Vec<String>,
}

impl EdgeDefinition {
    /// Returns true if an edge from `from_collection` to `to_collection` is
    /// allowed by this definition.
    #[must_use]
    pub fn allows(&self, from_collection: &str, to_collection: &str) -> bool {
        self.from.iter().any(|c| c == from_collection) && self.to.iter().any(|c| c == to_collection)
    }

    /// Returns true if `collection` is a from or to endpoint.
    #[must_use]
    pub fn references_vertex(&self, collection: &str) -> bool {
        self.from.iter().chain(&self.to).any(|c| c == collection)
    }

    /// Iterates over from and to collections (duplicates included).
    pub fn vertex_collections(&self) -> impl Iterator<Item = &str> {
        self.from.iter().chain(&self.to).map(String::as_str)
    }

    /// Returns the canonical form with sorted from/to sets.
    #[must_use]
    pub fn sorted(&self) -> Self {
        sort_edge_definition(self.clone())
    }

    /// Checks the shape of the definition.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedEdgeDefinition` if the collection name or an
    /// endpoint set is empty, or if the edge collection is also one of its
    /// own vertex collections.
    pub fn validate_shape(&self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(Error::MalformedEdgeDefinition(
                "edge collection name is empty".to_string(),
            ));
        }
        if self.from.is_empty() || self.to.is_empty() {
            return Err(Error::MalformedEdgeDefinition(format!(
                "'{}' needs non-empty from and to collections",
                self.collection
            )));
        }
        if self.vertex_collections().any(str::is_empty) {
            return Err(Error::MalformedEdgeDefinition(format!(
                "'{}' names an empty vertex collection",
                self.collection
            )));
        }
        if self.references_vertex(&self.collection) {
            return Err(Error::MalformedEdgeDefinition(format!(
                "'{}' is used as edge and vertex collection",
                self.collection
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EdgeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] -> [{}]",
            self.collection,
            self.from.join(", "),
            self.to.join(", ")
        )
    }
}

/// One collection name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionSpec(Vec<String>);

impl CollectionSpec {
    /// Returns the names.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for CollectionSpec {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for CollectionSpec {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for CollectionSpec {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for CollectionSpec {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CollectionSpec {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| (*n).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CollectionSpec {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| (*n).to_string()).collect())
    }
}

/// Builds an edge definition.
///
/// `from` and `to` accept a single name or a list.
///
/// # Errors
///
/// Returns `Error::InvalidParameter` if the name is empty or `from`/`to` is
/// empty or contains an empty name.
///
/// # Example
///
/// ```rust,ignore
/// let a = relation("knows", "person", "person")?;
/// let b = relation("knows", ["person"], ["person"])?;
/// assert_eq!(a, b);
/// ```
pub fn relation(
    collection: &str,
    from: impl Into<CollectionSpec>,
    to: impl Into<CollectionSpec>,
) -> Result<EdgeDefinition> {
    if collection.is_empty() {
        return Err(Error::InvalidParameter(
            "edge collection must be a non empty string".to_string(),
        ));
    }

    let from = from.into().into_vec();
    if from.is_empty() || from.iter().any(String::is_empty) {
        return Err(Error::InvalidParameter(
            "from must be a non empty string or list".to_string(),
        ));
    }

    let to = to.into().into_vec();
    if to.is_empty() || to.iter().any(String::is_empty) {
        return Err(Error::InvalidParameter(
            "to must be a non empty string or list".to_string(),
        ));
    }

    Ok(EdgeDefinition {
        collection: collection.to_string(),
        from,
        to,
    })
}

/// Collects definitions into a list, preserving order.
#[must_use]
pub fn compose_edge_definitions(
    definitions: impl IntoIterator<Item = EdgeDefinition>,
) -> Vec<EdgeDefinition> {
    definitions.into_iter().collect()
}

/// Appends definitions to `list`, preserving order.
#[must_use]
pub fn extend_edge_definitions(
    mut list: Vec<EdgeDefinition>,
    definitions: impl IntoIterator<Item = EdgeDefinition>,
) -> Vec<EdgeDefinition> {
    list.extend(definitions);
    list
}

/// Returns the canonical form of a definition with from/to sorted.
#[must_use]
pub fn sort_edge_definition(mut definition: EdgeDefinition) -> EdgeDefinition {
    definition.from.sort();
    definition.to.sort();
    definition
}

/// Fails if two definitions of one graph name the same edge collection.
///
/// # Errors
///
/// Returns `Error::CollectionMultiUse` naming the repeated collection.
pub fn check_unique_edge_collections(definitions: &[EdgeDefinition]) -> Result<()> {
    let mut seen = rustc_hash::FxHashSet::default();
    for definition in definitions {
        if !seen.insert(definition.collection.as_str()) {
            return Err(Error::CollectionMultiUse(definition.collection.clone()));
        }
    }
    Ok(())
}

/// Fails if another graph uses one of the edge collections with a
/// different definition. Definitions are compared in sorted form.
///
/// # Errors
///
/// Returns `Error::CollectionUseInMultiGraphs` naming the conflicting
/// collection.
pub fn check_cross_graph<'a>(
    definitions: &[EdgeDefinition],
    registered: impl IntoIterator<Item = &'a EdgeDefinition>,
) -> Result<()> {
    let sorted: Vec<EdgeDefinition> = definitions.iter().map(EdgeDefinition::sorted).collect();
    for existing in registered {
        let conflict = sorted
            .iter()
            .find(|d| d.collection == existing.collection)
            .is_some_and(|d| *d != existing.sorted());
        if conflict {
            return Err(Error::CollectionUseInMultiGraphs(existing.collection.clone()));
        }
    }
    Ok(())
}

/// Checks that `name` is an existing, readable collection of type `expected`.
///
/// # Errors
///
/// Returns `Error::CollectionNotFound`, `Error::CollectionTypeInvalid` or
/// `Error::Forbidden`.
pub fn check_collection(
    store: &dyn CollectionStore,
    access: &AccessCheck<'_>,
    name: &str,
    expected: CollectionType,
) -> Result<()> {
    match store.collection_type(name) {
        None => Err(Error::CollectionNotFound(name.to_string())),
        Some(actual) if actual != expected => Err(Error::CollectionTypeInvalid(format!(
            "{name} is a {actual} collection, expected {expected}"
        ))),
        Some(_) => access.require_read(name),
    }
}

/// Resolves every collection referenced by `definitions` in the store.
///
/// Edge collections must be edge-typed, from/to collections document-typed,
/// and all of them readable by the acting user.
///
/// # Errors
///
/// Returns `Error::MalformedEdgeDefinition`, `Error::CollectionNotFound`,
/// `Error::CollectionTypeInvalid` or `Error::Forbidden`.
pub fn validate_against_store(
    definitions: &[EdgeDefinition],
    store: &dyn CollectionStore,
    access: &AccessCheck<'_>,
) -> Result<()> {
    for definition in definitions {
        definition.validate_shape()?;
        for vertex in definition.vertex_collections() {
            check_collection(store, access, vertex, CollectionType::Document)?;
        }
        check_collection(store, access, &definition.collection, CollectionType::Edge)?;
    }
    Ok(())
}
