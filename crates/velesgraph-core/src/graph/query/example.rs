//! Example predicates used to select vertices and edges.

use serde_json::{Map, Value};

/// An attribute-equality predicate.
///
/// Converts from JSON: `null`, `{}` and `[]` match everything, a string
/// matches by `_id`, an object is an AND of attribute equalities, and an
/// array ORs its members.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Example {
    /// Matches every document.
    #[default]
    All,
    /// Matches the document with this `_id`.
    Id(String),
    /// Matches documents whose attributes equal all given values.
    Attributes(Map<String, Value>),
    /// Matches documents matching any member.
    AnyOf(Vec<Example>),
}

impl Example {
    /// Matches by document id.
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Returns true if this example selects every document.
    ///
    /// An `AnyOf` with a match-all member matches everything.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        match self {
            Self::All => true,
            Self::Id(_) => false,
            Self::Attributes(attributes) => attributes.is_empty(),
            Self::AnyOf(members) => members.is_empty() || members.iter().any(Self::is_match_all),
        }
    }

    /// Flattens nested `AnyOf` into the list of alternatives.
    pub(crate) fn alternatives(&self) -> Vec<&Example> {
        match self {
            Self::AnyOf(members) => members.iter().flat_map(Self::alternatives).collect(),
            other => vec![other],
        }
    }
}

impl From<Value> for Example {
    fn from(value: Value) -> Self {
        match value {
            Value::String(id) => Self::Id(id),
            Value::Object(attributes) if attributes.is_empty() => Self::All,
            Value::Object(attributes) => Self::Attributes(attributes),
            Value::Array(members) if members.is_empty() => Self::All,
            Value::Array(members) => Self::AnyOf(members.into_iter().map(Self::from).collect()),
            Value::Null | Value::Bool(_) | Value::Number(_) => Self::All,
        }
    }
}

impl From<&str> for Example {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Example {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Map<String, Value>> for Example {
    fn from(attributes: Map<String, Value>) -> Self {
        Self::from(Value::Object(attributes))
    }
}

impl From<Vec<Example>> for Example {
    fn from(members: Vec<Example>) -> Self {
        if members.is_empty() {
            Self::All
        } else {
            Self::AnyOf(members)
        }
    }
}
