//! Options accepted by the traversal queries.

use serde::{Deserialize, Serialize};

use super::example::Example;

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges in both directions.
    #[default]
    Any,
    /// Follow edges towards their `_from`.
    Inbound,
    /// Follow edges towards their `_to`.
    Outbound,
}

impl Direction {
    /// Query keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::Inbound => "INBOUND",
            Self::Outbound => "OUTBOUND",
        }
    }
}

/// Options for `edges`, `vertices`, `neighbors` and `common_neighbors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalOptions {
    /// Traversal direction (default any).
    pub direction: Direction,
    /// Minimum depth (default 1).
    pub min_depth: Option<u32>,
    /// Maximum depth (default 1, raised to the minimum when only that is set).
    pub max_depth: Option<u32>,
    /// Only traverse these edge collections; empty means the whole graph.
    pub edge_collection_restriction: Vec<String>,
    /// Only return vertices of these collections.
    pub vertex_collection_restriction: Vec<String>,
    /// Filter on traversed edges.
    pub edge_examples: Example,
    /// Filter on reached vertices.
    pub neighbor_examples: Example,
    /// Return whole documents instead of ids.
    pub include_data: bool,
}

impl TraversalOptions {
    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets minimum and maximum depth.
    #[must_use]
    pub fn with_depth(mut self, min: u32, max: u32) -> Self {
        self.min_depth = Some(min);
        self.max_depth = Some(max);
        self
    }

    /// Restricts traversed edge collections.
    #[must_use]
    pub fn with_edge_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_collection_restriction = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts returned vertex collections.
    #[must_use]
    pub fn with_vertex_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vertex_collection_restriction = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Returns documents instead of ids.
    #[must_use]
    pub fn with_data(mut self) -> Self {
        self.include_data = true;
        self
    }
}

/// Edge weight used by shortest-path based queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    /// Edge attribute holding the weight.
    pub attribute: String,
    /// Weight of edges without a numeric attribute.
    pub default: f64,
}

/// Options for shortest paths, distances and centrality measures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathOptions {
    /// Traversal direction (default any).
    pub direction: Direction,
    /// Weighted paths; unweighted when `None`.
    pub weight: Option<EdgeWeight>,
    /// Keep only the globally cheapest path.
    pub stop_at_first_match: bool,
}

impl PathOptions {
    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Weighs edges by `attribute`, using `default` when it is missing.
    #[must_use]
    pub fn with_weight(mut self, attribute: impl Into<String>, default: f64) -> Self {
        self.weight = Some(EdgeWeight {
            attribute: attribute.into(),
            default,
        });
        self
    }

    /// Keeps only the cheapest path.
    #[must_use]
    pub fn with_stop_at_first_match(mut self) -> Self {
        self.stop_at_first_match = true;
        self
    }
}

/// Options for `common_properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonPropertiesOptions {
    /// Attributes never compared.
    pub ignore_properties: Vec<String>,
}

/// Options for `paths`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsOptions {
    /// Traversal direction (default outbound).
    pub direction: Direction,
    /// Minimum path length; configured default when `None`.
    pub min_length: Option<u32>,
    /// Maximum path length; configured default when `None`.
    pub max_length: Option<u32>,
    /// Allow revisiting vertices through distinct edges.
    pub follow_cycles: bool,
}

impl Default for PathsOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Outbound,
            min_length: None,
            max_length: None,
            follow_cycles: false,
        }
    }
}
