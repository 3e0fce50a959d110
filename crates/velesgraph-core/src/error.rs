//! Error types for `velesgraph`.
//!
//! One error type covers validation, binding, cascading deletes and query
//! composition. Every variant carries a stable numeric code, rendered as
//! `[VGRAPH-<code>]` so callers can map failures to transport responses.

use thiserror::Error;

/// Result type alias for `velesgraph` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the graph layer.
///
/// Validation errors are raised synchronously at the point of detection.
/// Failures reported by the collection store, transaction engine or query
/// engine are propagated unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (VGRAPH-1).
    #[error("[VGRAPH-1] Configuration error: {0}")]
    Config(String),

    /// The acting principal lacks the required permission (VGRAPH-11).
    #[error("[VGRAPH-11] Forbidden: insufficient permissions on collection '{0}'")]
    Forbidden(String),

    /// A document could not be (de)serialized (VGRAPH-600).
    #[error("[VGRAPH-600] Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document not found (VGRAPH-1202).
    #[error("[VGRAPH-1202] Document '{0}' not found")]
    DocumentNotFound(String),

    /// Collection not found (VGRAPH-1203).
    #[error("[VGRAPH-1203] Collection '{0}' not found")]
    CollectionNotFound(String),

    /// A document handle has no `collection/key` shape (VGRAPH-1205).
    #[error("[VGRAPH-1205] Illegal document handle '{0}'")]
    DocumentHandleBad(String),

    /// A collection has the wrong type for its role (VGRAPH-1218).
    #[error("[VGRAPH-1218] Invalid collection type: {0}")]
    CollectionTypeInvalid(String),

    /// The graph object is not usable in its current state (VGRAPH-1901).
    #[error("[VGRAPH-1901] Invalid graph: {0}")]
    InvalidGraph(String),

    /// An edge does not conform to any edge definition (VGRAPH-1906).
    #[error("[VGRAPH-1906] Invalid edge between {from} and {to}. Doesn't conform to any edge definition")]
    InvalidEdge {
        /// Source vertex handle.
        from: String,
        /// Target vertex handle.
        to: String,
    },

    /// An edge collection appears in more than one definition (VGRAPH-1920).
    #[error("[VGRAPH-1920] Multi use of edge collection '{0}' in edge definitions")]
    CollectionMultiUse(String),

    /// An edge collection is used by another graph with a different definition (VGRAPH-1921).
    #[error("[VGRAPH-1921] Edge collection '{0}' is already used in another graph with a different edge definition")]
    CollectionUseInMultiGraphs(String),

    /// Graph name missing (VGRAPH-1922).
    #[error("[VGRAPH-1922] Graph name is missing")]
    MissingGraphName,

    /// Malformed edge definition (VGRAPH-1923).
    #[error("[VGRAPH-1923] Malformed edge definition: {0}")]
    MalformedEdgeDefinition(String),

    /// Graph not found (VGRAPH-1924).
    #[error("[VGRAPH-1924] Graph '{0}' not found")]
    GraphNotFound(String),

    /// Graph already exists (VGRAPH-1925).
    #[error("[VGRAPH-1925] Graph '{0}' already exists")]
    GraphDuplicate(String),

    /// Vertex collection is not part of the graph (VGRAPH-1926).
    #[error("[VGRAPH-1926] Vertex collection '{0}' does not exist or is not part of the graph")]
    VertexCollectionDoesNotExist(String),

    /// A vertex collection must be a document collection (VGRAPH-1927).
    #[error("[VGRAPH-1927] Collection '{0}' is not a document collection and cannot hold vertices")]
    WrongCollectionTypeVertex(String),

    /// Collection is not an orphan of the graph (VGRAPH-1928).
    #[error("[VGRAPH-1928] Collection '{0}' is not in the orphan collections of the graph")]
    NotInOrphanCollection(String),

    /// Collection is already referenced by an edge definition (VGRAPH-1929).
    #[error("[VGRAPH-1929] Collection '{0}' is already used in an edge definition")]
    CollectionUsedInEdgeDefinition(String),

    /// Edge collection is not used by the graph (VGRAPH-1930).
    #[error("[VGRAPH-1930] Edge collection '{0}' is not used in any edge definition of the graph")]
    EdgeCollectionNotUsed(String),

    /// The system collection holding graph documents is missing (VGRAPH-1932).
    #[error("[VGRAPH-1932] Graph registry collection '{0}' does not exist")]
    NoGraphCollection(String),

    /// Invalid parameter (VGRAPH-1936).
    #[error("[VGRAPH-1936] Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Collection is already an orphan of the graph (VGRAPH-1938).
    #[error("[VGRAPH-1938] Collection '{0}' is already used in the orphan collections")]
    CollectionUsedInOrphans(String),

    /// Edge collection is not part of the graph (VGRAPH-1939).
    #[error("[VGRAPH-1939] Edge collection '{0}' does not exist or is not part of the graph")]
    EdgeCollectionDoesNotExist(String),

    /// Graph has no vertex collections to query (VGRAPH-1940).
    #[error("[VGRAPH-1940] Graph '{0}' has no vertex collections")]
    GraphEmpty(String),

    /// Error reported by an external collaborator, propagated as-is.
    #[error("[VGRAPH-{code}] {message}")]
    Collaborator {
        /// Collaborator error number.
        code: u32,
        /// Collaborator error message.
        message: String,
    },
}

impl Error {
    /// Returns the stable numeric error code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Config(_) => 1,
            Self::Forbidden(_) => 11,
            Self::Serialization(_) => 600,
            Self::DocumentNotFound(_) => 1202,
            Self::CollectionNotFound(_) => 1203,
            Self::DocumentHandleBad(_) => 1205,
            Self::CollectionTypeInvalid(_) => 1218,
            Self::InvalidGraph(_) => 1901,
            Self::InvalidEdge { .. } => 1906,
            Self::CollectionMultiUse(_) => 1920,
            Self::CollectionUseInMultiGraphs(_) => 1921,
            Self::MissingGraphName => 1922,
            Self::MalformedEdgeDefinition(_) => 1923,
            Self::GraphNotFound(_) => 1924,
            Self::GraphDuplicate(_) => 1925,
            Self::VertexCollectionDoesNotExist(_) => 1926,
            Self::WrongCollectionTypeVertex(_) => 1927,
            Self::NotInOrphanCollection(_) => 1928,
            Self::CollectionUsedInEdgeDefinition(_) => 1929,
            Self::EdgeCollectionNotUsed(_) => 1930,
            Self::NoGraphCollection(_) => 1932,
            Self::InvalidParameter(_) => 1936,
            Self::CollectionUsedInOrphans(_) => 1938,
            Self::EdgeCollectionDoesNotExist(_) => 1939,
            Self::GraphEmpty(_) => 1940,
            Self::Collaborator { code, .. } => *code,
        }
    }

    /// Returns true if the caller can fix the input and retry.
    ///
    /// Collaborator errors are not classified here.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidGraph(_) | Self::Collaborator { .. })
    }

    /// Builds a collaborator error.
    #[must_use]
    pub fn collaborator(code: u32, message: impl Into<String>) -> Self {
        Self::Collaborator {
            code,
            message: message.into(),
        }
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
