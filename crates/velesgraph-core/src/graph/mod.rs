//! Named graphs over document and edge collections.
//!
//! - [`edge_definition`]: edge definition values and their validation
//! - [`registry`]: persisted graph documents
//! - [`binder`]: constraint-checking collection handles
//! - [`cascade`]: cross-graph cascading deletes
//! - [`query`]: traversal query composition
//! - [`GraphDefinition`]: the bound graph
//! - [`GraphManager`]: graph lifecycle

pub mod binder;
pub mod cascade;
pub mod definition;
pub mod edge_definition;
pub mod manager;
pub mod query;
pub mod registry;

#[cfg(test)]
mod cascade_tests;
#[cfg(test)]
mod edge_definition_tests;

pub use binder::{Bindings, BoundEdgeCollection, BoundVertexCollection};
pub use cascade::PendingDeleteSet;
pub use definition::GraphDefinition;
pub use edge_definition::{
    compose_edge_definitions, extend_edge_definitions, relation, sort_edge_definition,
    CollectionSpec, EdgeDefinition,
};
pub use manager::{CreateGraphOptions, GraphContext, GraphManager};
pub use query::{
    CommonPropertiesOptions, ComposedQuery, Direction, EdgeWeight, Example, Metric, PathOptions,
    PathsOptions, QueryComposer, TraversalOptions,
};
pub use registry::{GraphDocument, GraphRegistry, GraphRegistryMut, SystemGraphRegistry};
