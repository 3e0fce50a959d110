//! Parameterized traversal and analytics queries.
//!
//! [`QueryComposer`] turns high level requests into [`ComposedQuery`]
//! values for an external query engine. Nothing here traverses a graph
//! in process.

pub mod centrality;
mod composer;
mod example;
mod options;


pub use centrality::Metric;
pub use composer::{is_valid_collection_name, ComposedQuery, QueryComposer};
pub use example::Example;
pub use options::{
    CommonPropertiesOptions, Direction, EdgeWeight, PathOptions, PathsOptions, TraversalOptions,
};
