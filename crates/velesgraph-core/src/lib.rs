//! # `VelesGraph` Core
//!
//! Named-graph layer over a document/edge collection store.
//!
//! A graph is a set of vertex collections plus edge definitions that
//! constrain which collection pairs an edge collection may connect.
//!
//! ## Features
//!
//! - **Edge definitions**: validated against the store, compared in
//!   canonical sorted form across graphs
//! - **Constraint-checked writes**: edge inserts must match an edge
//!   definition of the graph
//! - **Cascading deletes**: removing a vertex or edge removes every
//!   dependent edge in every graph, in one transaction
//! - **Query composition**: neighbors, paths, shortest paths and
//!   centrality measures as parameterized queries for an external engine
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use velesgraph_core::{
//!     relation, CollectionType, CreateGraphOptions, GraphConfig, GraphContext, GraphManager,
//!     MemoryDatabase,
//! };
//!
//! let db = Arc::new(MemoryDatabase::new());
//! db.create_collection("person", CollectionType::Document)?;
//! db.create_collection("knows", CollectionType::Edge)?;
//!
//! let manager = GraphManager::new(GraphContext::in_memory(db, GraphConfig::default())?);
//! let graph = manager.create_graph(
//!     "social",
//!     vec![relation("knows", "person", "person")?],
//!     vec![],
//!     CreateGraphOptions::default(),
//! )?;
//!
//! let person = graph.vertex_collection("person")?;
//! person.insert(serde_json::from_value(serde_json::json!({"_key": "alice"}))?)?;
//! person.insert(serde_json::from_value(serde_json::json!({"_key": "bob"}))?)?;
//! graph
//!     .edge_collection("knows")?
//!     .insert_between("person/alice", "person/bob", Default::default())?;
//!
//! // Removes bob and the edge in one transaction.
//! person.remove("bob", &Default::default())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::if_not_else)]
#![allow(clippy::use_self)]

pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod store;


pub use config::{ConfigError, GraphConfig};
pub use error::{Error, Result};
pub use graph::{
    compose_edge_definitions, extend_edge_definitions, relation, sort_edge_definition,
    CommonPropertiesOptions, ComposedQuery, CreateGraphOptions, Direction, EdgeDefinition,
    Example, GraphContext, GraphDefinition, GraphDocument, GraphManager, GraphRegistry,
    PathOptions, PathsOptions, TraversalOptions,
};
pub use logging::init_logging;
pub use store::memory::MemoryDatabase;
pub use store::{
    AccessLevel, CollectionStore, CollectionType, Document, DocumentHandle, DocumentMeta,
    InsertOptions, PermissionService, QueryEngine, RemoveOptions, TransactionEngine,
    TransactionSpec,
};
