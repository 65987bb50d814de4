//! relgraph - relational databases as property graphs
//!
//! Converts an arbitrary relational database into a property graph without a
//! user-written mapping:
//! - Schema introspection and table classification (vertex, direct edge,
//!   junction edge)
//! - Retrieval planning with dialect-aware, partitioned queries
//! - Vertex construction and edge reconstruction from foreign-key joins
//! - JSON graph output

pub mod config;
pub mod graph_builder;
pub mod graph_output;
pub mod query_planner;
pub mod source_catalog;
pub mod source_db;
