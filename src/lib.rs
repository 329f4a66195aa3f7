//! rql_gateway library - RQL to backend query compiler
//!
//! Parses Resource Query Language strings against a schema of collections,
//! builds a backend-neutral [`query::Query`], and compiles it into SQL, Cosmos
//! SQL API or Elasticsearch DSL. Also provides the JSON document model with
//! structural diff and patch.

pub mod cli;
pub mod commands;
pub mod compilers;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod rql;
pub mod schema;

#[macro_use]
pub mod test_macros;

#[cfg(test)]
pub mod fixtures;

pub use compilers::{Backend, CompiledQuery, Compiler};
pub use error::{ApiError, Result, Status};
pub use query::Query;
pub use schema::Schema;
