//! Backend query compilation.
//!
//! A [`Query`] is lowered into a backend-native, parameterized artifact by one
//! of a closed set of compilers:
//!
//! - [`SqlCompiler`] - ANSI/MySQL/SQL Server `SELECT` with positional `?` binds
//! - [`CosmosCompiler`] - Cosmos SQL API with named `@param` binds
//! - [`ElasticCompiler`] - Elasticsearch query DSL (JSON body)
//!
//! All three implement [`Compiler`]; callers hold a [`Backend`] and never
//! branch on the concrete type.

pub mod cosmos;
pub mod elastic;
pub mod params;
pub mod sql;
mod statement;

pub use cosmos::CosmosCompiler;
pub use elastic::{ElasticCompiler, PagingStrategy};
pub use params::{BoundValue, ParamBuilder};
pub use sql::{SqlCompiler, SqlDialect};

use enum_dispatch::enum_dispatch;
use serde::Serialize;

use crate::error::Result;
use crate::query::{PageRequest, Query};

/// Lowers a query into one backend's native form.
#[enum_dispatch]
pub trait Compiler {
    /// Short backend name used in logs and output.
    fn name(&self) -> &'static str;

    /// Compile `query`. Identical queries always yield identical text and binds.
    fn compile(&self, query: &Query) -> Result<CompiledQuery>;
}

/// The closed set of supported backends.
#[enum_dispatch(Compiler)]
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Sql(SqlCompiler),
    Cosmos(CosmosCompiler),
    Elastic(ElasticCompiler),
}

/// Backend-specific execution metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ExecutionHints {
    Sql,
    Cosmos {
        enable_cross_partition: bool,
    },
    /// With `SearchAfter` and no `after(...)` cursor the body returns the
    /// first page; the caller walks forward from `resume_page`.
    Elastic {
        strategy: PagingStrategy,
        /// Last page reachable with from/size; a cursor walk starts here
        #[serde(skip_serializing_if = "Option::is_none")]
        resume_page: Option<u64>,
    },
}

/// A compiled, ready-to-execute query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub backend: &'static str,
    pub text: String,
    pub bound_values: Vec<BoundValue>,
    pub debug: String,
    pub dry_run: bool,
    pub page: PageRequest,
    pub hints: ExecutionHints,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use rstest::rstest;

    #[rstest]
    #[case(Backend::Sql(SqlCompiler::default()), "sql")]
    #[case(Backend::Cosmos(CosmosCompiler::default()), "cosmos")]
    #[case(Backend::Elastic(ElasticCompiler::default()), "elastic")]
    fn test_backend_dispatch(#[case] backend: Backend, #[case] name: &str) {
        assert_eq!(backend.name(), name);

        let collection = fixtures::orders();
        let query = Query::parse(&collection, "eq(shipCountry,France)").unwrap();
        let compiled = query.compile(&backend).unwrap();
        assert_eq!(compiled.backend, name);
        assert!(!compiled.dry_run);
    }

    #[rstest]
    #[case(Backend::Sql(SqlCompiler::default()))]
    #[case(Backend::Cosmos(CosmosCompiler::default()))]
    #[case(Backend::Elastic(ElasticCompiler::default()))]
    fn test_compilation_is_deterministic(#[case] backend: Backend) {
        let collection = fixtures::orders();
        let rql = "or(eq(shipCountry,France),in(shipCity,Reims,Lyon)),gt(freight,10),sort(-orderDate),limit(20)";
        let first = Query::parse(&collection, rql).unwrap().compile(&backend).unwrap();
        let second = Query::parse(&collection, rql).unwrap().compile(&backend).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(Backend::Sql(SqlCompiler::default()))]
    #[case(Backend::Cosmos(CosmosCompiler::default()))]
    #[case(Backend::Elastic(ElasticCompiler::default()))]
    fn test_key_shorthand_matches_explicit_predicate(#[case] backend: Backend) {
        let collection = fixtures::order_details();
        let compile = |rql: &str| Query::parse(&collection, rql).unwrap().compile(&backend).unwrap();

        assert_eq!(compile("_key(byOrder,5)").text, compile("eq(orderID,5)").text);
        assert_eq!(compile("_key(byOrder,5,6)").text, compile("in(orderID,5,6)").text);
        assert_eq!(
            compile("_key(pk,'1~2')").bound_values,
            compile("and(eq(orderID,1),eq(productID,'2'))").bound_values
        );
        assert_eq!(
            compile("_key(pk,'1~2','3~4')").text,
            compile("or(and(eq(orderID,1),eq(productID,2)),and(eq(orderID,3),eq(productID,4)))").text
        );
    }

    #[test]
    fn test_dry_run_carried_through() {
        let collection = fixtures::orders();
        let query = Query::parse(&collection, "").unwrap().with_dry_run(true);
        let compiled = query.compile(&Backend::Sql(SqlCompiler::default())).unwrap();
        assert!(compiled.dry_run);
    }

    #[test]
    fn test_hints_serialization() {
        let hints = ExecutionHints::Cosmos { enable_cross_partition: false };
        assert_eq!(
            serde_json::to_string(&hints).unwrap(),
            r#"{"backend":"cosmos","enable_cross_partition":false}"#
        );
    }
}
