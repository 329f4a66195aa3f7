//! Azure Cosmos DB SQL API compiler.
//!
//! Cosmos accepts a subset of SQL: properties are reached with
//! `table["column"]`, parameters are named `@column{n}`, `OFFSET/LIMIT` is
//! required, and pattern matching is limited to `STARTSWITH`/`ENDSWITH`.

use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use super::params::BoundValue;
use super::statement::{Flavor, Match, Pattern, StatementWriter};
use super::{CompiledQuery, Compiler, ExecutionHints};
use crate::error::{ApiError, Result};
use crate::query::{Query, SortKey};

const BACKEND: &str = "cosmos";

/// Document id every container has; the sort of last resort.
const ID_COLUMN: &str = "id";

const LIKE_UNSUPPORTED: &str = "The 'like' RQL operator for CosmosDb expects a single wildcard at the beginning OR \
     the end of a value.  CosmosDb does not really support 'like' but compatible 'like' statements are turned into \
     'sw' or 'ew' statments that are supported.";

const CONTAINS_UNSUPPORTED: &str = "CosmosDb supports 'sw' and 'ew' but not 'w' or 'wo' functions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CosmosCompiler;

impl CosmosCompiler {
    pub fn new() -> Self {
        CosmosCompiler
    }

    /// Cross-partition search is needed unless a root-level `eq` pins the
    /// first column of the `PartitionKey` index.
    fn enable_cross_partition(&self, query: &Query) -> bool {
        let collection = query.collection();
        let Some(partition) = collection
            .partition_index()
            .and_then(|i| i.columns.first())
            .and_then(|c| collection.find_property(c))
        else {
            return true;
        };

        let arena = query.arena();
        let pinned = query.filter().roots().iter().any(|id| {
            let [column, value] = arena.children(*id) else {
                return false;
            };
            arena.token(*id) == "eq"
                && arena.is_leaf(*column)
                && arena.is_leaf(*value)
                && !arena.token(*value).contains('*')
                && collection
                    .find_property(arena.token(*column))
                    .is_some_and(|p| p.column() == partition.column())
        });
        !pinned
    }
}

impl Flavor for CosmosCompiler {
    fn column_ref(&self, table: &str, column: &str) -> String {
        format!("{}[\"{}\"]", table, column)
    }

    fn quote_alias(&self, alias: &str) -> String {
        format!("\"{}\"", alias)
    }

    fn param_name(&self, column: &str, position: usize) -> String {
        format!("@{}{}", column, position)
    }

    fn placeholder(&self, name: &str) -> String {
        name.to_string()
    }

    fn lower_pattern(&self, pattern: Pattern<'_>) -> Result<(Match, String)> {
        match pattern {
            Pattern::StartsWith(v) => Ok((Match::StartsWith, v.to_string())),
            Pattern::EndsWith(v) => Ok((Match::EndsWith, v.to_string())),
            Pattern::Contains(_) => Err(ApiError::unsupported(BACKEND, CONTAINS_UNSUPPORTED)),
            Pattern::Wildcard(v) => match v.matches('*').count() {
                0 => Ok((Match::Equals, v.to_string())),
                1 if v.ends_with('*') => Ok((Match::StartsWith, v.trim_end_matches('*').to_string())),
                1 if v.starts_with('*') => Ok((Match::EndsWith, v.trim_start_matches('*').to_string())),
                _ => Err(ApiError::unsupported(BACKEND, LIKE_UNSUPPORTED)),
            },
        }
    }

    fn render_match(&self, op: Match, column: &str, placeholder: &str) -> String {
        match op {
            Match::StartsWith => format!("STARTSWITH ({}, {})", column, placeholder),
            Match::EndsWith => format!("ENDSWITH ({}, {})", column, placeholder),
            Match::Equals | Match::Like => format!("{} = {}", column, placeholder),
        }
    }

    fn is_null(&self, column: &str) -> String {
        format!("IS_NULL ({})", column)
    }

    fn is_not_null(&self, column: &str) -> String {
        format!("{} <> null", column)
    }

    fn not_equal(&self) -> &'static str {
        "!="
    }
}

impl Compiler for CosmosCompiler {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn compile(&self, query: &Query) -> Result<CompiledQuery> {
        let collection = query.collection();
        let projection = query.projection()?;
        let group = query.group_columns(&projection)?;
        let page = query.page_request()?;
        if !page.after.is_empty() {
            return Err(ApiError::unsupported(
                BACKEND,
                "CosmosDb pages with offset and limit; the 'after' cursor is not supported.",
            ));
        }

        let mut sort = query.sort_keys()?;
        if sort.is_empty() {
            sort.push(SortKey { property: ID_COLUMN.to_string(), column: ID_COLUMN.to_string(), descending: false });
        }

        let mut writer = StatementWriter::new(self, query);
        let mut text = format!("SELECT {} FROM {}", writer.select_list(&projection)?, collection.table());
        if let Some(filter) = writer.where_clause()? {
            text.push_str(" WHERE ");
            text.push_str(&filter);
        }
        if let Some(group_by) = writer.group_by(&group) {
            text.push(' ');
            text.push_str(&group_by);
        }
        if let Some(order_by) = writer.order_by(&sort) {
            text.push(' ');
            text.push_str(&order_by);
        }
        text.push_str(&format!(" OFFSET {} LIMIT {}", page.offset, page.limit));

        let bound_values = writer.into_params();
        let enable_cross_partition = self.enable_cross_partition(query);
        let debug = debug_string(&text, &bound_values, enable_cross_partition);
        debug!(collection = %collection.name, cross_partition = enable_cross_partition, query = %text, "compiled cosmos query");

        Ok(CompiledQuery {
            backend: BACKEND,
            text,
            bound_values,
            debug,
            dry_run: query.is_dry_run(),
            page,
            hints: ExecutionHints::Cosmos { enable_cross_partition },
        })
    }
}

/// The `SqlQuerySpec`/`FeedOptions` pair as the Cosmos SDK prints it.
fn debug_string(text: &str, params: &[BoundValue], enable_cross_partition: bool) -> String {
    let mut spec = Map::new();
    spec.insert("query".to_string(), JsonValue::String(text.to_string()));
    if !params.is_empty() {
        let params = params.iter().map(|p| json!({ "name": p.name, "value": p.value })).collect();
        spec.insert("parameters".to_string(), JsonValue::Array(params));
    }
    format!(
        "CosmosDb: SqlQuerySpec={} FeedOptions={{enableCrossPartitionQuery={}}}",
        JsonValue::Object(spec),
        enable_cross_partition
    )
}
