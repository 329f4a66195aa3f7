//! Output formatting tests for compile command.

#[cfg(test)]
mod tests {
    use super::super::execute::CompileResult;
    use crate::compilers::{BoundValue, CompiledQuery, ExecutionHints, PagingStrategy};
    use crate::query::PageRequest;
    use rstest::{fixture, rstest};
    use serde_json::json;

    // =========================================================================
    // Expected outputs
    // =========================================================================

    const SQL_TABLE: &str = r#"Collection: orders (sql)
RQL: eq(shipCountry,France)

Query:
  SELECT * FROM "orders" WHERE "orders"."shipCountry" = ? ORDER BY "orders"."id" ASC LIMIT 100 OFFSET 0

Parameters (1):
  shipCountry1 = "France"

Page: 1 (size 100, offset 0, limit 100)"#;

    const COSMOS_TABLE: &str = r#"Collection: orders (cosmos)
Dry run: query is not executed

Query:
  SELECT * FROM orders ORDER BY orders["id"] ASC OFFSET 0 LIMIT 100

Page: 1 (size 100, offset 0, limit 100)
Cross-partition: true"#;

    const ELASTIC_TABLE: &str = r#"Collection: orders (elastic)
RQL: sort(id),page(6,20)

Query:
  {
    "size": 20
  }

Page: 6 (size 20, offset 100, limit 20)
Paging: search_after (resume after page 5)"#;

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn page(page_num: u64, page_size: u64) -> PageRequest {
        PageRequest {
            offset: (page_num - 1) * page_size,
            limit: page_size,
            page_num,
            page_size,
            after: vec![],
            explicit: page_num > 1,
        }
    }

    #[fixture]
    fn sql_result() -> CompileResult {
        CompileResult {
            collection: "orders".to_string(),
            rql: "eq(shipCountry,France)".to_string(),
            compiled: CompiledQuery {
                backend: "sql",
                text: r#"SELECT * FROM "orders" WHERE "orders"."shipCountry" = ? ORDER BY "orders"."id" ASC LIMIT 100 OFFSET 0"#.to_string(),
                bound_values: vec![BoundValue { name: "shipCountry1".to_string(), value: json!("France") }],
                debug: String::new(),
                dry_run: false,
                page: page(1, 100),
                hints: ExecutionHints::Sql,
            },
        }
    }

    #[fixture]
    fn cosmos_result() -> CompileResult {
        CompileResult {
            collection: "orders".to_string(),
            rql: String::new(),
            compiled: CompiledQuery {
                backend: "cosmos",
                text: r#"SELECT * FROM orders ORDER BY orders["id"] ASC OFFSET 0 LIMIT 100"#.to_string(),
                bound_values: vec![],
                debug: String::new(),
                dry_run: true,
                page: page(1, 100),
                hints: ExecutionHints::Cosmos { enable_cross_partition: true },
            },
        }
    }

    #[fixture]
    fn elastic_result() -> CompileResult {
        CompileResult {
            collection: "orders".to_string(),
            rql: "sort(id),page(6,20)".to_string(),
            compiled: CompiledQuery {
                backend: "elastic",
                text: "{\n  \"size\": 20\n}".to_string(),
                bound_values: vec![],
                debug: String::new(),
                dry_run: false,
                page: page(6, 20),
                hints: ExecutionHints::Elastic {
                    strategy: PagingStrategy::SearchAfter,
                    resume_page: Some(5),
                },
            },
        }
    }

    // =========================================================================
    // Table format tests
    // =========================================================================

    crate::output_table_test! {
        test_name: test_to_table_sql,
        fixture: sql_result,
        fixture_type: CompileResult,
        expected: SQL_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_cosmos_dry_run,
        fixture: cosmos_result,
        fixture_type: CompileResult,
        expected: COSMOS_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_elastic_indents_body,
        fixture: elastic_result,
        fixture_type: CompileResult,
        expected: ELASTIC_TABLE,
    }

    // =========================================================================
    // JSON format tests
    // =========================================================================

    crate::output_json_test! {
        test_name: test_format_json_flattens_compiled_query,
        fixture: sql_result,
        fixture_type: CompileResult,
        assertions: {
            "collection": "orders",
            "backend": "sql",
            "dry_run": false,
            "bound_values": json!([{ "name": "shipCountry1", "value": "France" }]),
            "hints": json!({ "backend": "sql" }),
        },
    }

    crate::output_json_test! {
        test_name: test_format_json_elastic_hints,
        fixture: elastic_result,
        fixture_type: CompileResult,
        assertions: {
            "hints": json!({ "backend": "elastic", "strategy": "search_after", "resume_page": 5 }),
        },
    }

    // =========================================================================
    // Toon format tests
    // =========================================================================

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: sql_result,
        fixture_type: CompileResult,
        contains: ["collection: orders", "backend: sql"],
    }
}
