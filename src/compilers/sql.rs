//! Relational SQL backend compiler.
//!
//! Produces a single `SELECT` with positional `?` placeholders. Identifiers
//! come from the schema and are quoted per dialect; every literal is bound.
//!
//! `sw`/`ew`/`w` values match literally: LIKE metacharacters in user text are
//! escaped with `!` and every LIKE carries an `ESCAPE '!'` clause. `like`
//! patterns keep `*` and an explicit `%` as wildcards.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::statement::{has_aggregate, primary_sort, Flavor, Match, Pattern, StatementWriter};
use super::{CompiledQuery, Compiler, ExecutionHints};
use crate::error::{ApiError, Result};
use crate::query::Query;

/// Not a backslash: MySQL treats one inside a string literal as an escape.
const LIKE_ESCAPE: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// Double-quoted identifiers, `LIMIT n OFFSET m`
    #[default]
    Ansi,
    /// Backtick identifiers, `LIMIT n OFFSET m`
    #[value(name = "mysql")]
    MySql,
    /// Bracketed identifiers, `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    #[value(name = "sqlserver")]
    SqlServer,
}

impl SqlDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::Ansi => "ansi",
            SqlDialect::MySql => "mysql",
            SqlDialect::SqlServer => "sqlserver",
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        match self {
            SqlDialect::Ansi => format!("\"{}\"", ident.replace('"', "\"\"")),
            SqlDialect::MySql => format!("`{}`", ident.replace('`', "``")),
            SqlDialect::SqlServer => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Escape LIKE metacharacters so `literal` matches only itself.
    ///
    /// With `keep_percent` a `%` stays a wildcard.
    fn escape_like(&self, literal: &str, keep_percent: bool) -> String {
        let mut escaped = String::with_capacity(literal.len());
        for c in literal.chars() {
            let special = c == '_'
                || c == LIKE_ESCAPE
                || (c == '%' && !keep_percent)
                || (c == '[' && *self == SqlDialect::SqlServer);
            if special {
                escaped.push(LIKE_ESCAPE);
            }
            escaped.push(c);
        }
        escaped
    }

    fn paging(&self, offset: u64, limit: u64) -> String {
        match self {
            SqlDialect::SqlServer => format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit),
            _ => format!("LIMIT {} OFFSET {}", limit, offset),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqlCompiler {
    dialect: SqlDialect,
}

impl SqlCompiler {
    pub fn new(dialect: SqlDialect) -> Self {
        SqlCompiler { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

impl Flavor for SqlCompiler {
    fn column_ref(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.dialect.quote(table), self.dialect.quote(column))
    }

    fn quote_alias(&self, alias: &str) -> String {
        self.dialect.quote(alias)
    }

    fn param_name(&self, column: &str, position: usize) -> String {
        format!("{}{}", column, position)
    }

    fn placeholder(&self, _name: &str) -> String {
        "?".to_string()
    }

    fn lower_pattern(&self, pattern: Pattern<'_>) -> Result<(Match, String)> {
        let dialect = self.dialect;
        let value = match pattern {
            Pattern::StartsWith(v) => format!("{}%", dialect.escape_like(v, false)),
            Pattern::EndsWith(v) => format!("%{}", dialect.escape_like(v, false)),
            Pattern::Contains(v) => format!("%{}%", dialect.escape_like(v, false)),
            Pattern::Wildcard(v) => dialect.escape_like(v, true).replace('*', "%"),
        };
        Ok((Match::Like, value))
    }

    fn render_match(&self, op: Match, column: &str, placeholder: &str) -> String {
        match op {
            Match::Equals => format!("{} = {}", column, placeholder),
            _ => format!("{} LIKE {} ESCAPE '{}'", column, placeholder, LIKE_ESCAPE),
        }
    }
}

impl Compiler for SqlCompiler {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn compile(&self, query: &Query) -> Result<CompiledQuery> {
        let collection = query.collection();
        let projection = query.projection()?;
        let group = query.group_columns(&projection)?;
        let page = query.page_request()?;
        if !page.after.is_empty() {
            return Err(ApiError::unsupported(
                "sql",
                "The 'after' cursor is only supported by Elasticsearch; use page or offset.",
            ));
        }

        let mut sort = query.sort_keys()?;
        if sort.is_empty() && group.is_empty() && !projection.distinct && !has_aggregate(&projection) {
            sort = primary_sort(collection)?;
        }

        let mut writer = StatementWriter::new(self, query);
        let mut text = format!(
            "SELECT {} FROM {}",
            writer.select_list(&projection)?,
            self.dialect.quote(collection.table())
        );
        if let Some(filter) = writer.where_clause()? {
            text.push_str(" WHERE ");
            text.push_str(&filter);
        }
        if let Some(group_by) = writer.group_by(&group) {
            text.push(' ');
            text.push_str(&group_by);
        }
        match writer.order_by(&sort) {
            Some(order_by) => {
                text.push(' ');
                text.push_str(&order_by);
            }
            // OFFSET/FETCH is only legal after an ORDER BY
            None if self.dialect == SqlDialect::SqlServer => text.push_str(" ORDER BY (SELECT NULL)"),
            None => {}
        }
        text.push(' ');
        text.push_str(&self.dialect.paging(page.offset, page.limit));

        let bound_values = writer.into_params();
        let args = JsonValue::Array(bound_values.iter().map(|b| b.value.clone()).collect());
        let debug = format!("SQL[{}]: {} args={}", self.dialect, text, args);
        debug!(collection = %collection.name, dialect = %self.dialect, sql = %text, "compiled sql query");

        Ok(CompiledQuery {
            backend: self.name(),
            text,
            bound_values,
            debug,
            dry_run: query.is_dry_run(),
            page,
            hints: ExecutionHints::Sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilers::Backend;
    use crate::fixtures;
    use rstest::rstest;
    use serde_json::json;

    fn compile(dialect: SqlDialect, rql: &str) -> Result<CompiledQuery> {
        let collection = fixtures::orders();
        Query::parse(&collection, rql)?.compile(&Backend::Sql(SqlCompiler::new(dialect)))
    }

    fn text(rql: &str) -> String {
        compile(SqlDialect::Ansi, rql).unwrap().text
    }

    #[test]
    fn test_default_query() {
        assert_eq!(
            text(""),
            r#"SELECT * FROM "orders" ORDER BY "orders"."id" ASC LIMIT 100 OFFSET 0"#
        );
    }

    #[rstest]
    #[case("eq(shipCountry,France)", r#""orders"."shipCountry" = ?"#)]
    #[case("ne(shipCountry,France)", r#"(NOT ("orders"."shipCountry" = ?))"#)]
    #[case("lt(freight,10)", r#""orders"."freight" < ?"#)]
    #[case("le(freight,10)", r#""orders"."freight" <= ?"#)]
    #[case("gt(freight,10)", r#""orders"."freight" > ?"#)]
    #[case("ge(freight,10)", r#""orders"."freight" >= ?"#)]
    #[case("sw(shipCity,Re)", r#""orders"."shipCity" LIKE ? ESCAPE '!'"#)]
    #[case("wo(shipCity,ei)", r#"NOT ("orders"."shipCity" LIKE ? ESCAPE '!')"#)]
    #[case("in(shipCity,Reims,Lyon)", r#""orders"."shipCity" IN(?, ?)"#)]
    #[case("out(shipCity,Reims)", r#""orders"."shipCity" NOT IN(?)"#)]
    #[case("n(shipRegion)", r#""orders"."shipRegion" IS NULL"#)]
    #[case("nn(shipRegion)", r#""orders"."shipRegion" IS NOT NULL"#)]
    #[case("emp(shipRegion)", r#"("orders"."shipRegion" IS NULL OR "orders"."shipRegion" = '')"#)]
    #[case("nemp(shipRegion)", r#"("orders"."shipRegion" IS NOT NULL AND "orders"."shipRegion" <> '')"#)]
    #[case(
        "or(eq(shipCity,Reims),eq(shipCity,Lyon))",
        r#"("orders"."shipCity" = ? OR "orders"."shipCity" = ?)"#
    )]
    #[case(
        "not(or(eq(shipCity,Reims),eq(shipCity,Lyon)))",
        r#"NOT (("orders"."shipCity" = ? OR "orders"."shipCity" = ?))"#
    )]
    #[case(
        "eq(shipCity,Reims),gt(freight,1)",
        r#""orders"."shipCity" = ? AND "orders"."freight" > ?"#
    )]
    fn test_where_operators(#[case] rql: &str, #[case] expected: &str) {
        let sql = text(rql);
        let filter = sql
            .split(" WHERE ")
            .nth(1)
            .and_then(|rest| rest.split(" ORDER BY ").next())
            .unwrap();
        assert_eq!(filter, expected);
    }

    #[rstest]
    #[case("sw(shipCity,Re)", "Re%")]
    #[case("ew(shipCity,ms)", "%ms")]
    #[case("w(shipCity,eim)", "%eim%")]
    #[case("like(shipCity,R*s)", "R%s")]
    #[case("like(shipCity,'R%s')", "R%s")]
    #[case("eq(shipCity,Rei*)", "Rei%")]
    #[case("sw(shipCity,A_1)", "A!_1%")]
    #[case("w(shipCity,'50%')", "%50!%%")]
    #[case("ew(shipCity,'a!b')", "%a!!b")]
    #[case("like(shipCity,'*_x*')", "%!_x%")]
    fn test_pattern_values(#[case] rql: &str, #[case] bound: &str) {
        let compiled = compile(SqlDialect::Ansi, rql).unwrap();
        assert!(compiled.text.contains(" LIKE ? ESCAPE '!'"));
        assert_eq!(compiled.bound_values[0].value, json!(bound));
    }

    #[rstest]
    #[case(SqlDialect::Ansi, "[a]", "[a]%")]
    #[case(SqlDialect::MySql, "[a]", "[a]%")]
    #[case(SqlDialect::SqlServer, "[a]", "![a]%")]
    fn test_pattern_escapes_per_dialect(#[case] dialect: SqlDialect, #[case] raw: &str, #[case] bound: &str) {
        let compiled = compile(dialect, &format!("sw(shipCity,'{}')", raw)).unwrap();
        assert_eq!(compiled.bound_values[0].value, json!(bound));
    }

    #[test]
    fn test_values_typed_by_column() {
        let compiled = compile(SqlDialect::Ansi, "eq(orderID,10248),gt(freight,3.67),ge(orderDate,1996-07-04)").unwrap();
        let values: Vec<_> = compiled.bound_values.iter().map(|b| b.value.clone()).collect();
        assert_eq!(values, vec![json!("10248"), json!(3.67), json!("1996-07-04T00:00:00Z")]);
        assert_eq!(compiled.bound_values[0].name, "orderID1");
    }

    #[test]
    fn test_literals_never_inlined() {
        let compiled = compile(SqlDialect::Ansi, r"eq(shipCity,'x\' OR 1=1 --')").unwrap();
        assert!(!compiled.text.contains("OR 1=1"));
        assert_eq!(compiled.bound_values[0].value, json!("x' OR 1=1 --"));
    }

    #[test]
    fn test_invalid_typed_literal() {
        let err = compile(SqlDialect::Ansi, "gt(freight,cheap)").unwrap_err();
        assert!(matches!(err, ApiError::InvalidValue { .. }));
        assert_eq!(err.status().code(), 400);
    }

    #[rstest]
    #[case(SqlDialect::Ansi, r#"SELECT "orders"."shipCity" FROM "orders" ORDER BY "orders"."shipCity" DESC LIMIT 10 OFFSET 20"#)]
    #[case(SqlDialect::MySql, "SELECT `orders`.`shipCity` FROM `orders` ORDER BY `orders`.`shipCity` DESC LIMIT 10 OFFSET 20")]
    #[case(
        SqlDialect::SqlServer,
        "SELECT [orders].[shipCity] FROM [orders] ORDER BY [orders].[shipCity] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    )]
    fn test_dialects(#[case] dialect: SqlDialect, #[case] expected: &str) {
        let compiled = compile(dialect, "includes(shipCity),sort(-shipCity),page(3),pageSize(10)").unwrap();
        assert_eq!(compiled.text, expected);
        assert_eq!(compiled.page.offset, 20);
    }

    #[test]
    fn test_sqlserver_requires_order_by() {
        let compiled = compile(SqlDialect::SqlServer, "count(*)").unwrap();
        assert_eq!(
            compiled.text,
            "SELECT COUNT(*) FROM [orders] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY"
        );
    }

    #[rstest]
    #[case("as(orderID,order_identifier)", r#"SELECT *, "orders"."orderID" AS "order_identifier" FROM"#)]
    #[case("distinct(shipCountry)", r#"SELECT DISTINCT "orders"."shipCountry" FROM"#)]
    #[case("count(*,countOrders)", r#"SELECT COUNT(*) AS "countOrders" FROM"#)]
    #[case("count(shipRegion)", r#"SELECT COUNT("orders"."shipRegion") FROM"#)]
    #[case(
        "sum(freight,'Sum Freight'),min(freight),max(freight)",
        r#"SELECT SUM("orders"."freight") AS "Sum Freight", MIN("orders"."freight"), MAX("orders"."freight") FROM"#
    )]
    #[case(
        "sum(if(eq(shipCountry,France)),'French Orders')",
        r#"SELECT SUM(CASE WHEN "orders"."shipCountry" = ? THEN 1 ELSE 0 END) AS "French Orders" FROM"#
    )]
    #[case(
        "sum(if(gt(freight,100),2,1),weight)",
        r#"SELECT SUM(CASE WHEN "orders"."freight" > ? THEN 2 ELSE 1 END) AS "weight" FROM"#
    )]
    fn test_select_clause(#[case] rql: &str, #[case] prefix: &str) {
        let sql = text(rql);
        assert!(sql.starts_with(prefix), "{}", sql);
    }

    #[test]
    fn test_group_count() {
        assert_eq!(
            text("groupCount(shipCountry,countryCount)"),
            r#"SELECT "orders"."shipCountry", COUNT(*) AS "countryCount" FROM "orders" GROUP BY "orders"."shipCountry" LIMIT 100 OFFSET 0"#
        );
    }

    #[test]
    fn test_excludes_lists_remaining_columns() {
        let sql = text("excludes(shipRegion,freight,shipCity,orderDate,type,customerID)");
        assert!(sql.starts_with(r#"SELECT "orders"."id", "orders"."orderID", "orders"."shipCountry" FROM"#));
    }

    #[test]
    fn test_bind_order_follows_text() {
        let compiled = compile(SqlDialect::Ansi, "sum(if(eq(shipCountry,France))),eq(shipCity,Paris)").unwrap();
        let values: Vec<_> = compiled.bound_values.iter().map(|b| b.value.clone()).collect();
        assert_eq!(values, vec![json!("France"), json!("Paris")]);
    }

    #[test]
    fn test_where_if_branches() {
        let compiled = compile(SqlDialect::Ansi, "if(eq(type,rush),gt(freight,10),lt(freight,5))").unwrap();
        assert!(compiled.text.contains(
            r#"(("orders"."type" = ? AND "orders"."freight" > ?) OR (NOT ("orders"."type" = ?) AND "orders"."freight" < ?))"#
        ));
        assert_eq!(compiled.bound_values.len(), 4);
    }

    #[test]
    fn test_debug_string() {
        let compiled = compile(SqlDialect::MySql, "eq(shipCity,Reims)").unwrap();
        assert!(compiled.debug.starts_with("SQL[mysql]: SELECT"));
        assert!(compiled.debug.ends_with(r#"args=["Reims"]"#));
        assert_eq!(compiled.hints, ExecutionHints::Sql);
    }

    #[rstest]
    #[case("after(10)")]
    fn test_cursor_paging_rejected(#[case] rql: &str) {
        let err = compile(SqlDialect::Ansi, rql).unwrap_err();
        assert!(matches!(err, ApiError::Unsupported { backend: "sql", .. }));
    }

    #[rstest]
    #[case("in(shipCity)")]
    #[case("eq(shipCity)")]
    #[case("n(shipCity,x)")]
    #[case("eq(nope,1)")]
    fn test_malformed_predicates(#[case] rql: &str) {
        assert!(compile(SqlDialect::Ansi, rql).is_err());
    }

    crate::compile_test! {
        test_name: test_compound_key_on_mapped_table,
        collection: fixtures::order_details(),
        backend: SqlCompiler::default(),
        rql: "_key(pk,'10248~11')",
        text: r#"SELECT * FROM "order_details" WHERE "order_details"."orderID" = ? AND "order_details"."productID" = ? ORDER BY "order_details"."orderID" ASC, "order_details"."productID" ASC LIMIT 100 OFFSET 0"#,
    }

    crate::compile_test! {
        test_name: test_sqlserver_limit_only,
        collection: fixtures::customers(),
        backend: SqlCompiler::new(SqlDialect::SqlServer),
        rql: "limit(5)",
        text: "SELECT * FROM [customers] ORDER BY [customers].[customerID] ASC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY",
    }

    crate::compile_error_test! {
        test_name: test_key_arity_mismatch,
        collection: fixtures::order_details(),
        backend: SqlCompiler::default(),
        rql: "_key(pk,'10248')",
        contains: "has 1 parts but the index has 2 columns",
    }

    crate::compile_error_test! {
        test_name: test_unknown_index,
        collection: fixtures::customers(),
        backend: SqlCompiler::default(),
        rql: "_key(byCountry,France)",
        contains: "has an index named 'byCountry'",
    }
}
