//! SQL-shaped statement writer shared by the SQL and Cosmos compilers.
//!
//! The two backends agree on the overall `SELECT ... WHERE ... ORDER BY`
//! shape and differ in identifier access, placeholder syntax and pattern
//! functions. Those differences live behind [`Flavor`].

use serde_json::Value as JsonValue;

use super::params::{BoundValue, ParamBuilder};
use crate::error::{ApiError, Result};
use crate::query::{AggregateArg, Projection, Query, SelectItem, SortKey};
use crate::rql::{TermArena, TermId};
use crate::schema::{Collection, Property};

/// A pattern predicate before backend lowering. Values carry no wildcards
/// except for [`Pattern::Wildcard`], which uses `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pattern<'v> {
    StartsWith(&'v str),
    EndsWith(&'v str),
    Contains(&'v str),
    Wildcard(&'v str),
}

/// The operator a pattern lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Match {
    Like,
    StartsWith,
    EndsWith,
    Equals,
}

/// Backend-specific syntax for the shared writer.
pub(crate) trait Flavor {
    /// Qualified access to `column` of `table`.
    fn column_ref(&self, table: &str, column: &str) -> String;

    fn quote_alias(&self, alias: &str) -> String;

    /// Name recorded with a bound value at 1-based `position`.
    fn param_name(&self, column: &str, position: usize) -> String;

    /// Text that stands in for the bound value called `name`.
    fn placeholder(&self, name: &str) -> String;

    /// Pick the operator and the string to bind for a pattern.
    fn lower_pattern(&self, pattern: Pattern<'_>) -> Result<(Match, String)>;

    fn render_match(&self, op: Match, column: &str, placeholder: &str) -> String;

    fn is_null(&self, column: &str) -> String {
        format!("{} IS NULL", column)
    }

    fn is_not_null(&self, column: &str) -> String {
        format!("{} IS NOT NULL", column)
    }

    fn not_equal(&self) -> &'static str {
        "<>"
    }
}

pub(crate) struct StatementWriter<'q, F: Flavor> {
    flavor: &'q F,
    query: &'q Query<'q>,
    params: ParamBuilder,
}

impl<'q, F: Flavor> StatementWriter<'q, F> {
    pub fn new(flavor: &'q F, query: &'q Query<'q>) -> Self {
        StatementWriter { flavor, query, params: ParamBuilder::new() }
    }

    pub fn into_params(self) -> Vec<BoundValue> {
        self.params.build()
    }

    pub fn column_ref(&self, column: &str) -> String {
        self.flavor.column_ref(self.query.collection().table(), column)
    }

    fn bind(&mut self, column: &str, value: JsonValue) -> String {
        let name = self.flavor.param_name(column, self.params.next_position());
        let placeholder = self.flavor.placeholder(&name);
        self.params.add(name, value);
        placeholder
    }

    fn aliased(&self, expr: String, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!("{} AS {}", expr, self.flavor.quote_alias(alias)),
            None => expr,
        }
    }

    pub fn select_list(&mut self, projection: &Projection) -> Result<String> {
        let mut parts = Vec::with_capacity(projection.items.len() + 1);
        if projection.all_columns {
            parts.push("*".to_string());
        }
        for item in &projection.items {
            let part = match item {
                SelectItem::Column { column, alias } => self.aliased(self.column_ref(column), alias.as_deref()),
                SelectItem::Aggregate { function, arg, alias } => {
                    let arg = match arg {
                        AggregateArg::All => "*".to_string(),
                        AggregateArg::Column(column) => self.column_ref(column),
                        AggregateArg::Condition(id) => self.case_when(*id)?,
                    };
                    self.aliased(format!("{}({})", function.sql_name(), arg), alias.as_deref())
                }
            };
            parts.push(part);
        }
        if parts.is_empty() {
            return Err(ApiError::InvalidArgument("The select clause leaves no columns to return".to_string()));
        }
        let distinct = if projection.distinct { "DISTINCT " } else { "" };
        Ok(format!("{}{}", distinct, parts.join(", ")))
    }

    /// Root predicates joined with AND, or `None` without a filter.
    pub fn where_clause(&mut self) -> Result<Option<String>> {
        let query = self.query;
        let roots = query.filter().roots();
        if roots.is_empty() {
            return Ok(None);
        }
        let parts = roots.iter().map(|id| self.predicate(*id)).collect::<Result<Vec<_>>>()?;
        Ok(Some(parts.join(" AND ")))
    }

    pub fn group_by(&self, columns: &[String]) -> Option<String> {
        if columns.is_empty() {
            return None;
        }
        let refs: Vec<String> = columns.iter().map(|c| self.column_ref(c)).collect();
        Some(format!("GROUP BY {}", refs.join(", ")))
    }

    pub fn order_by(&self, keys: &[SortKey]) -> Option<String> {
        if keys.is_empty() {
            return None;
        }
        let refs: Vec<String> = keys
            .iter()
            .map(|k| format!("{} {}", self.column_ref(&k.column), k.direction()))
            .collect();
        Some(format!("ORDER BY {}", refs.join(", ")))
    }

    pub fn predicate(&mut self, id: TermId) -> Result<String> {
        let query = self.query;
        let arena = query.arena();
        if arena.is_leaf(id) {
            return Err(ApiError::InvalidArgument(format!(
                "Expected a predicate but found the value '{}'",
                arena.render(id)
            )));
        }
        let children = arena.children(id);

        match arena.token(id) {
            "and" => self.join(children, " AND "),
            "or" => self.join(children, " OR "),
            "not" => Ok(format!("NOT ({})", self.join(children, " AND ")?)),
            token @ ("eq" | "ne" | "lt" | "le" | "gt" | "ge") => {
                let (property, column, raw) = self.column_value(arena, id)?;
                let negate = token == "ne";
                let sql = if matches!(token, "eq" | "ne") && raw.contains('*') {
                    self.pattern(property, &column, Pattern::Wildcard(raw))?
                } else {
                    let op = match token {
                        "lt" => "<",
                        "le" => "<=",
                        "gt" => ">",
                        "ge" => ">=",
                        _ => "=",
                    };
                    let placeholder = self.bind(property.column(), property.bind(raw)?);
                    format!("{} {} {}", column, op, placeholder)
                };
                Ok(if negate { format!("(NOT ({}))", sql) } else { sql })
            }
            token @ ("like" | "sw" | "ew" | "w" | "wo") => {
                let (property, column, raw) = self.column_value(arena, id)?;
                let pattern = match token {
                    "sw" => Pattern::StartsWith(raw),
                    "ew" => Pattern::EndsWith(raw),
                    "w" | "wo" => Pattern::Contains(raw),
                    _ => Pattern::Wildcard(raw),
                };
                let sql = self.pattern(property, &column, pattern)?;
                Ok(if token == "wo" { format!("NOT ({})", sql) } else { sql })
            }
            token @ ("in" | "out") => {
                let Some((first, values)) = children.split_first().filter(|(_, v)| !v.is_empty()) else {
                    return Err(ApiError::InvalidArgument(format!(
                        "'{}' expects a column and at least one value",
                        token
                    )));
                };
                let (property, column) = self.resolve(arena, *first)?;
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    let raw = leaf(arena, *value, token)?;
                    placeholders.push(self.bind(property.column(), property.bind(raw)?));
                }
                let op = if token == "out" { "NOT IN" } else { "IN" };
                Ok(format!("{} {}({})", column, op, placeholders.join(", ")))
            }
            token @ ("n" | "nn" | "emp" | "nemp") => {
                let [only] = children else {
                    return Err(ApiError::InvalidArgument(format!("'{}' expects exactly one column", token)));
                };
                let (_, column) = self.resolve(arena, *only)?;
                Ok(match token {
                    "n" => self.flavor.is_null(&column),
                    "nn" => self.flavor.is_not_null(&column),
                    "emp" => format!("({} IS NULL OR {} = '')", column, column),
                    _ => format!("({} IS NOT NULL AND {} {} '')", column, column, self.flavor.not_equal()),
                })
            }
            "if" => match children {
                [cond] => self.predicate(*cond),
                [cond, then] => {
                    let cond = self.predicate(*cond)?;
                    let then = self.predicate(*then)?;
                    Ok(format!("(NOT ({}) OR {})", cond, then))
                }
                [cond, then, other] => {
                    let first = self.predicate(*cond)?;
                    let then = self.predicate(*then)?;
                    let second = self.predicate(*cond)?;
                    let other = self.predicate(*other)?;
                    Ok(format!("(({} AND {}) OR (NOT ({}) AND {}))", first, then, second, other))
                }
                _ => Err(ApiError::InvalidArgument(
                    "'if' expects a condition and up to two branches".to_string(),
                )),
            },
            token => Err(ApiError::UnknownFunction { clause: "where", token: token.to_string() }),
        }
    }

    fn join(&mut self, children: &[TermId], separator: &str) -> Result<String> {
        let mut parts = children.iter().map(|c| self.predicate(*c)).collect::<Result<Vec<_>>>()?;
        match parts.len() {
            0 => Err(ApiError::InvalidArgument("Boolean functions need at least one argument".to_string())),
            1 => Ok(parts.remove(0)),
            _ => Ok(format!("({})", parts.join(separator))),
        }
    }

    fn pattern(&mut self, property: &Property, column: &str, pattern: Pattern<'_>) -> Result<String> {
        let (op, value) = self.flavor.lower_pattern(pattern)?;
        let value = match op {
            Match::Equals => property.bind(&value)?,
            _ => JsonValue::String(value),
        };
        let placeholder = self.bind(property.column(), value);
        Ok(self.flavor.render_match(op, column, &placeholder))
    }

    /// `CASE WHEN ... END` for an aggregate over `if(cond[, then, else])`.
    fn case_when(&mut self, id: TermId) -> Result<String> {
        let query = self.query;
        let arena = query.arena();
        let (cond, branches) = match arena.children(id) {
            [cond] => (*cond, None),
            [cond, then, other] => (*cond, Some((*then, *other))),
            _ => {
                return Err(ApiError::InvalidArgument(
                    "An aggregate 'if' takes a condition, optionally followed by two values".to_string(),
                ));
            }
        };
        let cond = self.predicate(cond)?;
        let (then, other) = match branches {
            None => ("1".to_string(), "0".to_string()),
            Some((then, other)) => (self.case_value(arena, then)?, self.case_value(arena, other)?),
        };
        Ok(format!("CASE WHEN {} THEN {} ELSE {} END", cond, then, other))
    }

    /// Integer literals are inlined; anything else is bound.
    fn case_value(&mut self, arena: &TermArena, id: TermId) -> Result<String> {
        let raw = leaf(arena, id, "if")?;
        if !arena.get(id).is_quoted() {
            if let Ok(n) = raw.parse::<i64>() {
                return Ok(n.to_string());
            }
        }
        Ok(self.bind("value", JsonValue::String(raw.to_string())))
    }

    fn resolve(&self, arena: &TermArena, id: TermId) -> Result<(&'q Property, String)> {
        let name = leaf(arena, id, "column")?;
        let property = self.query.collection().property(name)?;
        Ok((property, self.column_ref(property.column())))
    }

    fn column_value<'t>(&self, arena: &'t TermArena, id: TermId) -> Result<(&'q Property, String, &'t str)> {
        let [column, value] = arena.children(id) else {
            return Err(ApiError::InvalidArgument(format!(
                "'{}' expects a column and a value",
                arena.token(id)
            )));
        };
        let (property, column) = self.resolve(arena, *column)?;
        Ok((property, column, leaf(arena, *value, arena.token(id))?))
    }
}

fn leaf<'t>(arena: &'t TermArena, id: TermId, context: &str) -> Result<&'t str> {
    if arena.is_leaf(id) {
        Ok(arena.token(id))
    } else {
        Err(ApiError::InvalidArgument(format!(
            "Expected a plain value in '{}' but found '{}'",
            context,
            arena.render(id)
        )))
    }
}

/// Ascending sort over the primary index columns.
pub(crate) fn primary_sort(collection: &Collection) -> Result<Vec<SortKey>> {
    let Some(index) = collection.primary_index() else {
        return Ok(Vec::new());
    };
    Ok(collection
        .index_properties(index)?
        .into_iter()
        .map(|p| SortKey { property: p.name.clone(), column: p.column().to_string(), descending: false })
        .collect())
}

/// True when any select item aggregates.
pub(crate) fn has_aggregate(projection: &Projection) -> bool {
    projection.items.iter().any(|i| matches!(i, SelectItem::Aggregate { .. }))
}
