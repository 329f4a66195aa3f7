//! Elasticsearch query DSL compiler.
//!
//! Emits a `_search` request body. Values are typed into the body itself, so
//! `bound_values` is always empty.
//!
//! Paging uses `from`/`size` until the requested window would reach past
//! `max_window` documents (the index's `max_result_window`), or the caller
//! supplies an `after(...)` cursor. Past that point the body switches to
//! `search_after` over a total sort order.
//!
//! A `search_after` body compiled without an `after(...)` cursor has neither
//! `from` nor `search_after`, so running it as-is returns the first page. The
//! caller must walk forward with [`ElasticCompiler::cursor_from`], starting
//! at the `resume_page` carried in [`ExecutionHints::Elastic`].

use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use super::statement::primary_sort;
use super::{CompiledQuery, Compiler, ExecutionHints};
use crate::document::Node;
use crate::error::{ApiError, Result};
use crate::query::{Aggregate, AggregateArg, PageRequest, Projection, Query, SelectItem, SortKey};
use crate::rql::TermId;
use crate::schema::{Collection, Property};

const BACKEND: &str = "elastic";

/// Elasticsearch's default `index.max_result_window`.
pub const DEFAULT_MAX_WINDOW: u64 = 10_000;

const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingStrategy {
    FromSize,
    SearchAfter,
}

impl PagingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            PagingStrategy::FromSize => "from_size",
            PagingStrategy::SearchAfter => "search_after",
        }
    }
}

/// Compiles queries into `_search` request bodies.
///
/// Deep pages past `max_window` compile to a `search_after` body. Without an
/// `after(...)` cursor that body starts at the first hit; the hints tell the
/// caller where the cursor walk has to begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElasticCompiler {
    max_window: u64,
}

impl Default for ElasticCompiler {
    fn default() -> Self {
        ElasticCompiler { max_window: DEFAULT_MAX_WINDOW }
    }
}

impl ElasticCompiler {
    pub fn new(max_window: u64) -> Self {
        ElasticCompiler { max_window }
    }

    pub fn max_window(&self) -> u64 {
        self.max_window
    }

    /// Values of `last_hit` for each sort field, in sort order.
    ///
    /// Feed the result back as `after(...)` to fetch the next page. Returns
    /// `None` when the hit lacks one of the fields.
    pub fn cursor_from(sort: &[SortKey], last_hit: &Node) -> Option<Vec<String>> {
        sort.iter()
            .map(|key| {
                last_hit
                    .get(&key.column)
                    .or_else(|| last_hit.get(&key.property))
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
            })
            .collect()
    }

    /// True when from/size can't reach the requested hits.
    ///
    /// Both the page boundary and the raw offset count: `offset(9990),limit(20)`
    /// ends at hit 10010 even though page 500 of 20 ends at 10000.
    fn uses_cursor(&self, page: &PageRequest) -> bool {
        !page.after.is_empty()
            || page.page_num.saturating_mul(page.page_size) > self.max_window
            || page.offset.saturating_add(page.limit) > self.max_window
    }
}

impl Compiler for ElasticCompiler {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn compile(&self, query: &Query) -> Result<CompiledQuery> {
        let collection = query.collection();
        let projection = query.projection()?;
        if !query.group_columns(&projection)?.is_empty() {
            return Err(ApiError::unsupported(
                BACKEND,
                "Elasticsearch does not support 'group' or 'groupCount'; use count/sum/min/max aggregations.",
            ));
        }
        let page = query.page_request()?;
        let writer = DslWriter { query };

        let mut body = Map::new();
        body.insert("query".to_string(), writer.query()?);

        let (source, aggs) = writer.projection(&projection, page.limit)?;
        if !source.is_empty() {
            body.insert("_source".to_string(), json!(source));
        }

        let strategy;
        let mut resume_page = None;
        if !aggs.is_empty() && source.is_empty() && !projection.all_columns {
            // aggregation only: no hits wanted
            strategy = PagingStrategy::FromSize;
            body.insert("size".to_string(), json!(0));
        } else if self.uses_cursor(&page) {
            strategy = PagingStrategy::SearchAfter;
            resume_page = Some(self.max_window / page.page_size.max(1));

            let sort = cursor_sort(query)?;
            body.insert("sort".to_string(), sort_json(&sort));
            body.insert("size".to_string(), json!(page.page_size));
            if !page.after.is_empty() {
                body.insert("search_after".to_string(), search_after(collection, &sort, &page.after)?);
            }
        } else {
            strategy = PagingStrategy::FromSize;
            let sort = query.sort_keys()?;
            if !sort.is_empty() {
                body.insert("sort".to_string(), sort_json(&sort));
            }
            body.insert("from".to_string(), json!(page.offset));
            body.insert("size".to_string(), json!(page.limit));
        }
        if !aggs.is_empty() {
            body.insert("aggs".to_string(), JsonValue::Object(aggs));
        }

        let body = JsonValue::Object(body);
        let text = format!("{:#}", body);
        let debug = format!("Elasticsearch: POST /{}/_search {}", collection.table(), body);
        debug!(collection = %collection.name, strategy = ?strategy, "compiled elasticsearch query");

        Ok(CompiledQuery {
            backend: BACKEND,
            text,
            bound_values: Vec::new(),
            debug,
            dry_run: query.is_dry_run(),
            page,
            hints: ExecutionHints::Elastic { strategy, resume_page },
        })
    }
}

/// Explicit sort, else the primary index, else `_id`: a cursor needs a total order.
fn cursor_sort(query: &Query) -> Result<Vec<SortKey>> {
    let mut sort = query.sort_keys()?;
    if sort.is_empty() {
        sort = primary_sort(query.collection())?;
    }
    if sort.is_empty() {
        sort.push(SortKey { property: ID_FIELD.to_string(), column: ID_FIELD.to_string(), descending: false });
    }
    Ok(sort)
}

fn sort_json(sort: &[SortKey]) -> JsonValue {
    JsonValue::Array(
        sort.iter()
            .map(|k| field(&k.column, json!({ "order": if k.descending { "desc" } else { "asc" } })))
            .collect(),
    )
}

fn search_after(collection: &Collection, sort: &[SortKey], after: &[String]) -> Result<JsonValue> {
    if after.len() != sort.len() {
        return Err(ApiError::InvalidArgument(format!(
            "'after' needs one value per sort field ({}), got {}",
            sort.len(),
            after.len()
        )));
    }
    let mut values = Vec::with_capacity(after.len());
    for (key, raw) in sort.iter().zip(after) {
        if key.column == ID_FIELD {
            values.push(JsonValue::String(raw.clone()));
        } else {
            values.push(collection.property(&key.property)?.bind(raw)?);
        }
    }
    Ok(JsonValue::Array(values))
}

/// `{ name: value }`
fn field(name: &str, value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    JsonValue::Object(map)
}

fn must_not(clauses: Vec<JsonValue>) -> JsonValue {
    json!({ "bool": { "must_not": clauses } })
}

fn wildcard(column: &str, pattern: String) -> JsonValue {
    field("wildcard", field(column, json!({ "value": pattern })))
}

fn exists(column: &str) -> JsonValue {
    json!({ "exists": { "field": column } })
}

struct DslWriter<'q> {
    query: &'q Query<'q>,
}

impl<'q> DslWriter<'q> {
    fn query(&self) -> Result<JsonValue> {
        let roots = self.query.filter().roots();
        let mut clauses = roots.iter().map(|id| self.clause(*id)).collect::<Result<Vec<_>>>()?;
        Ok(match clauses.len() {
            0 => json!({ "match_all": {} }),
            1 => clauses.remove(0),
            _ => json!({ "bool": { "must": clauses } }),
        })
    }

    /// Source fields and named aggregations for the select clause.
    fn projection(&self, projection: &Projection, bucket_size: u64) -> Result<(Vec<String>, Map<String, JsonValue>)> {
        let mut source = Vec::new();
        let mut aggs = Map::new();
        for item in &projection.items {
            match item {
                SelectItem::Column { alias: Some(_), .. } => {
                    return Err(ApiError::unsupported(BACKEND, "Elasticsearch does not support the 'as' function."));
                }
                SelectItem::Column { column, alias: None } if projection.distinct => {
                    aggs.insert(
                        format!("distinct_{}", column),
                        json!({ "terms": { "field": column, "size": bucket_size } }),
                    );
                }
                SelectItem::Column { column, alias: None } => source.push(column.clone()),
                SelectItem::Aggregate { function, arg, alias } => {
                    let (name, agg) = self.aggregate(*function, arg)?;
                    aggs.insert(alias.clone().unwrap_or(name), agg);
                }
            }
        }
        Ok((source, aggs))
    }

    fn aggregate(&self, function: Aggregate, arg: &AggregateArg) -> Result<(String, JsonValue)> {
        let metric = match function {
            Aggregate::Count => "value_count",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        };
        match arg {
            AggregateArg::All => Ok(("count".to_string(), field(metric, json!({ "field": ID_FIELD })))),
            AggregateArg::Column(column) => Ok((
                format!("{}_{}", function.name(), column),
                field(metric, json!({ "field": column })),
            )),
            // a filter bucket's doc_count is count(if(c)) and sum(if(c))
            AggregateArg::Condition(id) if matches!(function, Aggregate::Count | Aggregate::Sum) => {
                let arena = self.query.arena();
                match arena.children(*id) {
                    [cond] => Ok((function.name().to_string(), json!({ "filter": self.clause(*cond)? }))),
                    _ => Err(ApiError::unsupported(
                        BACKEND,
                        "Elasticsearch only supports if(condition) without branch values in aggregates.",
                    )),
                }
            }
            AggregateArg::Condition(_) => Err(ApiError::unsupported(
                BACKEND,
                format!("Elasticsearch does not support {}(if(...)).", function.name()),
            )),
        }
    }

    fn clause(&self, id: TermId) -> Result<JsonValue> {
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
            "and" => Ok(json!({ "bool": { "must": self.clauses(children)? } })),
            "or" => Ok(json!({ "bool": { "should": self.clauses(children)?, "minimum_should_match": 1 } })),
            "not" => Ok(must_not(self.clauses(children)?)),
            token @ ("eq" | "ne" | "like") => {
                let (property, raw) = self.column_value(id)?;
                let clause = if raw.contains('*') {
                    wildcard(property.column(), raw.to_string())
                } else if token == "like" {
                    field("term", field(property.column(), JsonValue::String(raw.to_string())))
                } else {
                    field("term", field(property.column(), property.bind(raw)?))
                };
                Ok(if token == "ne" { must_not(vec![clause]) } else { clause })
            }
            token @ ("lt" | "le" | "gt" | "ge") => {
                let (property, raw) = self.column_value(id)?;
                let op = match token {
                    "lt" => "lt",
                    "le" => "lte",
                    "gt" => "gt",
                    _ => "gte",
                };
                Ok(field("range", field(property.column(), field(op, property.bind(raw)?))))
            }
            "sw" => {
                let (property, raw) = self.column_value(id)?;
                Ok(wildcard(property.column(), format!("{}*", raw)))
            }
            "ew" => {
                let (property, raw) = self.column_value(id)?;
                Ok(wildcard(property.column(), format!("*{}", raw)))
            }
            "w" => {
                let (property, raw) = self.column_value(id)?;
                Ok(wildcard(property.column(), format!("*{}*", raw)))
            }
            "wo" => Err(ApiError::unsupported(
                BACKEND,
                "Elasticsearch supports 'w' but not 'wo'; use not(w(...)) instead.",
            )),
            token @ ("in" | "out") => {
                let Some((first, values)) = children.split_first().filter(|(_, v)| !v.is_empty()) else {
                    return Err(ApiError::InvalidArgument(format!(
                        "'{}' expects a column and at least one value",
                        token
                    )));
                };
                let property = self.property(*first)?;
                let mut typed = Vec::with_capacity(values.len());
                for value in values {
                    typed.push(property.bind(self.leaf(*value)?)?);
                }
                let clause = field("terms", field(property.column(), JsonValue::Array(typed)));
                Ok(if token == "out" { must_not(vec![clause]) } else { clause })
            }
            token @ ("n" | "nn" | "emp" | "nemp") => {
                let [only] = children else {
                    return Err(ApiError::InvalidArgument(format!("'{}' expects exactly one column", token)));
                };
                let column = self.property(*only)?.column();
                let blank = field("term", field(column, json!("")));
                Ok(match token {
                    "n" => must_not(vec![exists(column)]),
                    "nn" => exists(column),
                    "emp" => json!({ "bool": { "should": [must_not(vec![exists(column)]), blank], "minimum_should_match": 1 } }),
                    _ => json!({ "bool": { "must": [exists(column)], "must_not": [blank] } }),
                })
            }
            "if" => match children {
                [cond] => self.clause(*cond),
                [cond, then] => Ok(json!({
                    "bool": {
                        "should": [must_not(vec![self.clause(*cond)?]), self.clause(*then)?],
                        "minimum_should_match": 1
                    }
                })),
                [cond, then, other] => {
                    let cond = self.clause(*cond)?;
                    Ok(json!({
                        "bool": {
                            "should": [
                                { "bool": { "must": [cond.clone(), self.clause(*then)?] } },
                                { "bool": { "must_not": [cond], "must": [self.clause(*other)?] } }
                            ],
                            "minimum_should_match": 1
                        }
                    }))
                }
                _ => Err(ApiError::InvalidArgument(
                    "'if' expects a condition and up to two branches".to_string(),
                )),
            },
            token => Err(ApiError::UnknownFunction { clause: "where", token: token.to_string() }),
        }
    }

    fn clauses(&self, children: &[TermId]) -> Result<Vec<JsonValue>> {
        if children.is_empty() {
            return Err(ApiError::InvalidArgument("Boolean functions need at least one argument".to_string()));
        }
        children.iter().map(|c| self.clause(*c)).collect()
    }

    fn leaf(&self, id: TermId) -> Result<&'q str> {
        let arena = self.query.arena();
        if arena.is_leaf(id) {
            Ok(arena.token(id))
        } else {
            Err(ApiError::InvalidArgument(format!("Expected a plain value but found '{}'", arena.render(id))))
        }
    }

    fn property(&self, id: TermId) -> Result<&'q Property> {
        self.query.collection().property(self.leaf(id)?)
    }

    fn column_value(&self, id: TermId) -> Result<(&'q Property, &'q str)> {
        let arena = self.query.arena();
        let [column, value] = arena.children(id) else {
            return Err(ApiError::InvalidArgument(format!(
                "'{}' expects a column and a value",
                arena.token(id)
            )));
        };
        Ok((self.property(*column)?, self.leaf(*value)?))
    }
}
