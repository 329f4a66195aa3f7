//! Select clause builder: projections, aliases and aggregates.

use std::sync::LazyLock;

use regex::Regex;

use super::clause::{leaf_args, Clause, ClauseKind};
use crate::error::{ApiError, Result};
use crate::rql::{TermArena, TermId};
use crate::schema::Collection;

static ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_ .\-]*$").expect("alias pattern"));

/// Aggregate functions shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn from_token(token: &str) -> Option<Aggregate> {
        match token {
            "count" => Some(Aggregate::Count),
            "sum" => Some(Aggregate::Sum),
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            _ => None,
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

/// What an aggregate runs over.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    /// `count(*)`
    All,
    /// Physical column name
    Column(String),
    /// `if(...)` term evaluated per row
    Condition(TermId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Column { column: String, alias: Option<String> },
    Aggregate { function: Aggregate, arg: AggregateArg, alias: Option<String> },
}

/// Resolved select list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Nothing narrows the row: emit every column plus any aliased extras
    pub all_columns: bool,
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    /// Physical columns named by `excludes(...)`
    pub excludes: Vec<String>,
    /// Physical columns implied by `groupcount(...)`
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Select {
    clause: Clause,
}

impl Default for Select {
    fn default() -> Self {
        Self::new()
    }
}

impl Select {
    pub fn new() -> Self {
        Select { clause: Clause::new(ClauseKind::Select) }
    }

    pub fn roots(&self) -> &[TermId] {
        self.clause.roots()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    pub fn push(&mut self, arena: &TermArena, id: TermId) -> Result<()> {
        self.clause.push(arena, id)
    }

    /// Resolve every select term against `collection`.
    pub fn projection(&self, arena: &TermArena, collection: &Collection) -> Result<Projection> {
        let mut projection = Projection { all_columns: true, ..Projection::default() };
        let mut narrowed = false;

        for id in self.roots() {
            let token = arena.token(*id);
            match token {
                "includes" => {
                    narrowed = true;
                    for name in leaf_args(arena, *id)? {
                        let column = collection.property(name)?.column().to_string();
                        projection.items.push(SelectItem::Column { column, alias: None });
                    }
                }
                "excludes" => {
                    narrowed = true;
                    for name in leaf_args(arena, *id)? {
                        projection.excludes.push(collection.property(name)?.column().to_string());
                    }
                }
                "distinct" => {
                    narrowed = true;
                    projection.distinct = true;
                    for name in leaf_args(arena, *id)? {
                        let column = collection.property(name)?.column().to_string();
                        projection.items.push(SelectItem::Column { column, alias: None });
                    }
                }
                "as" => {
                    let args = leaf_args(arena, *id)?;
                    let [name, alias] = args.as_slice() else {
                        return Err(ApiError::InvalidArgument(
                            "'as' takes a column and an alias".to_string(),
                        ));
                    };
                    let column = collection.property(name)?.column().to_string();
                    projection.items.push(SelectItem::Column { column, alias: Some(alias_arg(alias)?) });
                }
                "groupcount" => {
                    narrowed = true;
                    let args = leaf_args(arena, *id)?;
                    let (name, alias) = match args.as_slice() {
                        [name] => (*name, "count".to_string()),
                        [name, alias] => (*name, alias_arg(alias)?),
                        _ => {
                            return Err(ApiError::InvalidArgument(
                                "'groupCount' takes a column and an optional alias".to_string(),
                            ));
                        }
                    };
                    let column = collection.property(name)?.column().to_string();
                    projection.items.push(SelectItem::Column { column: column.clone(), alias: None });
                    projection.items.push(SelectItem::Aggregate {
                        function: Aggregate::Count,
                        arg: AggregateArg::All,
                        alias: Some(alias),
                    });
                    projection.group_by.push(column);
                }
                _ => {
                    let Some(function) = Aggregate::from_token(token) else {
                        return Err(ApiError::UnknownFunction { clause: "select", token: token.to_string() });
                    };
                    narrowed = true;
                    projection.items.push(aggregate(arena, collection, *id, function)?);
                }
            }
        }

        if narrowed {
            projection.all_columns = false;
        }
        if !projection.excludes.is_empty() && !projection.items.iter().any(is_plain_column) {
            let kept: Vec<SelectItem> = collection
                .properties
                .iter()
                .map(|p| p.column().to_string())
                .filter(|c| !projection.excludes.contains(c))
                .map(|column| SelectItem::Column { column, alias: None })
                .collect();
            projection.items.splice(0..0, kept);
        }
        Ok(projection)
    }
}

fn is_plain_column(item: &SelectItem) -> bool {
    matches!(item, SelectItem::Column { alias: None, .. })
}

fn aggregate(arena: &TermArena, collection: &Collection, id: TermId, function: Aggregate) -> Result<SelectItem> {
    let children = arena.children(id);
    let (target, alias) = match children {
        [target] => (*target, None),
        [target, alias] if arena.is_leaf(*alias) => (*target, Some(alias_arg(arena.token(*alias))?)),
        _ => {
            return Err(ApiError::InvalidArgument(format!(
                "'{}' takes a column or if(...) and an optional alias",
                function.name()
            )));
        }
    };

    let arg = if !arena.is_leaf(target) {
        if arena.token(target) != "if" {
            return Err(ApiError::InvalidArgument(format!(
                "'{}' only accepts a column, '*' or if(...)",
                function.name()
            )));
        }
        AggregateArg::Condition(target)
    } else if arena.token(target) == "*" || arena.token(target) == "1" {
        if function != Aggregate::Count {
            return Err(ApiError::InvalidArgument(format!("'{}(*)' is not supported", function.name())));
        }
        AggregateArg::All
    } else {
        AggregateArg::Column(collection.property(arena.token(target))?.column().to_string())
    };

    Ok(SelectItem::Aggregate { function, arg, alias })
}

fn alias_arg(alias: &str) -> Result<String> {
    if ALIAS.is_match(alias) {
        Ok(alias.to_string())
    } else {
        Err(ApiError::InvalidArgument(format!("Invalid alias '{}'", alias)))
    }
}
