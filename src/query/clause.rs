//! Clause kinds, their function whitelists, and the shared root-term holder.

use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::rql::{TermArena, TermId};

pub const SELECT_FUNCTIONS: &[&str] = &[
    "includes", "excludes", "as", "distinct", "count", "sum", "min", "max", "groupcount",
];

pub const WHERE_FUNCTIONS: &[&str] = &[
    "_key", "and", "or", "not", "eq", "ne", "n", "nn", "like", "sw", "ew", "lt", "le", "gt", "ge",
    "in", "out", "if", "w", "wo", "emp", "nemp",
];

pub const GROUP_FUNCTIONS: &[&str] = &["group"];

pub const ORDER_FUNCTIONS: &[&str] = &["sort", "order"];

pub const PAGE_FUNCTIONS: &[&str] = &["page", "pagenum", "pagesize", "limit", "offset", "after"];

/// The five buckets a query's terms are routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseKind {
    Select,
    Where,
    Group,
    Order,
    Page,
}

impl ClauseKind {
    /// Routing order when a term arrives without a clause hint.
    pub const ALL: [ClauseKind; 5] = [
        ClauseKind::Select,
        ClauseKind::Where,
        ClauseKind::Group,
        ClauseKind::Order,
        ClauseKind::Page,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClauseKind::Select => "select",
            ClauseKind::Where => "where",
            ClauseKind::Group => "group",
            ClauseKind::Order => "order",
            ClauseKind::Page => "page",
        }
    }

    pub fn functions(&self) -> &'static [&'static str] {
        match self {
            ClauseKind::Select => SELECT_FUNCTIONS,
            ClauseKind::Where => WHERE_FUNCTIONS,
            ClauseKind::Group => GROUP_FUNCTIONS,
            ClauseKind::Order => ORDER_FUNCTIONS,
            ClauseKind::Page => PAGE_FUNCTIONS,
        }
    }

    pub fn accepts(&self, token: &str) -> bool {
        self.functions().contains(&token)
    }

    /// Functions allowed below a root. Aggregates take `if(...)` conditions, so
    /// select also admits the where functions.
    fn accepts_nested(&self, token: &str) -> bool {
        match self {
            ClauseKind::Select => SELECT_FUNCTIONS.contains(&token) || WHERE_FUNCTIONS.contains(&token),
            ClauseKind::Where => WHERE_FUNCTIONS.contains(&token),
            _ => false,
        }
    }

    /// First clause, in routing order, whose whitelist holds `token`.
    pub fn for_token(token: &str) -> Option<ClauseKind> {
        ClauseKind::ALL.into_iter().find(|k| k.accepts(token))
    }
}

/// True when `token` is a function of any clause.
pub fn is_function(token: &str) -> bool {
    ClauseKind::for_token(token).is_some()
}

/// Ordered root terms of one clause, each checked against the clause whitelist.
#[derive(Debug, Clone)]
pub struct Clause {
    kind: ClauseKind,
    roots: Vec<TermId>,
}

impl Clause {
    pub fn new(kind: ClauseKind) -> Self {
        Clause { kind, roots: Vec::new() }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    pub fn roots(&self) -> &[TermId] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Check the root token and every nested function token.
    pub fn validate(&self, arena: &TermArena, id: TermId) -> Result<()> {
        if arena.is_leaf(id) || !self.kind.accepts(arena.token(id)) {
            return Err(self.unknown(arena, id));
        }
        self.validate_nested(arena, id)
    }

    fn validate_nested(&self, arena: &TermArena, id: TermId) -> Result<()> {
        for child in arena.children(id) {
            if arena.is_leaf(*child) {
                continue;
            }
            if !self.kind.accepts_nested(arena.token(*child)) {
                return Err(self.unknown(arena, *child));
            }
            self.validate_nested(arena, *child)?;
        }
        Ok(())
    }

    fn unknown(&self, arena: &TermArena, id: TermId) -> ApiError {
        ApiError::UnknownFunction {
            clause: self.kind.name(),
            token: arena.token(id).to_string(),
        }
    }

    pub fn push(&mut self, arena: &TermArena, id: TermId) -> Result<()> {
        self.validate(arena, id)?;
        self.roots.push(id);
        Ok(())
    }

    /// Append without validation; callers have already validated an ancestor.
    pub(crate) fn push_unchecked(&mut self, id: TermId) {
        self.roots.push(id);
    }
}

/// Leaf tokens of `id`'s children; fails on any nested function.
pub(crate) fn leaf_args(arena: &TermArena, id: TermId) -> Result<Vec<&str>> {
    arena
        .children(id)
        .iter()
        .map(|c| {
            if arena.is_leaf(*c) {
                Ok(arena.token(*c))
            } else {
                Err(ApiError::InvalidArgument(format!(
                    "'{}' only takes plain values, found '{}'",
                    arena.token(id),
                    arena.render(*c)
                )))
            }
        })
        .collect()
}

/// Exactly one non-negative integer argument.
pub(crate) fn integer_arg(arena: &TermArena, id: TermId) -> Result<u64> {
    let args = leaf_args(arena, id)?;
    let [value] = args.as_slice() else {
        return Err(ApiError::InvalidArgument(format!(
            "'{}' takes exactly one value",
            arena.token(id)
        )));
    };
    value.trim().parse::<u64>().map_err(|_| {
        ApiError::InvalidArgument(format!(
            "'{}' expects a non-negative integer, got '{}'",
            arena.token(id),
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rql::parse;
    use rstest::rstest;

    #[rstest]
    #[case("eq", Some(ClauseKind::Where))]
    #[case("count", Some(ClauseKind::Select))]
    #[case("group", Some(ClauseKind::Group))]
    #[case("sort", Some(ClauseKind::Order))]
    #[case("pagesize", Some(ClauseKind::Page))]
    #[case("if", Some(ClauseKind::Where))]
    #[case("foo", None)]
    fn test_for_token(#[case] token: &str, #[case] expected: Option<ClauseKind>) {
        assert_eq!(ClauseKind::for_token(token), expected);
    }

    #[test]
    fn test_whitelist_enforced_per_clause() {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, "foo(a,b),sort(a)").unwrap();

        let mut clause = Clause::new(ClauseKind::Where);
        let err = clause.push(&arena, roots[0]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid where function token 'foo'");
        assert_eq!(err.status().code(), 400);

        assert!(clause.push(&arena, roots[1]).is_err());
        let mut order = Clause::new(ClauseKind::Order);
        assert!(order.push(&arena, roots[1]).is_ok());
        assert_eq!(order.roots(), &[roots[1]]);
    }

    #[test]
    fn test_nested_tokens_validated() {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, "and(eq(a,1),bogus(b)),sum(if(eq(a,1)),total)").unwrap();

        let mut where_clause = Clause::new(ClauseKind::Where);
        let err = where_clause.push(&arena, roots[0]).unwrap_err();
        assert!(err.to_string().contains("'bogus'"));

        let mut select = Clause::new(ClauseKind::Select);
        assert!(select.push(&arena, roots[1]).is_ok());
    }

    #[test]
    fn test_leaf_root_rejected() {
        let mut arena = TermArena::new();
        let leaf = arena.leaf("eq", false);
        assert!(Clause::new(ClauseKind::Where).push(&arena, leaf).is_err());
    }

    #[rstest]
    #[case("limit(10)", Ok(10))]
    #[case("limit(-1)", Err(()))]
    #[case("limit(1,2)", Err(()))]
    #[case("limit(eq(a,b))", Err(()))]
    fn test_integer_arg(#[case] rql: &str, #[case] expected: std::result::Result<u64, ()>) {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, rql).unwrap();
        assert_eq!(integer_arg(&arena, roots[0]).map_err(|_| ()), expected);
    }
}
