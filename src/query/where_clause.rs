//! Where clause builder with `_key()` expansion.
//!
//! `_key(index, value, ...)` is shorthand for "the entities with these keys".
//! It is rewritten into ordinary predicates over the index columns before any
//! compiler sees it:
//!
//! ```text
//! _key(pk,5)              -> eq(orderID,5)
//! _key(pk,5,6)            -> in(orderID,5,6)
//! _key(pk2,'1~2')         -> and(eq(a,1),eq(b,2))
//! _key(pk2,'1~2','3~4')   -> or(and(eq(a,1),eq(b,2)),and(eq(a,3),eq(b,4)))
//! ```

use tracing::debug;

use super::clause::{Clause, ClauseKind};
use crate::error::{ApiError, Result};
use crate::rql::{TermArena, TermId};
use crate::schema::Collection;

#[derive(Debug, Clone)]
pub struct Where {
    clause: Clause,
}

impl Default for Where {
    fn default() -> Self {
        Self::new()
    }
}

impl Where {
    pub fn new() -> Self {
        Where { clause: Clause::new(ClauseKind::Where) }
    }

    pub fn roots(&self) -> &[TermId] {
        self.clause.roots()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// Validate, expand `_key()` terms, and add the result as one or more roots.
    ///
    /// A root `and` is unwrapped: its children become separate roots, which
    /// compilers join with AND anyway.
    pub fn push(&mut self, arena: &mut TermArena, collection: &Collection, id: TermId) -> Result<()> {
        self.clause.validate(arena, id)?;
        let id = expand_keys(arena, collection, id)?;

        if arena.token(id) == "and" {
            for child in arena.children(id).to_vec() {
                arena.detach(child);
                self.clause.push_unchecked(child);
            }
        } else {
            self.clause.push_unchecked(id);
        }
        Ok(())
    }
}

/// Rewrite every `_key` below and including `id`; returns the (possibly new) root.
fn expand_keys(arena: &mut TermArena, collection: &Collection, id: TermId) -> Result<TermId> {
    for child in arena.children(id).to_vec() {
        if arena.is_leaf(child) {
            continue;
        }
        let expanded = expand_keys(arena, collection, child)?;
        if expanded != child {
            arena.replace_child(id, child, expanded);
        }
    }

    if arena.token(id) != "_key" {
        return Ok(id);
    }

    let expanded = expand_key(arena, collection, id)?;
    debug!(from = %arena.display(id), to = %arena.display(expanded), "expanded _key");
    Ok(expanded)
}

fn expand_key(arena: &mut TermArena, collection: &Collection, id: TermId) -> Result<TermId> {
    let children = arena.children(id).to_vec();
    let Some((name, values)) = children.split_first() else {
        return Err(arity_error());
    };
    if values.is_empty() {
        return Err(arity_error());
    }

    let index_name = arena.token(*name).to_string();
    let index = collection
        .index(&index_name)
        .ok_or_else(|| ApiError::UnknownIndex {
            collection: collection.name.clone(),
            index: index_name.clone(),
        })?;

    for value in values {
        if !arena.is_leaf(*value) {
            return Err(ApiError::InvalidArgument(format!(
                "Entity key value is not a leaf node: {}",
                arena.render(*value)
            )));
        }
    }

    if let [column] = index.columns.as_slice() {
        let mut args = vec![arena.leaf(column.clone(), false)];
        for value in values {
            let term = arena.get(*value);
            let (token, quoted) = (term.token().to_string(), term.is_quoted());
            args.push(arena.leaf(token, quoted));
        }
        let token = if args.len() == 2 { "eq" } else { "in" };
        return Ok(arena.function(token, args));
    }

    let mut branches = Vec::with_capacity(values.len());
    for value in values {
        let key = arena.token(*value).to_string();
        let pairs: Vec<(String, String)> = collection
            .decode_key(index, &key)?
            .into_iter()
            .map(|(property, part)| (property.name.clone(), part))
            .collect();

        let mut predicates = Vec::with_capacity(pairs.len());
        for (property, part) in pairs {
            let column = arena.leaf(property, false);
            let value = arena.leaf(part, true);
            predicates.push(arena.function("eq", vec![column, value]));
        }
        branches.push(arena.function("and", predicates));
    }

    if branches.len() == 1 {
        return Ok(branches[0]);
    }
    Ok(arena.function("or", branches))
}

fn arity_error() -> ApiError {
    ApiError::InvalidArgument("_key() needs an index name and at least one key value".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::rql::parse;
    use rstest::rstest;

    fn expand(rql: &str) -> Result<Vec<String>> {
        let collection = fixtures::order_details();
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, rql)?;
        let mut clause = Where::new();
        for root in roots {
            clause.push(&mut arena, &collection, root)?;
        }
        Ok(clause.roots().iter().map(|r| arena.render(*r)).collect())
    }

    #[rstest]
    #[case("_key(byOrder,5)", vec!["eq(orderID,5)"])]
    #[case("_key(byOrder,5,6)", vec!["in(orderID,5,6)"])]
    #[case("_key(BYORDER,'5')", vec!["eq(orderID,'5')"])]
    #[case("_key(pk,'10248~11')", vec!["eq(orderID,'10248')", "eq(productID,'11')"])]
    #[case(
        "_key(pk,'1~2','3~4')",
        vec!["or(and(eq(orderID,'1'),eq(productID,'2')),and(eq(orderID,'3'),eq(productID,'4')))"]
    )]
    #[case("not(_key(byOrder,5))", vec!["not(eq(orderID,5))"])]
    #[case("or(eq(quantity,1),_key(pk,'1~2'))", vec!["or(eq(quantity,1),and(eq(orderID,'1'),eq(productID,'2')))"])]
    #[case("and(eq(quantity,1),eq(quantity,2))", vec!["eq(quantity,1)", "eq(quantity,2)"])]
    fn test_key_expansion(#[case] rql: &str, #[case] expected: Vec<&str>) {
        assert_eq!(expand(rql).unwrap(), expected);
    }

    #[test]
    fn test_unknown_index_is_client_error() {
        let err = expand("_key(nope,1)").unwrap_err();
        assert!(matches!(err, ApiError::UnknownIndex { .. }));
        assert_eq!(err.status().code(), 400);
        assert!(err.to_string().contains("has an index named 'nope'"), "{}", err);
        assert!(!err.to_string().contains("unique"));
    }

    #[test]
    fn test_malformed_compound_key() {
        let err = expand("_key(pk,'10248')").unwrap_err();
        assert!(matches!(err, ApiError::KeyArity { expected: 2, actual: 1, .. }));
        assert_eq!(err.status().code(), 400);
    }

    #[rstest]
    #[case("_key(pk)")]
    #[case("_key(pk,eq(a,b))")]
    fn test_bad_key_arguments(#[case] rql: &str) {
        assert!(matches!(expand(rql), Err(ApiError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_where_token_rejected() {
        let err = expand("sort(a)").unwrap_err();
        assert_eq!(err.to_string(), "Invalid where function token 'sort'");
    }
}
