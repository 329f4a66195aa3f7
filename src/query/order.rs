//! Order clause builder.
//!
//! `sort(-shipCountry,+shipCity,orderID)`: a leading `-` sorts descending, a
//! leading `+` or nothing ascending. `order(...)` is accepted as a synonym.

use serde::Serialize;

use super::clause::{leaf_args, Clause, ClauseKind};
use crate::error::{ApiError, Result};
use crate::rql::{TermArena, TermId};
use crate::schema::Collection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    /// Logical property name
    pub property: String,
    /// Physical column name
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    clause: Clause,
}

impl Default for Order {
    fn default() -> Self {
        Self::new()
    }
}

impl Order {
    pub fn new() -> Self {
        Order { clause: Clause::new(ClauseKind::Order) }
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

    pub fn sort_keys(&self, arena: &TermArena, collection: &Collection) -> Result<Vec<SortKey>> {
        let mut keys = Vec::new();
        for id in self.roots() {
            for arg in leaf_args(arena, *id)? {
                let arg = arg.trim();
                let (name, descending) = match arg.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (arg.strip_prefix('+').unwrap_or(arg), false),
                };
                if name.is_empty() {
                    return Err(ApiError::InvalidArgument(format!("Empty sort key in '{}'", arena.render(*id))));
                }
                let property = collection.property(name)?;
                keys.push(SortKey {
                    property: property.name.clone(),
                    column: property.column().to_string(),
                    descending,
                });
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::rql::parse;

    fn keys(rql: &str) -> Result<Vec<(String, bool)>> {
        let collection = fixtures::orders();
        let mut arena = TermArena::new();
        let mut order = Order::new();
        for root in parse(&mut arena, rql)? {
            order.push(&arena, root)?;
        }
        Ok(order
            .sort_keys(&arena, &collection)?
            .into_iter()
            .map(|k| (k.column, k.descending))
            .collect())
    }

    #[test]
    fn test_directions() {
        assert_eq!(
            keys("sort(-shipCountry,+shipCity,orderid)").unwrap(),
            vec![
                ("shipCountry".to_string(), true),
                ("shipCity".to_string(), false),
                ("orderID".to_string(), false)
            ]
        );
    }

    #[test]
    fn test_order_is_a_synonym() {
        assert_eq!(
            keys("order(shipCountry,-shipCity)").unwrap(),
            vec![("shipCountry".to_string(), false), ("shipCity".to_string(), true)]
        );
    }

    #[test]
    fn test_bad_keys() {
        assert!(matches!(keys("sort(-)"), Err(ApiError::InvalidArgument(_))));
        assert!(matches!(keys("sort(nope)"), Err(ApiError::UnknownProperty { .. })));
    }
}
