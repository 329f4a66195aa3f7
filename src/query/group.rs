//! Group clause builder.

use super::clause::{leaf_args, Clause, ClauseKind};
use crate::error::Result;
use crate::rql::{TermArena, TermId};
use crate::schema::Collection;

#[derive(Debug, Clone)]
pub struct Group {
    clause: Clause,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Group {
    pub fn new() -> Self {
        Group { clause: Clause::new(ClauseKind::Group) }
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

    /// Physical columns of every `group(...)` term, in order, without duplicates.
    pub fn columns(&self, arena: &TermArena, collection: &Collection) -> Result<Vec<String>> {
        let mut columns: Vec<String> = Vec::new();
        for id in self.roots() {
            for name in leaf_args(arena, *id)? {
                let column = collection.property(name)?.column().to_string();
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::rql::parse;

    #[test]
    fn test_columns_resolved_and_deduplicated() {
        let collection = fixtures::orders();
        let mut arena = TermArena::new();
        let mut group = Group::new();
        for root in parse(&mut arena, "group(SHIPCOUNTRY,shipCity),group(shipCountry)").unwrap() {
            group.push(&arena, root).unwrap();
        }
        assert_eq!(group.columns(&arena, &collection).unwrap(), vec!["shipCountry", "shipCity"]);
    }

    #[test]
    fn test_unknown_column() {
        let collection = fixtures::orders();
        let mut arena = TermArena::new();
        let mut group = Group::new();
        let root = parse(&mut arena, "group(nope)").unwrap()[0];
        group.push(&arena, root).unwrap();
        assert_eq!(group.columns(&arena, &collection).unwrap_err().status().code(), 404);
    }
}
