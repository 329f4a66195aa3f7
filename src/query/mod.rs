//! Query object model.
//!
//! A [`Query`] owns the term arena for one request against one collection and
//! routes each parsed term into one of five clause builders:
//!
//! 1. [`Select`] - projections and aggregates
//! 2. [`Where`] - predicates, with `_key()` expansion
//! 3. [`Group`] - grouping columns
//! 4. [`Order`] - sort keys
//! 5. [`Page`] - offset/limit/cursor
//!
//! Backend compilers read the builders; they never mutate the query.
//!
//! # Example
//!
//! ```ignore
//! let collection = schema.collection("orders")?;
//! let query = Query::parse(collection, "eq(shipCountry,France),sort(-orderDate)")?;
//! let compiled = query.compile(&Backend::Sql(SqlCompiler::default()))?;
//! ```

pub mod clause;
pub mod group;
pub mod order;
pub mod page;
pub mod select;
pub mod where_clause;

pub use clause::{is_function, Clause, ClauseKind};
pub use group::Group;
pub use order::{Order, SortKey};
pub use page::{Page, PageRequest, PagingDefaults};
pub use select::{Aggregate, AggregateArg, Projection, Select, SelectItem};
pub use where_clause::Where;

use tracing::debug;

use crate::compilers::{Backend, CompiledQuery, Compiler};
use crate::error::{ApiError, Result};
use crate::rql::{self, TermArena, TermId};
use crate::schema::{Collection, Schema};

#[derive(Debug, Clone)]
pub struct Query<'a> {
    collection: &'a Collection,
    arena: TermArena,
    select: Select,
    filter: Where,
    group: Group,
    order: Order,
    page: Page,
    paging: PagingDefaults,
    dry_run: bool,
}

impl<'a> Query<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Query {
            collection,
            arena: TermArena::new(),
            select: Select::new(),
            filter: Where::new(),
            group: Group::new(),
            order: Order::new(),
            page: Page::new(),
            paging: PagingDefaults::default(),
            dry_run: false,
        }
    }

    /// Build a query from a raw RQL string.
    pub fn parse(collection: &'a Collection, rql: &str) -> Result<Self> {
        let mut query = Query::new(collection);
        query.add_rql(rql)?;
        Ok(query)
    }

    /// Look the collection up in `schema` and parse `rql` against it.
    pub fn for_collection(schema: &'a Schema, collection: &str, rql: &str) -> Result<Self> {
        Query::parse(schema.collection(collection)?, rql)
    }

    pub fn with_paging(mut self, paging: PagingDefaults) -> Self {
        self.paging = paging;
        self
    }

    /// Mark the query as explain-only: compiled but never executed.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn add_rql(&mut self, rql: &str) -> Result<()> {
        for id in rql::parse(&mut self.arena, rql)? {
            self.add_term(None, id)?;
        }
        Ok(())
    }

    /// Add already-split query parameters, e.g. from an HTTP request.
    ///
    /// `explain` is not a term: it switches the query to a dry run.
    pub fn add_params<K: AsRef<str>, V: AsRef<str>>(&mut self, params: &[(K, V)]) -> Result<()> {
        let mut terms = Vec::with_capacity(params.len());
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key.eq_ignore_ascii_case("explain") {
                self.dry_run = !value.eq_ignore_ascii_case("false");
            } else {
                terms.push((key, value));
            }
        }
        for id in rql::parse_params(&mut self.arena, terms.as_slice())? {
            self.add_term(None, id)?;
        }
        Ok(())
    }

    /// Route a term from this query's arena into a clause.
    ///
    /// With a hint the term must belong to that clause. Without one the first
    /// clause (select, where, group, order, page) whose whitelist holds the
    /// term's token takes it.
    pub fn add_term(&mut self, hint: Option<ClauseKind>, id: TermId) -> Result<ClauseKind> {
        let token = self.arena.token(id);
        let kind = match hint {
            Some(kind) => kind,
            None => ClauseKind::for_token(token)
                .filter(|_| !self.arena.is_leaf(id))
                .ok_or_else(|| ApiError::UnknownFunction { clause: "query", token: token.to_string() })?,
        };

        match kind {
            ClauseKind::Select => self.select.push(&self.arena, id)?,
            ClauseKind::Where => self.filter.push(&mut self.arena, self.collection, id)?,
            ClauseKind::Group => self.group.push(&self.arena, id)?,
            ClauseKind::Order => self.order.push(&self.arena, id)?,
            ClauseKind::Page => self.page.push(&self.arena, id)?,
        }
        debug!(clause = kind.name(), term = %self.arena.display(id), "routed term");
        Ok(kind)
    }

    pub fn collection(&self) -> &'a Collection {
        self.collection
    }

    pub fn arena(&self) -> &TermArena {
        &self.arena
    }

    /// Mutable access for building terms by hand before [`Query::add_term`].
    pub fn arena_mut(&mut self) -> &mut TermArena {
        &mut self.arena
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    pub fn filter(&self) -> &Where {
        &self.filter
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn paging(&self) -> &PagingDefaults {
        &self.paging
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn projection(&self) -> Result<Projection> {
        self.select.projection(&self.arena, self.collection)
    }

    pub fn sort_keys(&self) -> Result<Vec<SortKey>> {
        self.order.sort_keys(&self.arena, self.collection)
    }

    /// Group columns from `group(...)` followed by those implied by `groupCount(...)`.
    pub fn group_columns(&self, projection: &Projection) -> Result<Vec<String>> {
        let mut columns = self.group.columns(&self.arena, self.collection)?;
        for column in &projection.group_by {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        Ok(columns)
    }

    pub fn page_request(&self) -> Result<PageRequest> {
        self.page.request(&self.arena, &self.paging)
    }

    /// Canonical RQL for the whole query, clause by clause.
    pub fn to_rql(&self) -> String {
        [
            self.select.roots(),
            self.filter.roots(),
            self.group.roots(),
            self.order.roots(),
            self.page.roots(),
        ]
        .concat()
        .iter()
        .map(|id| self.arena.render(*id))
        .collect::<Vec<_>>()
        .join(",")
    }

    pub fn compile(&self, backend: &Backend) -> Result<CompiledQuery> {
        backend.compile(self)
    }
}
