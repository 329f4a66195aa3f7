//! Page clause builder.
//!
//! `page`/`pageNum` are 1-based. `pageSize` and `limit` both set the page size;
//! `offset` wins over the offset implied by the page number. `after(v,...)`
//! carries a search-after cursor for backends that page by key.

use serde::{Deserialize, Serialize};

use super::clause::{integer_arg, leaf_args, Clause, ClauseKind};
use crate::error::{ApiError, Result};
use crate::rql::{TermArena, TermId};

/// Page size limits applied when a query doesn't say otherwise.
///
/// Read from the `paging` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingDefaults {
    /// Page size used when no `pageSize`/`limit` is given (default 100)
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Largest page size a query may ask for (default 1000)
    #[serde(default = "max_limit")]
    pub max_limit: u64,
}

fn default_limit() -> u64 {
    100
}

fn max_limit() -> u64 {
    1000
}

impl Default for PagingDefaults {
    fn default() -> Self {
        PagingDefaults { default_limit: default_limit(), max_limit: max_limit() }
    }
}

/// Fully resolved paging for one query.
///
/// `offset`/`limit` drive offset-based backends; `page_num`/`page_size`
/// describe the same window in pages. With an explicit `offset` that isn't
/// a multiple of the page size the two can disagree, so window checks must
/// look at both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Rows to skip
    pub offset: u64,
    /// Rows to return
    pub limit: u64,
    /// 1-based page number
    pub page_num: u64,
    pub page_size: u64,
    /// Search-after cursor values, one per sort field
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
    /// True when any page term was supplied
    pub explicit: bool,
}

/// The `page` clause: page, pageNum, pageSize, limit, offset and after terms.
#[derive(Debug, Clone)]
pub struct Page {
    clause: Clause,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Create an empty page clause.
    pub fn new() -> Self {
        Page { clause: Clause::new(ClauseKind::Page) }
    }

    pub fn roots(&self) -> &[TermId] {
        self.clause.roots()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// Add a page term to the clause.
    ///
    /// # Arguments
    ///
    /// * `arena` - The arena holding the parsed query
    /// * `id` - A top-level term such as `limit(10)`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnknownFunction`] if the token isn't a page function.
    pub fn push(&mut self, arena: &TermArena, id: TermId) -> Result<()> {
        self.clause.push(arena, id)
    }

    /// Resolve the clause into concrete offset, limit and page numbers.
    ///
    /// # Arguments
    ///
    /// * `arena` - The arena holding the parsed query
    /// * `defaults` - Page size to fall back on and the upper bound to enforce
    ///
    /// # Returns
    ///
    /// A [`PageRequest`]. An explicit `offset` wins over the one implied by
    /// `page`; without `page` the page number is derived from the offset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidArgument`] for page 0, a page size above
    /// `defaults.max_limit`, or a non-integer argument.
    pub fn request(&self, arena: &TermArena, defaults: &PagingDefaults) -> Result<PageRequest> {
        let mut page = None;
        let mut size = None;
        let mut offset = None;
        let mut after = Vec::new();

        for id in self.roots() {
            match arena.token(*id) {
                "page" | "pagenum" => {
                    let n = integer_arg(arena, *id)?;
                    if n == 0 {
                        return Err(ApiError::InvalidArgument("Page numbers start at 1".to_string()));
                    }
                    page = Some(n);
                }
                "pagesize" | "limit" => size = Some(integer_arg(arena, *id)?),
                "offset" => offset = Some(integer_arg(arena, *id)?),
                "after" => after = leaf_args(arena, *id)?.into_iter().map(str::to_string).collect(),
                _ => {}
            }
        }

        let page_size = size.filter(|s| *s > 0).unwrap_or(defaults.default_limit);
        if page_size > defaults.max_limit {
            return Err(ApiError::InvalidArgument(format!(
                "Page size {} exceeds the maximum of {}",
                page_size, defaults.max_limit
            )));
        }
        let offset = offset.unwrap_or_else(|| (page.unwrap_or(1) - 1).saturating_mul(page_size));
        let page_num = page.unwrap_or(offset / page_size.max(1) + 1);

        Ok(PageRequest {
            offset,
            limit: page_size,
            page_num,
            page_size,
            after,
            explicit: !self.is_empty(),
        })
    }
}
