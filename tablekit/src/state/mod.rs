//! Table state
//!
//! One [`TableState`] per table instance, mutated exclusively through
//! [`TableAction`]s applied by the [`reduce`] function, and owned by a
//! [`Store`]. The store is never shared across table instances.

mod action;
mod selection;
mod store;

pub use action::*;
pub use selection::*;
pub use store::*;

use std::collections::BTreeMap;

use crate::error::FetchError;
use crate::query::{Query, QueryValue};

/// Key identifying one row for selection/expansion purposes.
pub type RowKey = String;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

/// Active sort: at most one column and direction at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorter {
    /// The column's data field.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

impl Sorter {
    /// Ascending sort on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Column-level filter selections, distinct from the top-level query
/// (table-header filter widgets vs. the search form).
pub type ColumnFilters = BTreeMap<String, Vec<QueryValue>>;

/// The mutable runtime record for one table instance.
#[derive(Debug, Clone)]
pub struct TableState<R> {
    /// Current page's rows; replaced wholesale on each successful fetch
    /// (appended in load-more mode).
    pub rows: Vec<R>,
    /// Current page number (1-based input to the next fetch).
    pub current: u64,
    /// Page size (input to the next fetch).
    pub page_size: u64,
    /// Total row count reported by the last fetch.
    pub total: u64,
    /// The single source of truth for "what is being asked for".
    pub query: Query,
    /// Column-level filter selections.
    pub filters: ColumnFilters,
    /// Active sort, if any.
    pub sorter: Option<Sorter>,
    /// Row selection; never sent to the server.
    pub selection: Selection<RowKey>,
    /// Expanded row keys; never sent to the server.
    pub expanded: Vec<RowKey>,
    /// A fetch is in flight.
    pub loading: bool,
    /// The last fetch failed; cleared at the start of every new request.
    pub error: Option<FetchError>,
    /// Distinguishes "never searched" from "searched, found nothing".
    pub never_searched: bool,
}

impl<R> TableState<R> {
    /// Returns `true` when the table should render its "not yet searched"
    /// placeholder rather than a normal empty-result state.
    pub fn shows_empty_placeholder(&self) -> bool {
        self.never_searched && self.rows.is_empty()
    }
}
