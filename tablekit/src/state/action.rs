//! State actions and the reducer.
//!
//! Every mutation of [`TableState`] flows through [`reduce`] as an explicit
//! [`TableAction`]. Composing query changes from multiple independent filter
//! widgets is a merge action rather than a closure over previous state, so
//! there is no stale-snapshot hazard between concurrent widgets.

use crate::error::FetchError;
use crate::query::Query;

use super::{ColumnFilters, RowKey, Sorter, TableState};

/// A partial update of the pagination triple, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationPatch {
    /// New page number, if changing.
    pub current: Option<u64>,
    /// New page size, if changing.
    pub page_size: Option<u64>,
    /// New total, if changing.
    pub total: Option<u64>,
}

/// Field defaults restored by [`TableAction::Reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDefaults {
    /// Query restored on reset.
    pub query: Query,
    /// Page number restored on reset (and used when a query change rewinds
    /// to the first page).
    pub current: u64,
    /// Page size restored on reset.
    pub page_size: u64,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            query: Query::new(),
            current: 1,
            page_size: 10,
        }
    }
}

/// One mutation of table state.
#[derive(Debug, Clone)]
pub enum TableAction<R> {
    /// Replace the current rows wholesale.
    SetRows(Vec<R>),
    /// Append a page of rows (load-more pagination).
    AppendRows(Vec<R>),
    /// Set the loading flag.
    SetLoading(bool),
    /// Set or clear the fetch error.
    SetError(Option<FetchError>),
    /// Set the current page number.
    SetCurrent(u64),
    /// Set the page size.
    SetPageSize(u64),
    /// Set the total row count.
    SetTotal(u64),
    /// Apply a partial pagination update atomically.
    UpdatePagination(PaginationPatch),
    /// Replace the query wholesale.
    SetQuery(Query),
    /// Merge a partial query into the current one (last write wins per
    /// field).
    MergeQuery(Query),
    /// Replace the column-level filter selections.
    SetFilters(ColumnFilters),
    /// Set or clear the active sort.
    SetSorter(Option<Sorter>),
    /// Replace the selected row keys.
    SetSelected(Vec<RowKey>),
    /// Replace the expanded row keys.
    SetExpanded(Vec<RowKey>),
    /// Mark the first successful search as completed.
    MarkSearched,
    /// Restore every field to its configured defaults. With
    /// `empty_placeholder` the table renders its "not yet searched"
    /// placeholder instead of a normal empty-result state.
    Reset {
        /// Render the "not yet searched" placeholder afterwards.
        empty_placeholder: bool,
    },
}

/// Applies one action to the state. Pure and exhaustive.
pub fn reduce<R>(state: &mut TableState<R>, action: TableAction<R>, defaults: &StoreDefaults) {
    match action {
        TableAction::SetRows(rows) => state.rows = rows,
        TableAction::AppendRows(mut rows) => state.rows.append(&mut rows),
        TableAction::SetLoading(loading) => state.loading = loading,
        TableAction::SetError(error) => state.error = error,
        TableAction::SetCurrent(current) => state.current = current,
        TableAction::SetPageSize(page_size) => state.page_size = page_size,
        TableAction::SetTotal(total) => state.total = total,
        TableAction::UpdatePagination(patch) => {
            if let Some(current) = patch.current {
                state.current = current;
            }
            if let Some(page_size) = patch.page_size {
                state.page_size = page_size;
            }
            if let Some(total) = patch.total {
                state.total = total;
            }
        }
        TableAction::SetQuery(query) => state.query = query,
        TableAction::MergeQuery(partial) => state.query.merge(partial),
        TableAction::SetFilters(filters) => state.filters = filters,
        TableAction::SetSorter(sorter) => state.sorter = sorter,
        TableAction::SetSelected(keys) => state.selection.set(keys),
        TableAction::SetExpanded(keys) => state.expanded = keys,
        TableAction::MarkSearched => state.never_searched = false,
        TableAction::Reset { empty_placeholder } => {
            state.rows = Vec::new();
            state.current = defaults.current;
            state.page_size = defaults.page_size;
            state.total = 0;
            state.query = defaults.query.clone();
            state.filters = ColumnFilters::new();
            state.sorter = None;
            state.selection.clear();
            state.expanded = Vec::new();
            state.loading = false;
            state.error = None;
            state.never_searched = empty_placeholder;
        }
    }
}
