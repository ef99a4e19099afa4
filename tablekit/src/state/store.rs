//! The table state store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::query::Query;

use super::{
    ColumnFilters, Selection, SelectionMode, StoreDefaults, TableAction, TableState, reduce,
};

/// Initial values and reset defaults for one store.
#[derive(Debug, Clone)]
pub struct StoreConfig<R> {
    /// Rows present before the first fetch.
    pub initial_rows: Vec<R>,
    /// Query present before the first fetch (merged under any URL-derived
    /// query at engine construction).
    pub initial_query: Query,
    /// Starting page number.
    pub initial_current: u64,
    /// Starting page size.
    pub initial_page_size: u64,
    /// Selection mode for the table's rows.
    pub selection_mode: SelectionMode,
    /// Values restored by reset.
    pub defaults: StoreDefaults,
}

impl<R> Default for StoreConfig<R> {
    fn default() -> Self {
        let defaults = StoreDefaults::default();
        Self {
            initial_rows: Vec::new(),
            initial_query: defaults.query.clone(),
            initial_current: defaults.current,
            initial_page_size: defaults.page_size,
            selection_mode: SelectionMode::None,
            defaults,
        }
    }
}

/// State store for one table instance.
///
/// Thread-safe and cheap to clone (`Arc` internals), in the same shape as a
/// reactive state cell: interior mutability, a dirty flag, and a version
/// channel subscribers can watch to re-render after changes. The store is
/// exclusively owned by one table instance and never shared across tables.
#[derive(Debug)]
pub struct Store<R> {
    inner: Arc<RwLock<TableState<R>>>,
    defaults: Arc<StoreDefaults>,
    dirty: Arc<AtomicBool>,
    version: Arc<watch::Sender<u64>>,
}

impl<R: Clone> Store<R> {
    /// Creates a store from its configuration.
    pub fn new(config: StoreConfig<R>) -> Self {
        let state = TableState {
            rows: config.initial_rows,
            current: config.initial_current,
            page_size: config.initial_page_size,
            total: 0,
            query: config.initial_query,
            filters: ColumnFilters::new(),
            sorter: None,
            selection: match config.selection_mode {
                SelectionMode::None => Selection::none(),
                SelectionMode::Single => Selection::single(),
                SelectionMode::Multi => Selection::multi(),
            },
            expanded: Vec::new(),
            loading: false,
            error: None,
            never_searched: true,
        };
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(state)),
            defaults: Arc::new(config.defaults),
            dirty: Arc::new(AtomicBool::new(false)),
            version: Arc::new(version),
        }
    }

    /// Applies one action through the reducer.
    pub fn dispatch(&self, action: TableAction<R>) {
        if let Ok(mut guard) = self.inner.write() {
            reduce(&mut guard, action, &self.defaults);
            self.dirty.store(true, Ordering::SeqCst);
            self.version.send_modify(|v| *v += 1);
        }
    }

    /// Synchronous snapshot of the current state.
    ///
    /// Consumers that need current state inside a callback read a snapshot
    /// instead of holding a lock across their own logic.
    pub fn snapshot(&self) -> TableState<R> {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Reads the state through a closure without cloning.
    pub fn with<T>(&self, f: impl FnOnce(&TableState<R>) -> T) -> T {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Rewrites the query atomically from its previous value.
    ///
    /// The lock is held for the duration of the closure, so two widgets
    /// composing query changes concurrently cannot lose each other's
    /// updates.
    pub fn update_query(&self, f: impl FnOnce(&Query) -> Query) {
        if let Ok(mut guard) = self.inner.write() {
            guard.query = f(&guard.query);
            self.dirty.store(true, Ordering::SeqCst);
            self.version.send_modify(|v| *v += 1);
        }
    }

    /// Reset defaults this store was configured with.
    pub fn defaults(&self) -> &StoreDefaults {
        &self.defaults
    }

    /// Subscribe to state versions; the receiver resolves whenever any
    /// action lands.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Current state version.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Check if state changed since the last `clear_dirty`.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag.
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }
}

impl<R> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            defaults: Arc::clone(&self.defaults),
            dirty: Arc::clone(&self.dirty),
            version: Arc::clone(&self.version),
        }
    }
}
