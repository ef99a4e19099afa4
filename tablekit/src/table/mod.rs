//! The table engine facade
//!
//! One [`TableEngine`] per business screen: it owns the state store, the
//! sync engine, the plugin manager, the column/filter factories, and the
//! data-source configuration, and exposes the imperative surface callers
//! and the operation wrapper drive. Construction seeds the query from the
//! URL; every query mutation re-syncs the URL strictly after the state
//! change it derives from, then fetches.

use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::columns::{
    Column, ColumnContext, ColumnFactory, FilterChange, FilterContext, FilterFactory, FilterField,
    process_columns, process_filters,
};
use crate::error::FetchError;
use crate::plugin::{Plugin, PluginContext, PluginManager};
use crate::query::{Query, normalize};
use crate::render::{ComposedSlots, PropBag, SlotComposer, SlotOverrides};
use crate::scroll::{ScrollHeight, compute_scroll_y};
use crate::source::{FetchCoordinator, FetchParams, SourceConfig, SourceMode};
use crate::state::{Sorter, Store, StoreConfig, TableAction, TableState};
use crate::sync::{SyncConfig, SyncEngine, UrlAdapter};

/// Result of one refresh call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// `true` unless the fetch itself failed.
    pub success: bool,
    /// The fetch error, when `success` is `false`.
    pub error: Option<FetchError>,
}

impl RefreshOutcome {
    /// A successful (or skipped) refresh.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed refresh.
    pub fn failed(error: FetchError) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// Everything needed to construct a [`TableEngine`].
pub struct TableOptions<R> {
    /// State store configuration.
    pub store: StoreConfig<R>,
    /// Data-source configuration.
    pub source: SourceConfig<R>,
    /// URL sync configuration.
    pub sync: SyncConfig,
    /// Plugins, in registration order.
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// Column factory.
    pub columns: Option<ColumnFactory<R>>,
    /// Filter factory.
    pub filters: Option<FilterFactory>,
    /// Caller slot overrides.
    pub overrides: SlotOverrides,
    /// Extra business props forwarded to factories and plugins.
    pub extra: PropBag,
    /// Auto scroll-height configuration.
    pub scroll: Option<ScrollHeight>,
    /// Explicit vertical scroll height; wins over `scroll`.
    pub scroll_y: Option<String>,
}

impl<R> TableOptions<R> {
    /// Options for a source, everything else defaulted.
    pub fn new(source: SourceConfig<R>) -> Self {
        Self {
            store: StoreConfig::default(),
            source,
            sync: SyncConfig::default(),
            plugins: Vec::new(),
            columns: None,
            filters: None,
            overrides: SlotOverrides::new(),
            extra: PropBag::new(),
            scroll: None,
            scroll_y: None,
        }
    }

    /// Sets the store configuration.
    pub fn store(mut self, store: StoreConfig<R>) -> Self {
        self.store = store;
        self
    }

    /// Sets the sync configuration.
    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Registers the plugins.
    pub fn plugins(mut self, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Sets the column factory.
    pub fn columns(mut self, factory: ColumnFactory<R>) -> Self {
        self.columns = Some(factory);
        self
    }

    /// Sets the filter factory.
    pub fn filters(mut self, factory: FilterFactory) -> Self {
        self.filters = Some(factory);
        self
    }

    /// Sets caller slot overrides.
    pub fn overrides(mut self, overrides: SlotOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets extra business props.
    pub fn extra(mut self, extra: PropBag) -> Self {
        self.extra = extra;
        self
    }

    /// Sets the auto scroll-height configuration.
    pub fn scroll(mut self, scroll: ScrollHeight) -> Self {
        self.scroll = Some(scroll);
        self
    }

    /// Sets an explicit vertical scroll height.
    pub fn scroll_y(mut self, scroll_y: impl Into<String>) -> Self {
        self.scroll_y = Some(scroll_y.into());
        self
    }
}

/// The table engine for one business screen.
pub struct TableEngine<R> {
    store: Store<R>,
    sync: Mutex<SyncEngine>,
    url: Mutex<Box<dyn UrlAdapter>>,
    manager: PluginManager,
    coordinator: FetchCoordinator,
    source: SourceConfig<R>,
    columns: Option<ColumnFactory<R>>,
    filters: Option<FilterFactory>,
    composer: Mutex<SlotComposer>,
    overrides: SlotOverrides,
    extra: PropBag,
    scroll: Option<ScrollHeight>,
    scroll_y: Option<String>,
}

impl<R: Clone + Send + Sync + 'static> TableEngine<R> {
    /// Builds an engine over a URL adapter and seeds the query from it.
    ///
    /// URL-derived fields are merged over the configured initial query, so
    /// reloading a page with filters in the address bar reproduces them.
    /// In local-data mode the supplied rows are installed immediately.
    pub fn new(options: TableOptions<R>, url: Box<dyn UrlAdapter>) -> Arc<Self> {
        let engine = Arc::new(Self {
            store: Store::new(options.store),
            sync: Mutex::new(SyncEngine::new(options.sync)),
            url: Mutex::new(url),
            manager: PluginManager::new(options.plugins),
            coordinator: FetchCoordinator::new(),
            source: options.source,
            columns: options.columns,
            filters: options.filters,
            composer: Mutex::new(SlotComposer::new()),
            overrides: options.overrides,
            extra: options.extra,
            scroll: options.scroll,
            scroll_y: options.scroll_y,
        });

        let url_query = match (engine.sync.lock(), engine.url.lock()) {
            (Ok(sync), Ok(url)) => sync.sync_url_to_query(url.as_ref()),
            _ => Query::new(),
        };
        if !url_query.is_empty() {
            engine.store.dispatch(TableAction::MergeQuery(url_query));
        }

        if let SourceMode::Local { rows } = &engine.source.mode {
            let rows = rows.clone();
            let total = rows.len() as u64;
            engine.store.dispatch(TableAction::SetRows(rows));
            engine.store.dispatch(TableAction::SetTotal(total));
            engine.store.dispatch(TableAction::MarkSearched);
        }

        engine
    }

    /// The engine's state store.
    pub fn store(&self) -> &Store<R> {
        &self.store
    }

    /// Synchronous snapshot of the current table state.
    pub fn snapshot(&self) -> TableState<R> {
        self.store.snapshot()
    }

    /// Returns `true` in local-data mode.
    pub fn is_local(&self) -> bool {
        self.source.is_local()
    }

    /// A cloneable imperative handle to this engine.
    pub fn handle(self: &Arc<Self>) -> TableHandle<R> {
        TableHandle {
            engine: Arc::downgrade(self),
        }
    }

    /// Re-executes the current fetch with the current query and pagination.
    ///
    /// Skipped (successfully) in local-data mode and while the source is
    /// not ready. The fetch is sequenced: a response superseded by a newer
    /// fetch is dropped instead of overwriting state. A fetch error lands
    /// in the state's `error` field and in the returned outcome.
    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.source.ready {
            log::debug!("refresh skipped: source not ready");
            return RefreshOutcome::ok();
        }
        let source = match &self.source.mode {
            SourceMode::Remote(source) => Arc::clone(source),
            SourceMode::Local { .. } => {
                log::debug!("refresh skipped: local-data mode");
                return RefreshOutcome::ok();
            }
        };

        let seq = self.coordinator.begin();
        self.store.dispatch(TableAction::SetError(None));
        self.store.dispatch(TableAction::SetLoading(true));
        let params = self.fetch_params();

        let result = source.fetch(&params).await;
        if !self.coordinator.is_current(seq) {
            log::debug!("fetch {seq} superseded; response dropped");
            return RefreshOutcome::ok();
        }
        match result {
            Ok(page) => {
                let append = !self.source.server_pagination && params.current > 1;
                if append {
                    self.store.dispatch(TableAction::AppendRows(page.rows));
                } else {
                    self.store.dispatch(TableAction::SetRows(page.rows));
                }
                self.store.dispatch(TableAction::SetTotal(page.total));
                self.store.dispatch(TableAction::MarkSearched);
                self.store.dispatch(TableAction::SetLoading(false));
                RefreshOutcome::ok()
            }
            Err(err) => {
                self.store
                    .dispatch(TableAction::SetError(Some(err.clone())));
                self.store.dispatch(TableAction::SetLoading(false));
                RefreshOutcome::failed(err)
            }
        }
    }

    /// Replaces the query, rewinds to the first page, syncs the URL, and
    /// fetches.
    pub async fn submit_query(&self, query: Query) -> RefreshOutcome {
        self.store.dispatch(TableAction::SetQuery(query));
        self.rewind_page();
        self.sync_to_url();
        self.refresh().await
    }

    /// Merges a partial query, rewinds to the first page, syncs the URL,
    /// and fetches.
    pub async fn merge_query(&self, partial: Query) -> RefreshOutcome {
        self.store.dispatch(TableAction::MergeQuery(partial));
        self.rewind_page();
        self.sync_to_url();
        self.refresh().await
    }

    /// Applies one filter-widget change.
    ///
    /// An empty-sentinel value clears the field. The query rewrite is
    /// atomic, so two widgets changing different fields in quick
    /// succession cannot lose each other's updates.
    pub async fn apply_filter_change(&self, change: FilterChange) -> RefreshOutcome {
        self.store.update_query(|query| {
            let mut next = query.clone();
            if change.value.is_empty_sentinel() {
                next.remove(&change.key);
            } else {
                next.insert(change.key.clone(), change.value.clone());
            }
            next
        });
        self.rewind_page();
        self.sync_to_url();
        self.refresh().await
    }

    /// Moves to a page (optionally changing page size) and fetches.
    pub async fn change_page(&self, current: u64, page_size: Option<u64>) -> RefreshOutcome {
        self.store.dispatch(TableAction::UpdatePagination(
            crate::state::PaginationPatch {
                current: Some(current),
                page_size,
                total: None,
            },
        ));
        self.refresh().await
    }

    /// Changes the active sort and fetches.
    pub async fn change_sort(&self, sorter: Option<Sorter>) -> RefreshOutcome {
        self.store.dispatch(TableAction::SetSorter(sorter));
        self.refresh().await
    }

    /// Restores configured defaults.
    ///
    /// With `empty_placeholder` the table renders its "not yet searched"
    /// placeholder and no fetch is issued; otherwise the default query is
    /// fetched immediately.
    pub async fn reset(&self, empty_placeholder: bool) -> RefreshOutcome {
        self.store
            .dispatch(TableAction::Reset { empty_placeholder });
        self.sync_to_url();
        if empty_placeholder {
            RefreshOutcome::ok()
        } else {
            self.refresh().await
        }
    }

    /// Serializes the current query into the URL (no-op on no real
    /// change). Runs strictly after the state change it derives from.
    pub fn sync_to_url(&self) {
        let query = self.store.with(|s| s.query.clone());
        if let (Ok(mut sync), Ok(mut url)) = (self.sync.lock(), self.url.lock()) {
            sync.sync_query_to_url(&query, url.as_mut());
        }
    }

    /// Concrete columns for the current query snapshot.
    pub fn columns(&self) -> Vec<Column<R>> {
        let ctx = ColumnContext {
            query: self.store.with(|s| s.query.clone()),
            extra: self.extra.clone(),
        };
        process_columns(self.columns.as_ref(), &ctx)
    }

    /// Concrete filter fields for the current query snapshot.
    pub fn filter_fields(&self) -> Vec<FilterField> {
        let ctx = FilterContext {
            query: self.store.with(|s| s.query.clone()),
            extra: self.extra.clone(),
        };
        process_filters(self.filters.as_ref(), &ctx)
    }

    /// Composes the fixed UI slots from plugin output plus overrides.
    pub fn compose_slots(&self) -> ComposedSlots {
        let generation = self.store.version();
        let ctx = self.store.with(|s| PluginContext {
            query: normalize(&s.query),
            loading: s.loading,
            error: s.error.as_ref().map(|e| e.to_string()),
            total: s.total,
            row_count: s.rows.len(),
            never_searched: s.never_searched,
            props: self.extra.clone(),
            generation,
        });
        match self.composer.lock() {
            Ok(mut composer) => composer.compose(&self.manager, &ctx, &self.overrides),
            Err(_) => ComposedSlots::default(),
        }
    }

    /// The vertical scroll height expression, if configured.
    pub fn scroll_y(&self) -> Option<String> {
        match (&self.scroll, &self.scroll_y) {
            (Some(config), user) => Some(compute_scroll_y(config, user.as_deref())),
            (None, Some(user)) => Some(user.clone()),
            (None, None) => None,
        }
    }

    fn fetch_params(&self) -> FetchParams {
        self.store.with(|s| FetchParams {
            query: normalize(&s.query),
            current: s.current,
            page_size: s.page_size,
            filters: s.filters.clone(),
            sorter: s.sorter.clone(),
        })
    }

    fn rewind_page(&self) {
        let first = self.store.defaults().current;
        self.store.dispatch(TableAction::SetCurrent(first));
    }
}

impl<R> std::fmt::Debug for TableEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("source", &self.source.is_local())
            .field("manager", &self.manager)
            .finish()
    }
}

/// Cloneable imperative handle to a table engine.
///
/// Holds a weak reference: a handle outliving its table degrades to a
/// no-op instead of keeping the engine alive or erroring.
#[derive(Debug)]
pub struct TableHandle<R> {
    engine: Weak<TableEngine<R>>,
}

impl<R: Clone + Send + Sync + 'static> TableHandle<R> {
    /// Refreshes the table, if it is still alive.
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.engine.upgrade() {
            Some(engine) => engine.refresh().await,
            None => {
                log::debug!("refresh skipped: table dropped");
                RefreshOutcome::ok()
            }
        }
    }

    /// Returns `true` while the engine is still alive.
    pub fn is_attached(&self) -> bool {
        self.engine.strong_count() > 0
    }
}

impl<R> Clone for TableHandle<R> {
    fn clone(&self) -> Self {
        Self {
            engine: Weak::clone(&self.engine),
        }
    }
}

/// Late-bound slot for a table handle.
///
/// The operation wrapper resolves the slot at call time, not capture time,
/// so a handle attached after the wrapper was built still works; an empty
/// slot is a no-op, never an error.
#[derive(Debug)]
pub struct HandleSlot<R> {
    inner: Arc<RwLock<Option<TableHandle<R>>>>,
}

impl<R> HandleSlot<R> {
    /// An empty slot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Attaches (or replaces) the handle.
    pub fn attach(&self, handle: TableHandle<R>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(handle);
        }
    }

    /// Clears the slot.
    pub fn detach(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }

    /// The current handle, if attached.
    pub fn resolve(&self) -> Option<TableHandle<R>> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }
}

impl<R> Default for HandleSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for HandleSlot<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
