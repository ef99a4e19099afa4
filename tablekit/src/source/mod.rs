//! Data source contract and fetch coordination
//!
//! A data source describes how a table fetches its rows: a request
//! implementation, a readiness flag, and a pagination mode. Local-data
//! mode supplies rows directly and disables refresh semantics entirely.
//!
//! There is no request cancellation; instead every fetch carries a
//! monotonically increasing sequence number and only the response matching
//! the latest request is applied, so a slow stale response can never
//! overwrite a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::query::Query;
use crate::state::{ColumnFilters, Sorter};

/// Parameters of one fetch.
#[derive(Debug, Clone)]
pub struct FetchParams {
    /// Normalized query.
    pub query: Query,
    /// Page number (1-based).
    pub current: u64,
    /// Page size.
    pub page_size: u64,
    /// Column-level filter selections.
    pub filters: ColumnFilters,
    /// Active sort, if any.
    pub sorter: Option<Sorter>,
}

/// One page of fetched rows.
#[derive(Debug, Clone)]
pub struct FetchPage<R> {
    /// The page's rows.
    pub rows: Vec<R>,
    /// Total row count across all pages.
    pub total: u64,
}

impl<R> FetchPage<R> {
    /// Creates a page whose total equals its own length.
    pub fn of(rows: Vec<R>) -> Self {
        let total = rows.len() as u64;
        Self { rows, total }
    }

    /// Creates a page with an explicit total.
    pub fn with_total(rows: Vec<R>, total: u64) -> Self {
        Self { rows, total }
    }
}

/// The request boundary a remote table fetches through.
///
/// Timeout and abort behavior are the implementation's responsibility; the
/// engine only sequences responses.
#[async_trait]
pub trait DataSource<R: Send + 'static>: Send + Sync {
    /// Fetches one page of rows.
    async fn fetch(&self, params: &FetchParams) -> Result<FetchPage<R>, FetchError>;
}

/// A [`DataSource`] built from a closure, for tests and simple embeddings.
///
/// # Example
///
/// ```
/// use tablekit::source::{FetchPage, FnSource};
///
/// let source = FnSource::new(|params| {
///     let page = params.current;
///     Box::pin(async move { Ok(FetchPage::with_total(vec![page], 100)) })
/// });
/// ```
pub struct FnSource<R> {
    #[allow(clippy::type_complexity)]
    fetch: Box<
        dyn Fn(FetchParams) -> BoxFuture<'static, Result<FetchPage<R>, FetchError>> + Send + Sync,
    >,
}

impl<R> FnSource<R> {
    /// Wraps a fetch closure.
    pub fn new(
        fetch: impl Fn(FetchParams) -> BoxFuture<'static, Result<FetchPage<R>, FetchError>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            fetch: Box::new(fetch),
        }
    }
}

#[async_trait]
impl<R: Send + 'static> DataSource<R> for FnSource<R> {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchPage<R>, FetchError> {
        (self.fetch)(params.clone()).await
    }
}

/// Where a table's rows come from.
#[derive(Clone)]
pub enum SourceMode<R> {
    /// Rows are fetched through a request boundary.
    Remote(Arc<dyn DataSource<R>>),
    /// Rows are supplied directly; no refresh semantics.
    Local {
        /// The fixed dataset.
        rows: Vec<R>,
    },
}

impl<R> std::fmt::Debug for SourceMode<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(_) => f.write_str("Remote"),
            Self::Local { rows } => f.debug_struct("Local").field("len", &rows.len()).finish(),
        }
    }
}

/// Data-source configuration bundle.
#[derive(Debug, Clone)]
pub struct SourceConfig<R> {
    /// Row origin.
    pub mode: SourceMode<R>,
    /// Fetching is suppressed while `false` (e.g. dependent IDs still
    /// undefined).
    pub ready: bool,
    /// `true` for page-replacing server pagination; `false` for
    /// load-more accumulation.
    pub server_pagination: bool,
}

impl<R> SourceConfig<R> {
    /// Remote configuration with server pagination, ready.
    pub fn remote(source: Arc<dyn DataSource<R>>) -> Self {
        Self {
            mode: SourceMode::Remote(source),
            ready: true,
            server_pagination: true,
        }
    }

    /// Local-data configuration.
    pub fn local(rows: Vec<R>) -> Self {
        Self {
            mode: SourceMode::Local { rows },
            ready: true,
            server_pagination: false,
        }
    }

    /// Sets the readiness flag.
    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    /// Sets the pagination mode.
    pub fn with_server_pagination(mut self, server_pagination: bool) -> Self {
        self.server_pagination = server_pagination;
        self
    }

    /// Returns `true` in local-data mode.
    pub fn is_local(&self) -> bool {
        matches!(self.mode, SourceMode::Local { .. })
    }
}

/// Sequences fetches so only the latest request's response is applied.
#[derive(Debug, Default)]
pub struct FetchCoordinator {
    latest: AtomicU64,
}

impl FetchCoordinator {
    /// Creates a coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new fetch, superseding all earlier ones. Returns its
    /// sequence number.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns `true` while the given fetch is still the latest.
    pub fn is_current(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }

    /// The latest issued sequence number.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}
