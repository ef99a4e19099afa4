//! Business table operation wrapper
//!
//! Couples caller-provided delete/update/create handlers to automatic
//! refresh: a handler that resolves `true` triggers exactly one refresh,
//! awaited after the handler itself; a handler that resolves `false` or
//! errors never does. Simple mode wraps the three fixed handler slots;
//! composable mode hands out generic wrap-functions for screens with
//! several independent operation variants sharing one refresh path.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::OperationError;
use crate::source::SourceConfig;
use crate::state::RowKey;
use crate::table::{HandleSlot, RefreshOutcome};

/// Arguments handed to a delete/update/create handler.
#[derive(Debug, Clone, Default)]
pub struct OperationArgs {
    /// Row keys the operation targets.
    pub keys: Vec<RowKey>,
    /// Arbitrary business payload.
    pub payload: serde_json::Value,
}

impl OperationArgs {
    /// Arguments with no targets and no payload.
    pub fn none() -> Self {
        Self::default()
    }

    /// Arguments targeting the given row keys.
    pub fn keys(keys: Vec<RowKey>) -> Self {
        Self {
            keys,
            payload: serde_json::Value::Null,
        }
    }

    /// Attaches a business payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A handler future resolving to the success flag.
pub type HandlerFuture = BoxFuture<'static, Result<bool, OperationError>>;

/// A caller-provided mutation handler.
pub type HandlerFn = Arc<dyn Fn(OperationArgs) -> HandlerFuture + Send + Sync>;

/// A refresh thunk resolved through the handle slot at call time.
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, RefreshOutcome> + Send + Sync>;

/// The three fixed handler slots of simple mode.
#[derive(Clone, Default)]
pub struct Handlers {
    /// Delete handler.
    pub delete: Option<HandlerFn>,
    /// Update handler.
    pub update: Option<HandlerFn>,
    /// Create handler.
    pub create: Option<HandlerFn>,
}

impl Handlers {
    /// No handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delete handler.
    pub fn on_delete(
        mut self,
        handler: impl Fn(OperationArgs) -> HandlerFuture + Send + Sync + 'static,
    ) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    /// Sets the update handler.
    pub fn on_update(
        mut self,
        handler: impl Fn(OperationArgs) -> HandlerFuture + Send + Sync + 'static,
    ) -> Self {
        self.update = Some(Arc::new(handler));
        self
    }

    /// Sets the create handler.
    pub fn on_create(
        mut self,
        handler: impl Fn(OperationArgs) -> HandlerFuture + Send + Sync + 'static,
    ) -> Self {
        self.create = Some(Arc::new(handler));
        self
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("delete", &self.delete.is_some())
            .field("update", &self.update.is_some())
            .field("create", &self.create.is_some())
            .finish()
    }
}

/// Messages surfaced by the shell after an automatic refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFeedback {
    /// Shown when the refresh succeeded.
    pub success: String,
    /// Shown when the refresh failed.
    pub failure: String,
}

impl Default for RefreshFeedback {
    fn default() -> Self {
        Self {
            success: "Refreshed".to_string(),
            failure: "Refresh failed".to_string(),
        }
    }
}

/// Generic wrap-functions for composable mode.
///
/// Screens with several independent operation variants (e.g. one delete
/// per data-source type) build an arbitrary map of named operations from
/// these; every wrapped operation shares the same refresh path.
#[derive(Debug, Clone)]
pub struct OperationWrapper<R> {
    handle: HandleSlot<R>,
    local: bool,
}

impl<R: Clone + Send + Sync + 'static> OperationWrapper<R> {
    /// A wrapper refreshing through the given handle slot. Local-data
    /// tables get a wrapper whose refresh path is a no-op.
    pub fn new(handle: HandleSlot<R>, source: &SourceConfig<R>) -> Self {
        Self {
            handle,
            local: source.is_local(),
        }
    }

    /// A refresh thunk that resolves the handle slot at call time.
    pub fn get_refresh(&self) -> RefreshFn {
        let handle = self.handle.clone();
        let local = self.local;
        Arc::new(move || {
            let handle = handle.clone();
            Box::pin(async move {
                if local {
                    return RefreshOutcome::ok();
                }
                match handle.resolve() {
                    Some(table) => table.refresh().await,
                    None => {
                        log::debug!("refresh skipped: no table handle attached");
                        RefreshOutcome::ok()
                    }
                }
            })
        })
    }

    /// Wraps any handler with refresh-on-success.
    pub fn wrap(&self, handler: HandlerFn) -> HandlerFn {
        let refresh = self.get_refresh();
        Arc::new(move |args| {
            let handler = Arc::clone(&handler);
            let refresh = Arc::clone(&refresh);
            Box::pin(async move {
                let outcome = handler(args).await;
                if matches!(outcome, Ok(true)) {
                    refresh().await;
                }
                outcome
            })
        })
    }

    /// Wraps a delete handler; a failed delete never refreshes.
    pub fn wrap_delete(&self, handler: HandlerFn) -> HandlerFn {
        self.wrap(handler)
    }

    /// Wraps an update handler.
    pub fn wrap_update(&self, handler: HandlerFn) -> HandlerFn {
        self.wrap(handler)
    }

    /// Wraps a create handler.
    pub fn wrap_create(&self, handler: HandlerFn) -> HandlerFn {
        self.wrap(handler)
    }

    /// Wraps a delete handler whose outcome the caller does not consume.
    #[allow(clippy::type_complexity)]
    pub fn wrap_delete_as_void(
        &self,
        handler: HandlerFn,
    ) -> Arc<dyn Fn(OperationArgs) -> BoxFuture<'static, ()> + Send + Sync> {
        let wrapped = self.wrap(handler);
        Arc::new(move |args| {
            let wrapped = Arc::clone(&wrapped);
            Box::pin(async move {
                if let Err(err) = wrapped(args).await {
                    log::warn!("void delete failed: {err}");
                }
            })
        })
    }
}

/// A table's business-operation bundle.
#[derive(Debug, Clone)]
pub struct BusinessTable<R> {
    wrapper: OperationWrapper<R>,
    local: bool,
    /// Wrapped handler slots (simple mode); empty in composable mode.
    pub wrapped: Handlers,
    /// Refresh feedback config; absent in local-data mode.
    pub feedback: Option<RefreshFeedback>,
}

impl<R: Clone + Send + Sync + 'static> BusinessTable<R> {
    /// Simple mode: wraps each present handler slot.
    ///
    /// In local-data mode the handlers pass through unwrapped (there is no
    /// remote source to re-fetch) and no feedback config is attached.
    pub fn simple(
        handle: HandleSlot<R>,
        source: &SourceConfig<R>,
        handlers: Handlers,
        feedback: RefreshFeedback,
    ) -> Self {
        let wrapper = OperationWrapper::new(handle, source);
        let local = source.is_local();
        let wrapped = if local {
            handlers
        } else {
            Handlers {
                delete: handlers.delete.map(|h| wrapper.wrap_delete(h)),
                update: handlers.update.map(|h| wrapper.wrap_update(h)),
                create: handlers.create.map(|h| wrapper.wrap_create(h)),
            }
        };
        Self {
            wrapper,
            local,
            wrapped,
            feedback: if local { None } else { Some(feedback) },
        }
    }

    /// Composable mode: no fixed slots; the caller builds its own
    /// operation map from the returned wrapper.
    pub fn composable(
        handle: HandleSlot<R>,
        source: &SourceConfig<R>,
        feedback: RefreshFeedback,
    ) -> (Self, OperationWrapper<R>) {
        let wrapper = OperationWrapper::new(handle, source);
        let local = source.is_local();
        (
            Self {
                wrapper: wrapper.clone(),
                local,
                wrapped: Handlers::new(),
                feedback: if local { None } else { Some(feedback) },
            },
            wrapper,
        )
    }

    /// Returns `true` when the table runs on a local dataset.
    pub fn is_local_data(&self) -> bool {
        self.local
    }

    /// The underlying wrapper, for late additions of named operations.
    pub fn wrapper(&self) -> &OperationWrapper<R> {
        &self.wrapper
    }
}
