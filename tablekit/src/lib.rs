//! tablekit: a headless, plugin-based data table engine
//!
//! One table core shared by many unrelated CRUD screens: data fetching,
//! pagination, column/filter configuration, URL query synchronization,
//! refresh-after-mutation semantics, and a plugin pipeline for slot
//! rendering and context enhancement. Rendering itself is left to the
//! embedding shell; the engine produces an abstract [`render::Fragment`]
//! tree and never touches a terminal or DOM.

pub mod columns;
pub mod error;
pub mod ops;
pub mod plugin;
pub mod query;
pub mod render;
pub mod scroll;
pub mod source;
pub mod state;
pub mod sync;
pub mod table;

pub mod prelude {
    pub use crate::columns::{
        Column, ColumnContext, ColumnFactory, ColumnSpec, FilterChange, FilterContext,
        FilterFactory, FilterField, FilterOption, FilterWidget, process_columns, process_filters,
    };
    pub use crate::error::{FetchError, OperationError, PluginError, SyncError};
    pub use crate::ops::{
        BusinessTable, HandlerFn, HandlerFuture, Handlers, OperationArgs, OperationWrapper,
        RefreshFeedback, RefreshFn,
    };
    pub use crate::plugin::{Capability, Plugin, PluginContext, PluginManager, RenderArgs, Slot};
    pub use crate::query::{Query, QueryCodec, QueryValue, canonical_params, normalize};
    pub use crate::render::{ComposedSlots, Fragment, PropBag, SlotOverrides};
    pub use crate::scroll::{ScrollHeight, compute_scroll_y};
    pub use crate::source::{
        DataSource, FetchCoordinator, FetchPage, FetchParams, FnSource, SourceConfig, SourceMode,
    };
    pub use crate::state::{
        ColumnFilters, Direction, PaginationPatch, RowKey, Selection, SelectionMode, Sorter,
        Store, StoreConfig, StoreDefaults, TableAction, TableState,
    };
    pub use crate::sync::{
        MemoryUrl, ReservedKeys, SharedUrl, SyncConfig, SyncEngine, UrlAdapter,
    };
    pub use crate::table::{HandleSlot, RefreshOutcome, TableEngine, TableHandle, TableOptions};
}
