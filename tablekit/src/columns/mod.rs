//! Column and filter processing pipeline
//!
//! Business screens declare columns and filters through factory closures
//! re-invoked with every query snapshot. The pipeline defends against
//! absent or panicking factories (a misbehaving screen configuration
//! degrades to an empty list so the table shell always renders) and
//! normalizes heterogeneous descriptors into a uniform shape with stable
//! per-column keys.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::query::{Query, QueryValue};
use crate::render::{Fragment, PropBag};

/// Renders one cell of a column from its row.
pub type ColumnRender<R> = Arc<dyn Fn(&R) -> Fragment + Send + Sync>;

/// A caller-declared column descriptor.
///
/// Regenerated every time the owning factory runs with a new query
/// snapshot; never persisted.
#[derive(Clone)]
pub struct ColumnSpec<R> {
    /// Display title.
    pub title: String,
    /// Data field this column reads.
    pub data_index: String,
    /// Explicit key; falls back to `data_index`, then a positional
    /// placeholder.
    pub key: Option<String>,
    /// Cell renderer.
    pub render: Option<ColumnRender<R>>,
}

impl<R> ColumnSpec<R> {
    /// Creates a column for a data field.
    pub fn new(title: impl Into<String>, data_index: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data_index: data_index.into(),
            key: None,
            render: None,
        }
    }

    /// Sets an explicit key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the cell renderer.
    pub fn render(mut self, render: impl Fn(&R) -> Fragment + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(render));
        self
    }
}

impl<R> std::fmt::Debug for ColumnSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("title", &self.title)
            .field("data_index", &self.data_index)
            .field("key", &self.key)
            .field("has_render", &self.render.is_some())
            .finish()
    }
}

/// A processed column with its key derived and required fields backfilled.
#[derive(Clone)]
pub struct Column<R> {
    /// Stable key for list reconciliation.
    pub key: String,
    /// Display title (never missing; empty string when the caller omitted
    /// it).
    pub title: String,
    /// Data field (never missing).
    pub data_index: String,
    /// Cell renderer.
    pub render: Option<ColumnRender<R>>,
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("data_index", &self.data_index)
            .finish()
    }
}

/// Inputs handed to a column factory.
#[derive(Debug, Clone, Default)]
pub struct ColumnContext {
    /// Current query snapshot.
    pub query: Query,
    /// Extra business props forwarded by the caller.
    pub extra: PropBag,
}

/// A caller-supplied column factory.
pub type ColumnFactory<R> = Arc<dyn Fn(&ColumnContext) -> Vec<ColumnSpec<R>> + Send + Sync>;

/// Runs a column factory and normalizes its output.
///
/// A missing factory yields an empty list; a panicking factory is contained
/// and logged, also yielding an empty list. Keys are derived with the
/// priority explicit `key`, then `data_index`, then a positional
/// `col-{index}` placeholder.
pub fn process_columns<R>(
    factory: Option<&ColumnFactory<R>>,
    ctx: &ColumnContext,
) -> Vec<Column<R>> {
    let Some(factory) = factory else {
        return Vec::new();
    };
    let specs = match catch_unwind(AssertUnwindSafe(|| factory(ctx))) {
        Ok(specs) => specs,
        Err(_) => {
            log::warn!("column factory panicked; rendering with no columns");
            return Vec::new();
        }
    };
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let key = spec
                .key
                .filter(|k| !k.is_empty())
                .or_else(|| {
                    if spec.data_index.is_empty() {
                        None
                    } else {
                        Some(spec.data_index.clone())
                    }
                })
                .unwrap_or_else(|| format!("col-{index}"));
            Column {
                key,
                title: spec.title,
                data_index: spec.data_index,
                render: spec.render,
            }
        })
        .collect()
}

/// Widget kind of a filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWidget {
    /// Free-text input.
    Input,
    /// Single-choice select.
    Select,
    /// Multi-choice select.
    MultiSelect,
    /// Date range picker.
    DateRange,
}

/// One selectable option of a select-style filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    /// Display label.
    pub label: String,
    /// Value written into the query when chosen.
    pub value: QueryValue,
}

impl FilterOption {
    /// Creates an option.
    pub fn new(label: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A caller-declared filter field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterField {
    /// Query field this filter writes.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Widget kind.
    pub widget: FilterWidget,
    /// Options for select-style widgets.
    pub options: Vec<FilterOption>,
}

impl FilterField {
    /// Creates a filter field.
    pub fn new(key: impl Into<String>, label: impl Into<String>, widget: FilterWidget) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            widget,
            options: Vec::new(),
        }
    }

    /// Sets the selectable options.
    pub fn options(mut self, options: Vec<FilterOption>) -> Self {
        self.options = options;
        self
    }
}

/// The only sanctioned mutation channel from a filter widget back into
/// query state.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChange {
    /// Query field being changed.
    pub key: String,
    /// New value; an empty sentinel clears the field.
    pub value: QueryValue,
}

/// Inputs handed to a filter factory.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Current query snapshot.
    pub query: Query,
    /// Extra business props forwarded by the caller.
    pub extra: PropBag,
}

/// A caller-supplied filter factory.
pub type FilterFactory = Arc<dyn Fn(&FilterContext) -> Vec<FilterField> + Send + Sync>;

/// Runs a filter factory with the same degrade-to-empty guarantees as
/// [`process_columns`]. Fields without a key get a positional placeholder.
pub fn process_filters(factory: Option<&FilterFactory>, ctx: &FilterContext) -> Vec<FilterField> {
    let Some(factory) = factory else {
        return Vec::new();
    };
    let fields = match catch_unwind(AssertUnwindSafe(|| factory(ctx))) {
        Ok(fields) => fields,
        Err(_) => {
            log::warn!("filter factory panicked; rendering with no filters");
            return Vec::new();
        }
    };
    fields
        .into_iter()
        .enumerate()
        .map(|(index, mut field)| {
            if field.key.is_empty() {
                field.key = format!("field-{index}");
            }
            field
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_factory_yields_empty() {
        let columns: Vec<Column<u32>> = process_columns(None, &ColumnContext::default());
        assert!(columns.is_empty());
    }

    #[test]
    fn test_panicking_factory_yields_empty() {
        let factory: ColumnFactory<u32> = Arc::new(|_ctx| panic!("factory exploded"));
        let columns = process_columns(Some(&factory), &ColumnContext::default());
        assert!(columns.is_empty());
    }

    #[test]
    fn test_key_derivation_priority() {
        let factory: ColumnFactory<u32> = Arc::new(|_ctx| {
            vec![
                ColumnSpec::new("Name", "name").key("explicit"),
                ColumnSpec::new("Level", "event_level"),
                ColumnSpec::new("Actions", ""),
            ]
        });
        let columns = process_columns(Some(&factory), &ColumnContext::default());
        assert_eq!(columns[0].key, "explicit");
        assert_eq!(columns[1].key, "event_level");
        assert_eq!(columns[2].key, "col-2");
    }

    #[test]
    fn test_factory_sees_current_query() {
        let factory: ColumnFactory<u32> = Arc::new(|ctx| {
            if ctx.query.get("expanded").is_some() {
                vec![
                    ColumnSpec::new("Name", "name"),
                    ColumnSpec::new("Detail", "detail"),
                ]
            } else {
                vec![ColumnSpec::new("Name", "name")]
            }
        });
        let narrow = process_columns(Some(&factory), &ColumnContext::default());
        assert_eq!(narrow.len(), 1);
        let ctx = ColumnContext {
            query: Query::new().with("expanded", true),
            extra: PropBag::new(),
        };
        let wide = process_columns(Some(&factory), &ctx);
        assert_eq!(wide.len(), 2);
    }

    #[test]
    fn test_filter_key_backfill() {
        let factory: FilterFactory = Arc::new(|_ctx| {
            vec![
                FilterField::new("", "Anonymous", FilterWidget::Input),
                FilterField::new("status", "Status", FilterWidget::Select),
            ]
        });
        let fields = process_filters(Some(&factory), &FilterContext::default());
        assert_eq!(fields[0].key, "field-0");
        assert_eq!(fields[1].key, "status");
    }
}
