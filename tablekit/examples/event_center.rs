//! Event-center table example: a full wiring of the engine against a
//! simulated backend.
//!
//! Run with: cargo run --example event_center
//!
//! Demonstrates:
//! - a remote data source with server pagination
//! - URL seeding and query/URL sync (observed through a SharedUrl)
//! - column and filter factories driven by the current query
//! - an alert plugin rendering into a fixed slot
//! - a wrapped delete handler triggering an automatic refresh

use std::sync::Arc;

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use tablekit::prelude::*;

// =============================================================================
// Data types
// =============================================================================

/// An event record from our "API".
#[derive(Debug, Clone)]
struct Event {
    id: u64,
    title: String,
    level: String,
}

// =============================================================================
// Simulated API
// =============================================================================

const TOTAL_EVENTS: u64 = 57;

fn event_source() -> SourceConfig<Event> {
    SourceConfig::remote(Arc::new(FnSource::new(|params| {
        Box::pin(async move {
            let level_filter: Vec<String> = params
                .query
                .get("event_level")
                .and_then(|v| v.as_list())
                .map(|items| items.iter().map(|i| i.to_param_string()).collect())
                .unwrap_or_default();

            let start = (params.current - 1) * params.page_size;
            let rows = (start..TOTAL_EVENTS.min(start + params.page_size))
                .map(|i| Event {
                    id: i,
                    title: format!("Event #{i}"),
                    level: if i % 3 == 0 { "P1" } else { "P2" }.to_string(),
                })
                .filter(|e| level_filter.is_empty() || level_filter.contains(&e.level))
                .collect();
            Ok(FetchPage::with_total(rows, TOTAL_EVENTS))
        })
    })))
}

// =============================================================================
// Plugins
// =============================================================================

struct AlertPlugin;

impl Plugin for AlertPlugin {
    fn name(&self) -> &str {
        "alert"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::RendersSlot(Slot::Alert), Capability::RendersSlot(Slot::NoData)]
    }

    fn render(&self, slot: Slot, args: &RenderArgs) -> Result<Option<Fragment>, PluginError> {
        match slot {
            Slot::Alert => Ok(Some(Fragment::widget(
                "banner",
                args.props.clone().with("tone", "info"),
            ))),
            Slot::NoData => Ok(Some(Fragment::text("No events match the current filters."))),
            _ => Ok(None),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger");

    // Pretend the page was opened with a filter already in the address bar.
    let url = SharedUrl::from_query("event_level=P1");

    let columns: ColumnFactory<Event> = Arc::new(|_ctx| {
        vec![
            ColumnSpec::new("ID", "id"),
            ColumnSpec::new("Title", "title"),
            ColumnSpec::new("Level", "event_level")
                .render(|event: &Event| Fragment::text(event.level.clone())),
        ]
    });

    let filters: FilterFactory = Arc::new(|_ctx| {
        vec![
            FilterField::new("event_level", "Level", FilterWidget::MultiSelect).options(vec![
                FilterOption::new("Critical", "P1"),
                FilterOption::new("Major", "P2"),
            ]),
        ]
    });

    let source = event_source();
    let options = TableOptions::new(source.clone())
        .plugins(vec![Arc::new(AlertPlugin)])
        .columns(columns)
        .filters(filters)
        .scroll(ScrollHeight::offset(350).min(300).max(800));
    let engine = TableEngine::new(options, Box::new(url.clone()));

    println!("scroll height: {:?}", engine.scroll_y());
    println!("columns: {:?}", engine.columns());
    println!("filters: {:?}", engine.filter_fields());
    println!("seeded query: {:?}", engine.snapshot().query);

    engine.refresh().await;
    println!("page 1 (P1 only): {} rows", engine.snapshot().rows.len());

    // Widen the filter; the URL follows.
    engine
        .apply_filter_change(FilterChange {
            key: "event_level".to_string(),
            value: QueryValue::from(vec!["P1", "P2"]),
        })
        .await;
    println!("url after filter change: ?{}", url.query());
    println!("page 1 (all levels): {} rows", engine.snapshot().rows.len());

    // Wire a delete operation with automatic refresh.
    let slot = HandleSlot::new();
    slot.attach(engine.handle());
    let table = BusinessTable::simple(
        slot,
        &source,
        Handlers::new().on_delete(|args: OperationArgs| {
            Box::pin(async move {
                println!("deleting {:?}", args.keys);
                Ok(true)
            })
        }),
        RefreshFeedback::default(),
    );

    if let Some(delete) = &table.wrapped.delete {
        delete(OperationArgs::keys(vec!["3".to_string()]))
            .await
            .expect("delete");
    }
    println!("rows after delete+refresh: {}", engine.snapshot().rows.len());

    let slots = engine.compose_slots();
    println!("alert slot: {:?}", slots.alert);
    println!("no-data slot: {:?}", slots.no_data);
}
