use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

use tablekit::columns::{ColumnFactory, ColumnSpec, FilterChange};
use tablekit::error::FetchError;
use tablekit::query::{Query, QueryValue};
use tablekit::source::{FetchPage, FnSource, SourceConfig};
use tablekit::state::StoreConfig;
use tablekit::sync::{MemoryUrl, ReservedKeys, SharedUrl, SyncConfig};
use tablekit::table::{TableEngine, TableOptions};

/// Source returning one page per call: row = page number, total = 100.
fn paging_source(fetches: Arc<AtomicUsize>) -> SourceConfig<u64> {
    SourceConfig::remote(Arc::new(FnSource::new(move |params| {
        let fetches = Arc::clone(&fetches);
        Box::pin(async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(FetchPage::with_total(vec![params.current], 100))
        })
    })))
}

#[tokio::test]
async fn test_refresh_applies_page_and_clears_loading() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let engine = TableEngine::new(
        TableOptions::new(paging_source(Arc::clone(&fetches))),
        Box::new(MemoryUrl::new()),
    );

    assert!(engine.snapshot().never_searched);
    let outcome = engine.refresh().await;
    assert!(outcome.success);

    let state = engine.snapshot();
    assert_eq!(state.rows, vec![1]);
    assert_eq!(state.total, 100);
    assert!(!state.loading);
    assert!(!state.never_searched);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_fetch_error_lands_in_state_and_clears_on_retry() {
    let failing = Arc::new(AtomicBool::new(true));
    let source = SourceConfig::remote(Arc::new(FnSource::new({
        let failing = Arc::clone(&failing);
        move |_params| {
            let failing = Arc::clone(&failing);
            Box::pin(async move {
                if failing.load(Ordering::SeqCst) {
                    Err(FetchError::request("gateway timeout"))
                } else {
                    Ok(FetchPage::with_total(vec![7u64], 1))
                }
            })
        }
    })));
    let engine = TableEngine::new(TableOptions::new(source), Box::new(MemoryUrl::new()));

    let outcome = engine.refresh().await;
    assert!(!outcome.success);
    assert_eq!(
        engine.snapshot().error,
        Some(FetchError::Request("gateway timeout".to_string()))
    );

    // The error is cleared at the start of the next request.
    failing.store(false, Ordering::SeqCst);
    let outcome = engine.refresh().await;
    assert!(outcome.success);
    let state = engine.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.rows, vec![7]);
}

#[tokio::test]
async fn test_not_ready_suppresses_fetching() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = paging_source(Arc::clone(&fetches)).with_ready(false);
    let engine = TableEngine::new(TableOptions::new(source), Box::new(MemoryUrl::new()));

    let outcome = engine.refresh().await;
    assert!(outcome.success);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_response_is_dropped() {
    let gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let source = SourceConfig::remote(Arc::new(FnSource::new({
        let gate = Arc::clone(&gate);
        let started = Arc::clone(&started);
        let calls = Arc::clone(&calls);
        move |_params| {
            let gate = Arc::clone(&gate);
            let started = Arc::clone(&started);
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if call == 1 {
                    // First fetch stalls until released.
                    started.notify_one();
                    gate.notified().await;
                    Ok(FetchPage::with_total(vec!["stale".to_string()], 1))
                } else {
                    Ok(FetchPage::with_total(vec!["fresh".to_string()], 1))
                }
            })
        }
    })));
    let engine = TableEngine::new(TableOptions::new(source), Box::new(MemoryUrl::new()));

    let slow = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.refresh().await }
    });
    started.notified().await;

    // A newer fetch completes while the first is still in flight.
    let fast = engine.refresh().await;
    assert!(fast.success);
    assert_eq!(engine.snapshot().rows, vec!["fresh".to_string()]);

    // The stalled response lands afterwards and is dropped.
    gate.notify_one();
    let slow = slow.await.expect("join");
    assert!(slow.success);
    assert_eq!(engine.snapshot().rows, vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_load_more_appends_pages() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = paging_source(Arc::clone(&fetches)).with_server_pagination(false);
    let engine = TableEngine::new(TableOptions::new(source), Box::new(MemoryUrl::new()));

    engine.refresh().await;
    assert_eq!(engine.snapshot().rows, vec![1]);

    engine.change_page(2, None).await;
    assert_eq!(engine.snapshot().rows, vec![1, 2]);

    // Server pagination would have replaced instead.
    engine.change_page(3, None).await;
    assert_eq!(engine.snapshot().rows, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_server_pagination_replaces_pages() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let engine = TableEngine::new(
        TableOptions::new(paging_source(Arc::clone(&fetches))),
        Box::new(MemoryUrl::new()),
    );

    engine.refresh().await;
    engine.change_page(2, Some(50)).await;
    let state = engine.snapshot();
    assert_eq!(state.rows, vec![2]);
    assert_eq!(state.current, 2);
    assert_eq!(state.page_size, 50);
}

#[tokio::test]
async fn test_url_seeds_initial_query() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let mut options = TableOptions::new(paging_source(Arc::clone(&fetches)));
    options.sync = SyncConfig {
        enabled: true,
        codec: Default::default(),
        reserved: ReservedKeys::new().with_prefix("auth_"),
    };
    let engine = TableEngine::new(
        options,
        Box::new(MemoryUrl::from_query("status=open&auth_ticket=t-1")),
    );

    let query = engine.snapshot().query;
    assert_eq!(query.get("status"), Some(&QueryValue::from("open")));
    assert!(query.get("auth_ticket").is_none());
}

#[tokio::test]
async fn test_query_change_rewinds_page_and_syncs_url() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let url = SharedUrl::new();
    let engine = TableEngine::new(
        TableOptions::new(paging_source(Arc::clone(&fetches))),
        Box::new(url.clone()),
    );

    engine.change_page(4, None).await;
    assert_eq!(engine.snapshot().current, 4);

    engine
        .apply_filter_change(FilterChange {
            key: "event_level".to_string(),
            value: QueryValue::from(vec!["P2", "P1"]),
        })
        .await;

    let state = engine.snapshot();
    assert_eq!(state.current, 1);
    assert_eq!(url.query(), "event_level=P1&event_level=P2");

    // Clearing the field through the sanctioned channel removes it.
    engine
        .apply_filter_change(FilterChange {
            key: "event_level".to_string(),
            value: QueryValue::Null,
        })
        .await;
    assert!(engine.snapshot().query.get("event_level").is_none());
    assert_eq!(url.query(), "");
}

#[tokio::test]
async fn test_submitting_same_query_twice_writes_url_once() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let url = SharedUrl::new();
    let engine = TableEngine::new(
        TableOptions::new(paging_source(Arc::clone(&fetches))),
        Box::new(url.clone()),
    );

    engine.submit_query(Query::new().with("status", "open")).await;
    engine.submit_query(Query::new().with("status", "open")).await;
    assert_eq!(url.write_count(), 1);
    // Both submissions still fetched.
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reset_with_empty_placeholder_skips_fetch() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let engine = TableEngine::new(
        TableOptions::new(paging_source(Arc::clone(&fetches))),
        Box::new(MemoryUrl::new()),
    );

    engine.refresh().await;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    engine.reset(true).await;
    let state = engine.snapshot();
    assert!(state.rows.is_empty());
    assert!(state.shows_empty_placeholder());
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // A plain reset refetches the defaults.
    engine.reset(false).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_columns_follow_query_snapshot() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let factory: ColumnFactory<u64> = Arc::new(|ctx| {
        let mut specs = vec![ColumnSpec::new("Page", "page")];
        if ctx.query.get("detailed").is_some() {
            specs.push(ColumnSpec::new("Detail", "detail"));
        }
        specs
    });
    let mut options = TableOptions::new(paging_source(Arc::clone(&fetches)));
    options.store = StoreConfig::default();
    let engine = TableEngine::new(options.columns(factory), Box::new(MemoryUrl::new()));

    assert_eq!(engine.columns().len(), 1);
    engine.merge_query(Query::new().with("detailed", true)).await;
    let columns = engine.columns();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].key, "detail");
}
