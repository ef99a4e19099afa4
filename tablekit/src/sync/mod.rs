//! Query/URL sync engine
//!
//! Bidirectionally reconciles in-memory query state with the address bar:
//! state is serialized to URL params only on a real (normalized-diff)
//! change, and URL params parse back into a typed query through per-field
//! decode functions. Params under a reserved prefix are round-tripped
//! verbatim and never touched by normalization.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use url::form_urlencoded;

use crate::error::SyncError;
use crate::query::{Query, QueryCodec, QueryValue, canonical_params, normalize};

/// Address-bar abstraction.
///
/// Only history-replace semantics are offered: the table's own query
/// changes must not pollute back/forward navigation history.
pub trait UrlAdapter: Send {
    /// Current query pairs, decoded.
    fn read(&self) -> Vec<(String, String)>;

    /// Replaces the query string with the given pairs.
    fn replace(&mut self, pairs: &[(String, String)]) -> Result<(), SyncError>;
}

/// In-memory [`UrlAdapter`] for tests and headless embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryUrl {
    query: String,
    writes: u64,
}

impl MemoryUrl {
    /// An adapter with an empty query string.
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter seeded with an encoded query string (no leading `?`).
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            writes: 0,
        }
    }

    /// The encoded query string as currently "rendered".
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of replace calls performed.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl UrlAdapter for MemoryUrl {
    fn read(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn replace(&mut self, pairs: &[(String, String)]) -> Result<(), SyncError> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key, value);
        }
        self.query = serializer.finish();
        self.writes += 1;
        Ok(())
    }
}

/// A cloneable adapter sharing one [`MemoryUrl`].
///
/// The engine owns its adapter; embeddings that also need to observe the
/// address bar (and tests asserting on writes) keep a clone of this.
#[derive(Debug, Clone, Default)]
pub struct SharedUrl {
    inner: Arc<Mutex<MemoryUrl>>,
}

impl SharedUrl {
    /// A shared adapter with an empty query string.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared adapter seeded with an encoded query string.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryUrl::from_query(query))),
        }
    }

    /// The encoded query string as currently "rendered".
    pub fn query(&self) -> String {
        self.inner
            .lock()
            .map(|url| url.query().to_string())
            .unwrap_or_default()
    }

    /// Number of replace calls performed.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().map(|url| url.write_count()).unwrap_or(0)
    }
}

impl UrlAdapter for SharedUrl {
    fn read(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|url| url.read())
            .unwrap_or_default()
    }

    fn replace(&mut self, pairs: &[(String, String)]) -> Result<(), SyncError> {
        match self.inner.lock() {
            Ok(mut url) => url.replace(pairs),
            Err(_) => Err(SyncError::Write("url adapter poisoned".to_string())),
        }
    }
}

/// Keys excluded from sync, matched by prefix.
///
/// Matching params are preserved verbatim on write and stripped on read,
/// so unrelated state (auth tickets, embedding params) survives the table's
/// URL rewrites untouched.
#[derive(Debug, Clone, Default)]
pub struct ReservedKeys {
    prefixes: Vec<String>,
}

impl ReservedKeys {
    /// No reserved keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reserved prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Returns `true` when the key falls under a reserved prefix.
    pub fn matches(&self, key: &str) -> bool {
        self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Master switch; when off, both directions are no-ops.
    pub enabled: bool,
    /// Per-field decode functions for the URL-to-query direction.
    pub codec: QueryCodec,
    /// Reserved-prefix exclusion set.
    pub reserved: ReservedKeys,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            codec: QueryCodec::new(),
            reserved: ReservedKeys::new(),
        }
    }
}

/// Reconciles one table's query state with one URL.
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncConfig,
    /// Last normalized query written out; the loop-breaker compares
    /// against this before touching the URL.
    last_synced: Option<Query>,
}

impl SyncEngine {
    /// Creates an engine from its configuration.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            last_synced: None,
        }
    }

    /// Returns `true` when sync is enabled.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Serializes the query into the URL.
    ///
    /// No-op when sync is disabled or when the normalized query equals the
    /// last one written; without that comparison a URL write would trigger
    /// a re-render, which recomputes the query, which would re-trigger a
    /// write. Reserved params are carried over verbatim; list fields become
    /// repeated keys; map fields serialize as JSON. A failed write is
    /// logged and the in-memory query stays authoritative.
    pub fn sync_query_to_url(&mut self, query: &Query, url: &mut dyn UrlAdapter) {
        if !self.config.enabled {
            return;
        }
        let normalized = normalize(query);
        if self.last_synced.as_ref() == Some(&normalized) {
            return;
        }

        let rendered = url.read();
        let mut pairs: Vec<(String, String)> = rendered
            .iter()
            .filter(|(key, _)| self.config.reserved.matches(key))
            .cloned()
            .collect();
        for (field, value) in normalized.iter() {
            match value {
                QueryValue::List(items) => {
                    for item in items {
                        pairs.push((field.clone(), item.to_param_string()));
                    }
                }
                other => pairs.push((field.clone(), other.to_param_string())),
            }
        }

        // The URL may already render this exact param set (e.g. a fresh
        // engine over a seeded address bar); skip the redundant write.
        if canonical_params(&pairs) == canonical_params(&rendered) {
            self.last_synced = Some(normalized);
            return;
        }

        match url.replace(&pairs) {
            Ok(()) => self.last_synced = Some(normalized),
            Err(err) => log::warn!("query sync: url write failed: {err}"),
        }
    }

    /// Parses the URL back into a typed query.
    ///
    /// Returns an empty query when sync is disabled. Every non-reserved key
    /// is decoded through the codec (identity fallback for unregistered
    /// keys, so ad-hoc params still populate the query). Repeated keys
    /// accumulate into a list, unless the decoder itself returns a list, in
    /// which case that list replaces the accumulator. The result is
    /// normalized before returning.
    pub fn sync_url_to_query(&self, url: &dyn UrlAdapter) -> Query {
        if !self.config.enabled {
            return Query::new();
        }
        let mut accumulated: BTreeMap<String, QueryValue> = BTreeMap::new();
        for (key, raw) in url.read() {
            if self.config.reserved.matches(&key) {
                continue;
            }
            let decoded = self.config.codec.decode(&key, &raw);
            match accumulated.remove(&key) {
                None => {
                    accumulated.insert(key, decoded);
                }
                Some(previous) => {
                    let merged = match (previous, decoded) {
                        // A list-returning decoder replaces the accumulator.
                        (_, QueryValue::List(items)) => QueryValue::List(items),
                        (QueryValue::List(mut items), single) => {
                            items.push(single);
                            QueryValue::List(items)
                        }
                        (first, second) => QueryValue::List(vec![first, second]),
                    };
                    accumulated.insert(key, merged);
                }
            }
        }
        normalize(&Query::from(accumulated))
    }

    /// Forgets the last synced query, forcing the next write through.
    pub fn invalidate(&mut self) {
        self.last_synced = None;
    }
}
