//! Response cache orchestration: key derivation, lookup/store, bulk import
//! and the derived listing projection.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::infra::store::{RecordStore, StoredRecord};

/// Sentinel path for records persisted before the envelope format existed.
const UNKNOWN_PATH: &str = "unknown";
/// Placeholder for display fields the payload shape does not provide.
const UNKNOWN_FIELD: &str = "Unknown";

/// Derive the stable cache key for a logical resource path.
///
/// Deterministic, fixed-length, filesystem-safe. Collisions are accepted as
/// cryptographically negligible; this is a cache key, not a security boundary.
pub fn cache_key(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    hex::encode(digest)
}

/// Display-oriented projection of one stored record. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub path: String,
    pub timestamp: String,
    pub data: Value,
    pub title: String,
    pub subreddit: String,
    pub author: String,
}

/// Orchestrates reads and writes against the record store.
#[derive(Debug, Clone)]
pub struct CacheService {
    store: Arc<RecordStore>,
}

impl CacheService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Return the cached payload for `path`, envelope stripped.
    pub async fn lookup(&self, path: &str) -> Option<Value> {
        let key = cache_key(path);
        match self.store.get(&key).await {
            Some(record) => {
                counter!("snooproxy_cache_hit_total").increment(1);
                debug!(target = "snooproxy::cache", path, "cache hit");
                Some(record.into_payload())
            }
            None => {
                counter!("snooproxy_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Persist `data` for `path`, stamped with the current time.
    ///
    /// Caching is a performance optimisation, not a durability guarantee:
    /// write failures are logged and swallowed so the caller's request still
    /// succeeds with the freshly fetched data.
    pub async fn store(&self, path: &str, data: &Value) {
        self.write_with_timestamp(path, now_iso(), data).await;
    }

    /// Import externally supplied records. Entries missing a non-empty `path`
    /// or a `data` payload are silently skipped. Returns the number of records
    /// actually written.
    pub async fn bulk_import(&self, entries: &[Value]) -> usize {
        let mut imported = 0;
        for entry in entries {
            let Some(path) = entry
                .get("path")
                .and_then(Value::as_str)
                .filter(|path| !path.is_empty())
            else {
                continue;
            };
            let Some(data) = entry.get("data") else {
                continue;
            };

            let timestamp = entry
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(now_iso);

            if self.write_with_timestamp(path, timestamp, data).await {
                imported += 1;
            }
        }

        counter!("snooproxy_cache_import_total").increment(imported as u64);
        imported
    }

    /// Project every stored record into a listing entry, newest first.
    ///
    /// Timestamps are compared as strings; ISO-8601 values in a uniform zone
    /// order correctly, and legacy fallbacks degrade to a best-effort order.
    pub async fn summarize(&self) -> Vec<SummaryEntry> {
        let mut entries: Vec<SummaryEntry> = self
            .store
            .list_all()
            .await
            .into_iter()
            .map(|(record, modified)| project(record, modified))
            .collect();

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    async fn write_with_timestamp(&self, path: &str, timestamp: String, data: &Value) -> bool {
        let key = cache_key(path);
        match self.store.put(&key, path, timestamp, data).await {
            Ok(()) => {
                counter!("snooproxy_cache_store_total").increment(1);
                debug!(target = "snooproxy::cache", path, key, "cached response");
                true
            }
            Err(err) => {
                counter!("snooproxy_cache_store_error_total").increment(1);
                warn!(
                    target = "snooproxy::cache",
                    path,
                    key,
                    error = %err,
                    "cache write failed, continuing without caching"
                );
                false
            }
        }
    }
}

fn project(record: StoredRecord, modified: Option<DateTime<Utc>>) -> SummaryEntry {
    let (path, timestamp, data) = match record {
        StoredRecord::Enveloped(envelope) => (
            envelope.path.unwrap_or_else(|| UNKNOWN_PATH.to_string()),
            envelope
                .timestamp
                .unwrap_or_else(|| fallback_timestamp(modified)),
            envelope.data,
        ),
        StoredRecord::Legacy(value) => (
            UNKNOWN_PATH.to_string(),
            fallback_timestamp(modified),
            value,
        ),
    };

    let title = display_field(&data, "title");
    let subreddit = display_field(&data, "subreddit");
    let author = display_field(&data, "author");

    SummaryEntry {
        path,
        timestamp,
        data,
        title,
        subreddit,
        author,
    }
}

/// Best-effort extraction of one display field from the Reddit listing shape
/// `payload[0].data.children[0].data.<field>`. Each field resolves and
/// defaults independently; a shape mismatch is never an error.
fn display_field(payload: &Value, field: &str) -> String {
    first_post(payload)
        .and_then(|post| post.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
}

fn first_post(payload: &Value) -> Option<&Value> {
    payload
        .get(0)?
        .get("data")?
        .get("children")?
        .get(0)?
        .get("data")
}

fn fallback_timestamp(modified: Option<DateTime<Utc>>) -> String {
    modified
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
