//! Durable response-record storage.
//!
//! One JSON file per cache key under a configured root directory. Records
//! written by this service carry a `{path, timestamp, data}` envelope; records
//! produced by earlier deployments are the bare payload. Both shapes are
//! decoded into [`StoredRecord`] at the single read-time discrimination point.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

const RECORD_EXTENSION: &str = "json";

/// A decoded on-disk record.
///
/// A value is `Enveloped` iff it is a JSON object carrying a `data` field;
/// anything else is a `Legacy` record whose entire stored value is the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    Enveloped(RecordEnvelope),
    Legacy(Value),
}

impl StoredRecord {
    /// The cached payload, with the envelope stripped when present.
    pub fn into_payload(self) -> Value {
        match self {
            StoredRecord::Enveloped(envelope) => envelope.data,
            StoredRecord::Legacy(value) => value,
        }
    }
}

/// The current persisted record shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub data: Value,
}

/// Filesystem-backed record store.
#[derive(Debug)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    /// Read the record stored under `key`.
    ///
    /// A missing file is an ordinary miss. Unreadable or unparsable content is
    /// logged and also reported as a miss; corruption must never fail the
    /// request that triggered the read.
    pub async fn get(&self, key: &str) -> Option<StoredRecord> {
        let path = self.record_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(
                    target = "snooproxy::store",
                    key,
                    error = %err,
                    "cache read failed"
                );
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    target = "snooproxy::store",
                    key,
                    error = %err,
                    "cache record is corrupt, treating as miss"
                );
                None
            }
        }
    }

    /// Write the enveloped record for `key`, fully replacing any prior content.
    pub async fn put(
        &self,
        key: &str,
        path: &str,
        timestamp: String,
        data: &Value,
    ) -> Result<(), std::io::Error> {
        let envelope = RecordEnvelope {
            path: Some(path.to_string()),
            timestamp: Some(timestamp),
            data: data.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.record_path(key), bytes).await
    }

    /// Enumerate every stored record with its file modification time.
    ///
    /// The mtime serves as the timestamp fallback for legacy records.
    /// Individual unreadable or unparsable entries are skipped without
    /// aborting the enumeration.
    pub async fn list_all(&self) -> Vec<(StoredRecord, Option<DateTime<Utc>>)> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    target = "snooproxy::store",
                    root = %self.root.display(),
                    error = %err,
                    "cache directory listing failed"
                );
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(
                        target = "snooproxy::store",
                        error = %err,
                        "cache directory entry unavailable, skipping"
                    );
                    continue;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(
                        target = "snooproxy::store",
                        file = %path.display(),
                        error = %err,
                        "cache record unreadable, skipping"
                    );
                    continue;
                }
            };

            let record: StoredRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        target = "snooproxy::store",
                        file = %path.display(),
                        error = %err,
                        "cache record is corrupt, skipping"
                    );
                    continue;
                }
            };

            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|metadata| metadata.modified().ok())
                .map(DateTime::<Utc>::from);

            records.push((record, modified));
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path().join("cache")).expect("store init");
        (dir, store)
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let (_dir, store) = store();
        assert!(store.get("0000").await.is_none());
    }

    #[tokio::test]
    async fn put_then_get_returns_envelope() {
        let (_dir, store) = store();
        let payload = json!({"ok": true});
        store
            .put("abc", "r/rust/top", "2024-01-01T00:00:00.000Z".to_string(), &payload)
            .await
            .expect("write succeeds");

        match store.get("abc").await.expect("record present") {
            StoredRecord::Enveloped(envelope) => {
                assert_eq!(envelope.path.as_deref(), Some("r/rust/top"));
                assert_eq!(
                    envelope.timestamp.as_deref(),
                    Some("2024-01-01T00:00:00.000Z")
                );
                assert_eq!(envelope.data, payload);
            }
            StoredRecord::Legacy(_) => panic!("expected enveloped record"),
        }
    }

    #[tokio::test]
    async fn overwrite_replaces_prior_record() {
        let (_dir, store) = store();
        store
            .put("abc", "r/a", "t1".to_string(), &json!({"v": 1}))
            .await
            .expect("first write");
        store
            .put("abc", "r/a", "t2".to_string(), &json!({"v": 2}))
            .await
            .expect("second write");

        let record = store.get("abc").await.expect("record present");
        assert_eq!(record.into_payload(), json!({"v": 2}));
        assert_eq!(store.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn legacy_record_round_trips_as_payload() {
        let (_dir, store) = store();
        let raw = json!([{"kind": "Listing", "children": []}]);
        std::fs::write(
            store.root().join("feedcafe.json"),
            serde_json::to_vec(&raw).expect("serialize"),
        )
        .expect("seed legacy file");

        let record = store.get("feedcafe").await.expect("record present");
        assert!(matches!(record, StoredRecord::Legacy(_)));
        assert_eq!(record.into_payload(), raw);
    }

    #[tokio::test]
    async fn object_with_data_field_is_treated_as_enveloped() {
        let (_dir, store) = store();
        std::fs::write(
            store.root().join("bare.json"),
            br#"{"data": {"x": 1}}"#,
        )
        .expect("seed file");

        let record = store.get("bare").await.expect("record present");
        match record {
            StoredRecord::Enveloped(envelope) => {
                assert!(envelope.path.is_none());
                assert!(envelope.timestamp.is_none());
                assert_eq!(envelope.data, json!({"x": 1}));
            }
            StoredRecord::Legacy(_) => panic!("object with data field must be enveloped"),
        }
    }

    #[tokio::test]
    async fn corrupt_record_is_a_miss_and_skipped_in_listing() {
        let (_dir, store) = store();
        std::fs::write(store.root().join("bad.json"), b"{not json").expect("seed file");
        store
            .put("good", "r/good", "t".to_string(), &json!({"ok": 1}))
            .await
            .expect("write");

        assert!(store.get("bad").await.is_none());
        assert_eq!(store.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn list_all_reports_modification_times() {
        let (_dir, store) = store();
        store
            .put("one", "r/one", "t".to_string(), &json!(1))
            .await
            .expect("write");

        let listed = store.list_all().await;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].1.is_some());
    }
}
