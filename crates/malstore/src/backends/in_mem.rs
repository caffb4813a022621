//! # Previously, on Malstore...
//!
//! 🎬 The samples needed a home. The cluster was still booting. The JVM was thinking
//! about its heap. Someone had to hold the documents in the meantime.
//!
//! That someone was this module.
//!
//! `InMemoryStore` is a [`DocumentStore`] that lives entirely in RAM behind an
//! `Arc<Mutex<...>>`, so tests can clone a handle, hand the original to a
//! `ResultStore`, and still peek inside afterwards. It keeps the same contracts the
//! cluster does: pinned creates refuse to overwrite, plugin entries are replaced whole
//! while their siblings stay, stale version guards lose, missing documents are `None`.
//!
//! It also has knobs the real cluster won't give you on demand: unplug the network
//! (`set_reachable(false)`), make the health check crawl (`set_health_latency`), and
//! withhold index-creation acknowledgement.
//!
//! ⚠️ This is NOT for production. If you're deploying this to prod, please also deploy
//! a therapist. 🦆

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backends::{DocumentStore, VersionGuard};
use crate::common::{
    ClusterHealth, HealthStatus, IndexStatus, PluginEntry, StoredDocument, UpsertOutcome,
    WriteResult,
};
use crate::errors::{Result, StoreError};
use crate::mapping::IndexSchema;
use crate::merge;

const PRIMARY_TERM: u64 = 1;

#[derive(Debug, Clone)]
struct StoredRecord {
    version: u64,
    seq_no: u64,
    source: Value,
}

#[derive(Debug, Default)]
struct InMemoryIndex {
    schema: Option<IndexSchema>,
    documents: BTreeMap<String, StoredRecord>,
    next_seq_no: u64,
}

#[derive(Debug)]
struct InMemoryState {
    reachable: bool,
    health_latency: Duration,
    acknowledge_index_creation: bool,
    indices: BTreeMap<String, InMemoryIndex>,
    index_creations: usize,
    next_auto_id: u64,
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self {
            reachable: true,
            health_latency: Duration::ZERO,
            acknowledge_index_creation: true,
            indices: BTreeMap::new(),
            index_creations: 0,
            next_auto_id: 1,
        }
    }
}

/// 📦 A document store that never forgets (until the process exits).
///
/// Clone-able because tests need to peek inside after handing a copy to the `ResultStore`.
/// The `Arc` means every clone shares the same state.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🔌 Unplug (or replug) the pretend network cable.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// 🐌 Make every health check take this long before answering, like a cluster
    /// behind a firewall that drops packets instead of refusing them.
    pub async fn set_health_latency(&self, latency: Duration) {
        self.state.lock().await.health_latency = latency;
    }

    /// ⚠️ Make index creation come back unacknowledged, like a cluster under pressure.
    pub async fn set_acknowledge_index_creation(&self, acknowledge: bool) {
        self.state.lock().await.acknowledge_index_creation = acknowledge;
    }

    /// 🧮 How many times an index was actually created (not auto-created by a write).
    pub async fn index_creations(&self) -> usize {
        self.state.lock().await.index_creations
    }

    /// 🔍 Peek at a stored document's source without going through the trait.
    pub async fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(index)
            .and_then(|idx| idx.documents.get(id))
            .map(|record| record.source.clone())
    }

    /// 🧮 Number of documents in an index. Zero if the index doesn't exist.
    pub async fn document_count(&self, index: &str) -> usize {
        let state = self.state.lock().await;
        state.indices.get(index).map_or(0, |idx| idx.documents.len())
    }

    /// 📐 The schema an index was created with, if it was created explicitly.
    pub async fn schema_of(&self, index: &str) -> Option<IndexSchema> {
        let state = self.state.lock().await;
        state.indices.get(index).and_then(|idx| idx.schema.clone())
    }
}

fn unplugged(op: &'static str, target: &str) -> StoreError {
    StoreError::connectivity(
        op,
        target,
        std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "in-memory store is unplugged",
        ),
    )
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn cluster_health(&self) -> Result<ClusterHealth> {
        let latency = self.state.lock().await.health_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged("cluster health", "in-memory"));
        }
        Ok(ClusterHealth {
            cluster_name: "in-memory".to_string(),
            status: HealthStatus::Green,
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged("index exists", index));
        }
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<IndexStatus> {
        let mut state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged("create index", index));
        }
        if state.indices.contains_key(index) {
            return Ok(IndexStatus::AlreadyExists);
        }
        state.index_creations += 1;
        state.indices.insert(
            index.to_string(),
            InMemoryIndex {
                schema: Some(schema.clone()),
                ..Default::default()
            },
        );
        Ok(if state.acknowledge_index_creation {
            IndexStatus::Created
        } else {
            IndexStatus::CreatedUnacknowledged
        })
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>> {
        let state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged("get document", &format!("{index}/{id}")));
        }
        Ok(state
            .indices
            .get(index)
            .and_then(|idx| idx.documents.get(id))
            .map(|record| StoredDocument {
                id: id.to_string(),
                version: Some(record.version),
                seq_no: Some(record.seq_no),
                primary_term: Some(PRIMARY_TERM),
                source: record.source.clone(),
            }))
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<UpsertOutcome> {
        let mut state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged("create document", index));
        }

        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let minted = format!("mem-{}", state.next_auto_id);
                state.next_auto_id += 1;
                minted
            }
        };

        // 🏗️ like the real thing, writing into a missing index auto-creates it
        let idx = state.indices.entry(index.to_string()).or_default();
        if idx.documents.contains_key(&id) {
            return Err(StoreError::conflict("create document", format!("{index}/{id}")));
        }
        let seq_no = idx.next_seq_no;
        idx.next_seq_no += 1;
        idx.documents.insert(
            id.clone(),
            StoredRecord {
                version: 1,
                seq_no,
                source: document.clone(),
            },
        );

        Ok(UpsertOutcome {
            id,
            result: WriteResult::Created,
            version: Some(1),
        })
    }

    async fn put_plugin_entry(
        &self,
        index: &str,
        id: &str,
        entry: &PluginEntry,
        guard: Option<VersionGuard>,
    ) -> Result<UpsertOutcome> {
        const OP: &str = "put plugin entry";
        let target = format!("{index}/{id}");
        let mut state = self.state.lock().await;
        if !state.reachable {
            return Err(unplugged(OP, &target));
        }

        let Some(idx) = state.indices.get_mut(index) else {
            return Err(StoreError::protocol(OP, target, Some(404), "index_not_found_exception"));
        };
        let next_seq_no = idx.next_seq_no;
        let Some(record) = idx.documents.get_mut(id) else {
            return Err(StoreError::protocol(OP, target, Some(404), "document_missing_exception"));
        };

        if let Some(guard) = guard {
            if guard.seq_no != record.seq_no || guard.primary_term != PRIMARY_TERM {
                return Err(StoreError::conflict(OP, target));
            }
        }

        let mut written = record.source.clone();
        merge::put_plugin_entry(&mut written, entry);
        if written == record.source {
            return Ok(UpsertOutcome {
                id: id.to_string(),
                result: WriteResult::Noop,
                version: Some(record.version),
            });
        }

        record.source = written;
        record.version += 1;
        record.seq_no = next_seq_no;
        let version = record.version;
        idx.next_seq_no += 1;

        Ok(UpsertOutcome {
            id: id.to_string(),
            result: WriteResult::Updated,
            version: Some(version),
        })
    }
}
