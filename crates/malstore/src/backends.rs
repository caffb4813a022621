//! 🔌 Backends — where the requests actually go.
//!
//! 🎭 The [`ResultStore`](crate::result_store::ResultStore) doesn't know or care whether
//! it's talking to a real Elasticsearch cluster or a HashMap with delusions of grandeur.
//! It talks to a [`DocumentStore`]. This module is the casting agency for those.
//!
//! - `Elasticsearch`: HTTP via reqwest. The real deal.
//! - `InMemory`: process-local, for tests and dry runs. Swaps plugin entries in exactly
//!   like the cluster's update script does, so the upsert contract can be checked without a JVM warming up.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use async_trait::async_trait;
use serde_json::Value;

use crate::app_config::BackendConfig;
use crate::common::{ClusterHealth, IndexStatus, PluginEntry, StoredDocument, UpsertOutcome};
use crate::errors::Result;
use crate::mapping::IndexSchema;

pub mod elasticsearch;
pub mod in_mem;

pub use elasticsearch::{ElasticsearchConfig, ElasticsearchStore};
pub use in_mem::InMemoryStore;

/// 🔒 Compare-and-swap coordinates. Hand these to an update and it only lands if
/// nobody else wrote in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGuard {
    pub seq_no: u64,
    pub primary_term: u64,
}

/// 📡 The six things we ever ask of a document store.
///
/// # Contract
/// - `get_document` returns `Ok(None)` for a missing document (or a missing index). Not-found is not an error.
/// - `put_plugin_entry` replaces `plugins.<category>.<name>` whole and refreshes `scan_date`.
///   Sibling plugins, sibling categories and every other top-level field are left alone.
///   A missing document is a `Protocol` 404.
/// - `create_document` never overwrites. An occupied ID is a `Conflict`.
/// - A stale `VersionGuard` is a `Conflict`.
#[async_trait]
pub trait DocumentStore: std::fmt::Debug + Send + Sync {
    async fn cluster_health(&self) -> Result<ClusterHealth>;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<IndexStatus>;

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>>;

    /// `id: None` lets the store pick one.
    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<UpsertOutcome>;

    async fn put_plugin_entry(
        &self,
        index: &str,
        id: &str,
        entry: &PluginEntry,
        guard: Option<VersionGuard>,
    ) -> Result<UpsertOutcome>;
}

/// 🎭 The many faces of a store. Dispatches to whichever backend config asked for.
#[derive(Debug)]
pub enum StoreBackend {
    Elasticsearch(ElasticsearchStore),
    InMemory(InMemoryStore),
}

impl StoreBackend {
    /// 🏗️ Build the backend the config describes. No network I/O happens here.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Elasticsearch(es) => {
                Ok(StoreBackend::Elasticsearch(ElasticsearchStore::new(es.clone())?))
            }
            BackendConfig::InMemory => Ok(StoreBackend::InMemory(InMemoryStore::new())),
        }
    }

    /// 📡 Human-readable description of where requests go. For logs and tables.
    pub fn describe(&self) -> String {
        match self {
            StoreBackend::Elasticsearch(es) => es.base_url().to_string(),
            StoreBackend::InMemory(_) => "in-memory".to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for StoreBackend {
    async fn cluster_health(&self) -> Result<ClusterHealth> {
        match self {
            StoreBackend::Elasticsearch(es) => es.cluster_health().await,
            StoreBackend::InMemory(mem) => mem.cluster_health().await,
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        match self {
            StoreBackend::Elasticsearch(es) => es.index_exists(index).await,
            StoreBackend::InMemory(mem) => mem.index_exists(index).await,
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<IndexStatus> {
        match self {
            StoreBackend::Elasticsearch(es) => es.create_index(index, schema).await,
            StoreBackend::InMemory(mem) => mem.create_index(index, schema).await,
        }
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>> {
        match self {
            StoreBackend::Elasticsearch(es) => es.get_document(index, id).await,
            StoreBackend::InMemory(mem) => mem.get_document(index, id).await,
        }
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<UpsertOutcome> {
        match self {
            StoreBackend::Elasticsearch(es) => es.create_document(index, id, document).await,
            StoreBackend::InMemory(mem) => mem.create_document(index, id, document).await,
        }
    }

    async fn put_plugin_entry(
        &self,
        index: &str,
        id: &str,
        entry: &PluginEntry,
        guard: Option<VersionGuard>,
    ) -> Result<UpsertOutcome> {
        match self {
            StoreBackend::Elasticsearch(es) => es.put_plugin_entry(index, id, entry, guard).await,
            StoreBackend::InMemory(mem) => mem.put_plugin_entry(index, id, entry, guard).await,
        }
    }
}
