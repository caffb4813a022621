//! 🧫 The Result Store Client — where plugin verdicts go to live together peacefully.
//!
//! 🎬 *[ClamAV and VirusTotal walk into the same document]*
//! *["I was here first," says ClamAV. "There's room for both of us," says the plugins tree.]*
//!
//! 🧠 Knowledge graph:
//! - `test_connection` / `wait_for_connection`: liveness check, and a fixed-interval poll on it
//! - `ensure_index`: HEAD, then PUT with the schema if absent. Unacknowledged = warning, not failure
//! - `upsert_plugin_result`: GET the sample; found → swap in `plugins.<category>.<name>`,
//!   missing → create at the sample ID. Optional compare-and-swap on top.
//! - `store_file_info` / `store_hash`: write-once initializers seeded with a placeholder plugin map
//!
//! Every write path makes sure the samples index exists with its schema first, once per
//! `ResultStore`. Otherwise the first create would auto-create the index with dynamic
//! mappings and the schema would never get a say.
//!
//! Document IDs are always the sample ID (its content hash), on create and on update.
//! That's what lets the next plugin's upsert find the document the previous one made.
//!
//! ⚠️ Without `optimistic_concurrency`, two upserts for the same sample can interleave
//! between the GET and the write. Each write only touches its own plugin entry, so sibling
//! plugins survive; what you lose is ordering between writers of the *same* plugin entry.

use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::app_config::{AppConfig, UpsertConfig};
use crate::backends::{DocumentStore, StoreBackend, VersionGuard};
use crate::common::{
    ClusterHealth, IndexStatus, PluginEntry, PluginResult, StoredDocument, UpsertOutcome,
    scan_date_now,
};
use crate::errors::{Result, StoreError};
use crate::hashes::HashKind;
use crate::mapping::IndexSchema;

/// 🧫 The one component with a job. Everything else in this crate is its supporting cast.
#[derive(Debug)]
pub struct ResultStore {
    store: StoreBackend,
    index: String,
    placeholder_plugins: Map<String, Value>,
    upsert: UpsertConfig,
    poll_interval: Duration,
    samples_index_ready: OnceCell<IndexStatus>,
}

impl ResultStore {
    /// 🏗️ Build the backend the config describes and wrap it. No network I/O yet.
    pub fn from_config(app_config: &AppConfig) -> Result<Self> {
        let store = StoreBackend::from_config(&app_config.backend)?;
        Ok(Self::with_backend(store, app_config))
    }

    /// 🏗️ Wrap an already-built backend. Tests hand in an `InMemory` one they kept a handle to.
    pub fn with_backend(store: StoreBackend, app_config: &AppConfig) -> Self {
        Self {
            store,
            index: app_config.index.name.clone(),
            placeholder_plugins: app_config.placeholder_plugins(),
            upsert: app_config.upsert.clone(),
            poll_interval: app_config.connection.poll_interval(),
            samples_index_ready: OnceCell::new(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.store
    }

    /// 🩺 One liveness check. Healthy means: the store answered 2xx with a parseable payload.
    pub async fn test_connection(&self) -> Result<ClusterHealth> {
        let health = self.store.cluster_health().await?;
        debug!(
            "🩺 store is alive: cluster '{}' reports {:?}",
            health.cluster_name, health.status
        );
        Ok(health)
    }

    /// ⏰ Check every `poll_interval` until it works or `timeout_after` runs out.
    ///
    /// Never gives up before `timeout`, never later than `timeout + poll_interval`.
    /// Each health check only gets whatever is left of the deadline, so a cluster that swallows
    /// packets can't hold us hostage for a whole connect timeout. On timeout the last
    /// failure rides along inside the error.
    pub async fn wait_for_connection(&self, timeout_after: Duration) -> Result<ClusterHealth> {
        let started = Instant::now();
        let deadline = started + timeout_after;
        let mut attempt: u32 = 0;
        let mut last_failure: Option<StoreError> = None;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.test_connection()).await {
                Ok(Ok(health)) => {
                    info!("✅ store reachable after {} attempt(s)", attempt);
                    return Ok(health);
                }
                Ok(Err(err)) => last_failure = Some(err),
                Err(elapsed) => {
                    // ⏰ the health check itself ate the rest of the deadline
                    let last = last_failure.unwrap_or_else(|| {
                        StoreError::connectivity("cluster health", self.store.describe(), elapsed)
                    });
                    return Err(StoreError::Timeout {
                        waited: started.elapsed(),
                        last: Box::new(last),
                    });
                }
            }

            let now = Instant::now();
            if now >= deadline {
                if let Some(last) = last_failure {
                    return Err(StoreError::Timeout {
                        waited: now - started,
                        last: Box::new(last),
                    });
                }
            }
            if let Some(err) = &last_failure {
                warn!("⏳ store not reachable yet (attempt {}): {}", attempt, err);
            }
            sleep(self.poll_interval.min(deadline.saturating_duration_since(now))).await;
        }
    }

    /// 🏗️ Make sure `name` exists, creating it with `schema` if it doesn't.
    ///
    /// Idempotent: N calls, one creation. An unacknowledged creation is logged as a
    /// warning and still counts as success; the index may be usable anyway.
    pub async fn ensure_index(&self, name: &str, schema: &IndexSchema) -> Result<IndexStatus> {
        if self.store.index_exists(name).await? {
            debug!("🗂️ index '{}' already exists, nothing to do", name);
            return Ok(IndexStatus::AlreadyExists);
        }

        let status = self.store.create_index(name, schema).await?;
        match status {
            IndexStatus::Created => info!("🏗️ created index '{}'", name),
            IndexStatus::CreatedUnacknowledged => warn!(
                "⚠️ index '{}' creation was not acknowledged by the cluster. Carrying on; it may still be usable.",
                name
            ),
            IndexStatus::AlreadyExists => debug!("🏁 index '{}' showed up on its own", name),
        }
        Ok(status)
    }

    /// 🏗️ `ensure_index` for the configured samples index with the samples schema.
    pub async fn ensure_samples_index(&self) -> Result<IndexStatus> {
        self.ensure_index(&self.index, &IndexSchema::samples()).await
    }

    // 🔒 first write pays for the HEAD (and maybe the PUT); the rest ride for free.
    // A failed attempt leaves the cell empty, so the next write tries again.
    async fn ready_for_writes(&self) -> Result<IndexStatus> {
        self.samples_index_ready
            .get_or_try_init(|| self.ensure_samples_index())
            .await
            .copied()
    }

    /// 🔍 Fetch a sample document. Missing is `Ok(None)`.
    pub async fn get_sample(&self, sample_id: &str) -> Result<Option<StoredDocument>> {
        self.store.get_document(&self.index, sample_id).await
    }

    /// 🧪 Upsert one plugin's result into its sample's document.
    pub async fn upsert_plugin_result(&self, result: &PluginResult) -> Result<UpsertOutcome> {
        self.upsert(
            &result.id,
            &result.category,
            &result.name,
            result.data.clone(),
        )
        .await
    }

    /// 🔄 The upsert protocol: GET, then swap in the plugin entry if found, create if not.
    ///
    /// The write only ever touches `scan_date` and `plugins.<category>.<name>`. That entry is
    /// replaced whole; every other plugin's entry is left exactly where it was.
    pub async fn upsert(
        &self,
        sample_id: &str,
        category: &str,
        plugin_name: &str,
        payload: Map<String, Value>,
    ) -> Result<UpsertOutcome> {
        require_non_empty("sample id", sample_id)?;
        require_non_empty("plugin category", category)?;
        require_non_empty("plugin name", plugin_name)?;
        self.ready_for_writes().await?;

        let payload = Value::Object(payload);
        let max_attempts = if self.upsert.optimistic_concurrency {
            self.upsert.max_conflict_retries.saturating_add(1)
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = PluginEntry::new(category, plugin_name, payload.clone());
            match self.upsert_once(sample_id, &entry).await {
                Err(err) if err.is_conflict() && attempt < max_attempts => {
                    warn!(
                        "🔁 lost a write race on '{}/{}' (attempt {}/{}), going around again",
                        self.index, sample_id, attempt, max_attempts
                    );
                }
                other => return other,
            }
        }
    }

    async fn upsert_once(&self, sample_id: &str, entry: &PluginEntry) -> Result<UpsertOutcome> {
        let cas = self.upsert.optimistic_concurrency;

        match self.store.get_document(&self.index, sample_id).await? {
            Some(existing) => {
                let guard = if cas { guard_of(&existing) } else { None };
                let outcome = self
                    .store
                    .put_plugin_entry(&self.index, sample_id, entry, guard)
                    .await?;
                debug!(
                    "🔄 wrote {}.{} into '{}/{}' (version {:?})",
                    entry.category, entry.name, self.index, outcome.id, outcome.version
                );
                Ok(outcome)
            }
            None => {
                match self
                    .store
                    .create_document(&self.index, Some(sample_id), &entry.new_document())
                    .await
                {
                    Ok(outcome) => {
                        debug!("🐣 created '{}/{}'", self.index, outcome.id);
                        Ok(outcome)
                    }
                    // 🏁 someone created it between our GET and our create. Without CAS we
                    // write on top of theirs; with CAS the retry loop re-reads first.
                    Err(err) if err.is_conflict() && !cas => {
                        debug!(
                            "🏁 '{}/{}' appeared mid-upsert, writing into it instead",
                            self.index, sample_id
                        );
                        self.store
                            .put_plugin_entry(&self.index, sample_id, entry, None)
                            .await
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// 📁 Write-once: a new document seeded with file metadata and the placeholder plugin map.
    ///
    /// Pinned at the sample's `sha256` when it has one, otherwise the store picks the ID.
    /// An occupied ID is a `Conflict`, never an overwrite.
    pub async fn store_file_info(&self, sample: Map<String, Value>) -> Result<UpsertOutcome> {
        let plugins = self.require_placeholder_plugins()?;
        let id = sample
            .get("sha256")
            .and_then(Value::as_str)
            .map(|hash| hash.trim().to_ascii_lowercase())
            .filter(|hash| !hash.is_empty());
        self.ready_for_writes().await?;

        let document = json!({
            "file": sample,
            "plugins": plugins,
            "scan_date": scan_date_now(),
        });
        let outcome = self
            .store
            .create_document(&self.index, id.as_deref(), &document)
            .await?;
        info!("📁 stored file info as '{}/{}'", self.index, outcome.id);
        Ok(outcome)
    }

    /// 🔐 Write-once: a new document for a bare hash, its family auto-detected.
    ///
    /// Stored as `{"file": {"<md5|sha1|sha256|sha512>": hash}}`, pinned at the hash itself.
    pub async fn store_hash(&self, hash: &str) -> Result<UpsertOutcome> {
        let plugins = self.require_placeholder_plugins()?;
        let kind = HashKind::detect(hash)?;
        let hash = hash.trim().to_ascii_lowercase();
        self.ready_for_writes().await?;

        let document = json!({
            "file": { kind.field_name(): &hash },
            "plugins": plugins,
            "scan_date": scan_date_now(),
        });
        let outcome = self
            .store
            .create_document(&self.index, Some(&hash), &document)
            .await?;
        info!("🔐 stored {} hash as '{}/{}'", kind, self.index, outcome.id);
        Ok(outcome)
    }

    fn require_placeholder_plugins(&self) -> Result<&Map<String, Value>> {
        if self.placeholder_plugins.is_empty() {
            return Err(StoreError::Config(
                "the placeholder plugin map is empty. Configure [plugins] with at least one category \
                 and plugin name before storing samples."
                    .to_string(),
            ));
        }
        Ok(&self.placeholder_plugins)
    }
}

fn guard_of(document: &StoredDocument) -> Option<VersionGuard> {
    Some(VersionGuard {
        seq_no: document.seq_no?,
        primary_term: document.primary_term?,
    })
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Config(format!(
            "{what} is empty. Every plugin result needs a sample, a category and a name."
        )));
    }
    Ok(())
}
