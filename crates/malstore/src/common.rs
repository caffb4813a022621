//! 📦 Common data structures — the nouns of malstore.
//!
//! 🎬 COLD OPEN — INT. MALWARE LAB — 2:13 AM
//!
//! A sample lands in the drop folder. Twelve plugins pounce on it like seagulls
//! on a dropped french fry. Each one comes back with an opinion. ClamAV says
//! "clean". VirusTotal says "3 out of 70 think otherwise". Yara mumbles something
//! about a rule nobody remembers writing.
//!
//! Every one of those opinions becomes a [`PluginResult`]. Every one of them ends
//! up in the same sample document, side by side, none of them stepping on the
//! others' toes. That's the whole job. 🦆
//!
//! 🧠 Knowledge graph:
//! - [`PluginResult`]: what a plugin hands us (`id`, `category`, `name`, `data`)
//! - [`StoredDocument`]: what a fetch hands back (source + version counters)
//! - [`UpsertOutcome`]: what a write hands back (id, created/updated, version)
//! - [`ClusterHealth`]: what the liveness check hands back
//! - [`PluginEntry`]: one plugin write, replaced whole at `plugins.<category>.<name>`
//! - [`plugin_tree`] / [`scan_date_now`]: the two building blocks of every write body

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// 🧪 One plugin's verdict on one sample. The sole input type plugins hand us.
///
/// `id` is the sample ID (its content hash, usually sha256). `category` groups plugins
/// ("av", "intel", "exe"...). `name` is the plugin itself. `data` is whatever the plugin
/// felt like saying, as long as it's a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    pub id: String,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// 📡 A sample document as the store returned it.
///
/// `version` is the store's revision counter. `seq_no` + `primary_term` are the
/// compare-and-swap coordinates Elasticsearch hands out on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: Option<u64>,
    pub seq_no: Option<u64>,
    pub primary_term: Option<u64>,
    pub source: Value,
}

impl StoredDocument {
    /// 🎯 The `plugins` subtree, if the document has one.
    pub fn plugins(&self) -> Option<&Map<String, Value>> {
        self.source.get("plugins").and_then(Value::as_object)
    }
}

/// ✅ What kind of write actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Created,
    Updated,
    /// The store decided the partial doc changed nothing.
    Noop,
}

impl WriteResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteResult::Created => "created",
            WriteResult::Updated => "updated",
            WriteResult::Noop => "noop",
        }
    }
}

/// 📦 The receipt for a write: which document, what happened to it, and its new revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: String,
    pub result: WriteResult,
    pub version: Option<u64>,
}

/// 🚦 Cluster status, straight from `_cluster/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

/// 🩺 The parseable part of a health payload. If we can't parse this, the health check fails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,
    pub status: HealthStatus,
}

/// 🏗️ Index lifecycle outcome for `ensure_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Already there. Nothing sent.
    AlreadyExists,
    Created,
    /// ⚠️ Created, but the cluster didn't acknowledge it in time. Logged, not fatal.
    CreatedUnacknowledged,
}

/// ⏰ Right now, in the format `scan_date` is mapped as (RFC 3339, millis, UTC).
pub fn scan_date_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 🌳 `{category: {name: payload}}` — the shape every plugin write takes under `plugins`.
pub fn plugin_tree(category: &str, name: &str, payload: Value) -> Value {
    json!({ category: { name: payload } })
}

/// 🎯 One plugin's slot in one sample document, ready to be written.
///
/// The payload lands at `plugins.<category>.<name>` and replaces whatever was there,
/// keys and all. Everything beside it stays put.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    pub category: String,
    pub name: String,
    pub payload: Value,
    pub scan_date: String,
}

impl PluginEntry {
    /// 🏗️ Stamped with the current time.
    pub fn new(category: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            payload,
            scan_date: scan_date_now(),
        }
    }

    /// 🐣 The full document for a sample nobody has written yet.
    pub fn new_document(&self) -> Value {
        json!({
            "scan_date": self.scan_date,
            "plugins": plugin_tree(&self.category, &self.name, self.payload.clone()),
        })
    }
}
