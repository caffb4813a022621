//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `backend`: which [`DocumentStore`](crate::backends::DocumentStore) to talk to
//! - `index`: the index name (default `malice`)
//! - `plugins`: placeholder categories → plugin names, seeded into write-once documents
//! - `upsert`: optional compare-and-swap knobs
//! - `connection`: how long and how often `wait_for_connection` polls
//!
//! All of it is injected into the `ResultStore` at construction. No globals. No statics.
//! No "I'll just stash the plugin map in a package-level var real quick".

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::backends::ElasticsearchConfig;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// 🧪 category → plugin names. Becomes `{category: {name: null}}` on write-once docs.
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub upsert: UpsertConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// 🎭 Which backend to talk to. Externally tagged, like the rest of our configs:
/// `[backend.Elasticsearch]` or `backend = "InMemory"`.
#[derive(Debug, Deserialize, Clone)]
pub enum BackendConfig {
    Elasticsearch(ElasticsearchConfig),
    InMemory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Elasticsearch(ElasticsearchConfig::default())
    }
}

/// 🗂️ Which index the samples live in.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
}

fn default_index_name() -> String {
    "malice".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
        }
    }
}

/// 🔒 Compare-and-swap knobs for the upsert path.
///
/// Off by default: concurrent upserts for the same sample race, and the last
/// write to a given plugin entry wins. On: every update carries the version it read,
/// and a lost race goes around again, up to `max_conflict_retries` times.
#[derive(Debug, Deserialize, Clone)]
pub struct UpsertConfig {
    #[serde(default)]
    pub optimistic_concurrency: bool,
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for UpsertConfig {
    fn default() -> Self {
        Self {
            optimistic_concurrency: false,
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

/// ⏰ `wait_for_connection` knobs. The poll is fixed-interval. No exponential anything.
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

fn default_wait_timeout_secs() -> u64 {
    30
}

// 🔧 one second. Long enough to not DDoS a booting cluster, short enough to not bore you.
fn default_poll_interval_millis() -> u64 {
    1000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }
}

impl ConnectionConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

impl AppConfig {
    /// 🧪 The placeholder `plugins` map for write-once documents: `{category: {name: null}}`.
    /// Categories with no plugin names are dropped; an empty map means "not configured".
    pub fn placeholder_plugins(&self) -> Map<String, Value> {
        self.plugins
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(category, names)| {
                let slots: Map<String, Value> =
                    names.iter().map(|name| (name.clone(), Value::Null)).collect();
                (category.clone(), Value::Object(slots))
            })
            .collect()
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`MALSTORE_*`, nested keys split on `__`) with an
/// optional TOML file. TOML wins on conflicts.
///
/// - `config_file_name` None → env vars only (plus defaults).
/// - `config_file_name` Some → env vars + TOML file, merged.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("MALSTORE_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (MALSTORE_*). \
             The file exists in our hearts, but apparently not in valid TOML.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (MALSTORE_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
