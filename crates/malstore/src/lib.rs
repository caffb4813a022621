//! 🧫 malstore — the persistence layer of a malware-scanning pipeline.
//!
//! 🎬 *[narrator voice]* "Every sample gets scanned by a dozen plugins. Every plugin has
//! an opinion. Somebody has to write all those opinions down in the same place without
//! any of them erasing the others."
//!
//! 📦 That somebody is [`ResultStore`]. Build one from an [`AppConfig`], point it at
//! Elasticsearch (or at RAM), and hand it [`PluginResult`]s. 🦆

pub mod app_config;
pub mod backends;
pub mod common;
pub mod endpoint;
pub mod errors;
pub mod hashes;
pub mod mapping;
pub mod merge;
pub mod result_store;

pub use app_config::{AppConfig, load_config};
pub use backends::{DocumentStore, StoreBackend};
pub use common::{ClusterHealth, IndexStatus, PluginResult, StoredDocument, UpsertOutcome, WriteResult};
pub use errors::{Result, StoreError};
pub use hashes::HashKind;
pub use mapping::IndexSchema;
pub use result_store::ResultStore;
