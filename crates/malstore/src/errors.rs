//! 💀 Errors — the five flavors of "it didn't work".
//!
//! 🎬 *[a config, a socket, a 500, a 409, and a stopwatch walk into a bar]*
//! *[the bartender says "what is this, an error taxonomy?"]*
//!
//! 🧠 Knowledge graph:
//! - `Config`: a precondition you own is unmet. Retrying won't help. Fixing your TOML will.
//! - `Connectivity`: the request never got an answer. Transport-level sadness.
//! - `Protocol`: the store answered, and the answer was bad news (or gibberish).
//! - `Conflict`: someone else wrote first. Version mismatch or write-once collision.
//! - `Timeout`: `wait_for_connection` ran out of patience. Carries the last failure inside.
//!
//! Not-found is NOT here. Not-found is a branch, not a tragedy. 🦆

use std::time::Duration;

use thiserror::Error;

/// 📦 Shorthand so every signature doesn't have to spell out the whole error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// 💀 Everything that can go wrong between a plugin result and the samples index.
///
/// Every variant that touches the store carries `op` (what we were doing) and `target`
/// (which index or document we were doing it to). Wrapped once where it happens,
/// propagated untouched after that.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 🔧 A precondition is unmet. Reported synchronously, never retried.
    #[error("💀 configuration error: {0}")]
    Config(String),

    /// 📡 The request never made it there, or never made it back.
    #[error("💀 couldn't reach the store during {op} on '{target}'. The network left us on read")]
    Connectivity {
        op: &'static str,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 📡 The store answered, but not with anything we can use.
    #[error("💀 {op} on '{target}' got a bad answer from the store (status {}): {detail}", .status.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string()))]
    Protocol {
        op: &'static str,
        target: String,
        status: Option<u16>,
        detail: String,
    },

    /// 🔒 Version mismatch, or a create that found someone already living there.
    #[error("💀 {op} on '{target}' lost a write race. Somebody else got there first")]
    Conflict { op: &'static str, target: String },

    /// ⏰ `wait_for_connection` gave up. The last failure rides along as the source.
    #[error("💀 store still unreachable after waiting {waited:?}")]
    Timeout {
        waited: Duration,
        #[source]
        last: Box<StoreError>,
    },
}

impl StoreError {
    pub(crate) fn connectivity(
        op: &'static str,
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Connectivity {
            op,
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn protocol(
        op: &'static str,
        target: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        StoreError::Protocol {
            op,
            target: target.into(),
            status,
            detail: detail.into(),
        }
    }

    pub(crate) fn conflict(op: &'static str, target: impl Into<String>) -> Self {
        StoreError::Conflict {
            op,
            target: target.into(),
        }
    }

    /// 🔒 Lost a write race? The upsert loop uses this to decide whether to go around again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// 📡 Was this a transport-level failure? (Timeouts count; they're made of transport failures.)
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::Connectivity { .. } | StoreError::Timeout { .. }
        )
    }
}
