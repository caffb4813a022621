//! 🔐 Hash classification — "what kind of hash is this?" answered by counting.
//!
//! md5 is 32 hex chars, sha1 is 40, sha256 is 64, sha512 is 128. That's the whole trick.
//! No magic, no heuristics, no vibes. Just `len()` and a hex check.

use std::fmt;

use crate::errors::{Result, StoreError};

/// 🔐 The hash families we know how to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashKind {
    /// 🕵️ Detect the family from the digest's shape. Anything else is a config error.
    pub fn detect(hash: &str) -> Result<Self> {
        let hash = hash.trim();
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::Config(format!(
                "'{hash}' is not a hex digest. We asked for a hash and got a riddle."
            )));
        }
        match hash.len() {
            32 => Ok(HashKind::Md5),
            40 => Ok(HashKind::Sha1),
            64 => Ok(HashKind::Sha256),
            128 => Ok(HashKind::Sha512),
            other => Err(StoreError::Config(format!(
                "a {other}-character hex digest isn't md5, sha1, sha256 or sha512. Unknown hash type."
            ))),
        }
    }

    /// 📦 The field name the hash is stored under inside `file`.
    pub fn field_name(&self) -> &'static str {
        match self {
            HashKind::Md5 => "md5",
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
            HashKind::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}
