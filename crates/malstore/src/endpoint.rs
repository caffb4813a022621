//! 📡 Endpoint resolution — "where is Elasticsearch?" answered in four layers.
//!
//! 🧠 Precedence, highest first:
//! 1. explicit `url` in config
//! 2. explicit `host` / `port` in config (a missing half is filled from the layers below)
//! 3. environment: `MALICE_ELASTICSEARCH_URL`, then `MALICE_ELASTICSEARCH_HOST`
//!    (or the legacy `MALICE_ELASTICSEARCH`) and `MALICE_ELASTICSEARCH_PORT`
//! 4. hardcoded fallback: `elasticsearch:9200` inside a container, `localhost:9200` outside
//!
//! A host may carry its own port (`MALICE_ELASTICSEARCH=es:9201`). That port wins over the
//! env port. An explicit config port that disagrees with it is a `Config` error.
//!
//! Resolution is a pure function of (config, env lookup). Same inputs, same URL, every time.
//! The env lookup is injected so tests never have to touch the process environment. 🦆

use serde::Deserialize;

use crate::errors::{Result, StoreError};

pub const ENV_URL: &str = "MALICE_ELASTICSEARCH_URL";
pub const ENV_HOST: &str = "MALICE_ELASTICSEARCH_HOST";
pub const ENV_LEGACY_HOST: &str = "MALICE_ELASTICSEARCH";
pub const ENV_PORT: &str = "MALICE_ELASTICSEARCH_PORT";
pub const ENV_IN_DOCKER: &str = "MALICE_IN_DOCKER";

pub const DEFAULT_HOST: &str = "localhost";
/// 🐳 Inside compose, the cluster answers to its service name.
pub const DOCKER_HOST: &str = "elasticsearch";
pub const DEFAULT_PORT: u16 = 9200;

/// 📡 Where the cluster lives, as far as config knows. Every field optional on purpose.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// 🐳 Set when running inside a container. Flips the fallback host to `elasticsearch`.
    #[serde(default)]
    pub in_docker: bool,
}

impl EndpointConfig {
    /// 🎯 Resolve against the real process environment.
    pub fn resolve(&self) -> Result<String> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// 🎯 Resolve against whatever env lookup you hand in.
    pub fn resolve_with<F>(&self, env: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = non_empty(&self.url) {
            return Ok(normalize_url(url));
        }

        let host_or_port_pinned = non_empty(&self.host).is_some() || self.port.is_some();
        if !host_or_port_pinned {
            if let Some(url) = env(ENV_URL) {
                return Ok(normalize_url(&url));
            }
        }

        let host = match non_empty(&self.host) {
            Some(host) => host.to_string(),
            None => env(ENV_HOST)
                .or_else(|| env(ENV_LEGACY_HOST))
                .unwrap_or_else(|| {
                    let in_docker = self.in_docker || env(ENV_IN_DOCKER).is_some_and(|v| is_truthy(&v));
                    let fallback = if in_docker { DOCKER_HOST } else { DEFAULT_HOST };
                    fallback.to_string()
                }),
        };

        let (scheme, authority) = host.split_once("://").unwrap_or(("http", host.as_str()));
        let authority = authority.trim_end_matches('/');
        let (bare_host, embedded_port) = split_port(authority)?;

        let port = match (self.port, embedded_port) {
            (Some(pinned), Some(embedded)) if pinned != embedded => {
                return Err(StoreError::Config(format!(
                    "host '{host}' says port {embedded} but the config says port {pinned}. Pick one."
                )));
            }
            (Some(port), _) | (None, Some(port)) => port,
            (None, None) => match env(ENV_PORT) {
                Some(raw) => raw.parse::<u16>().map_err(|_| {
                    StoreError::Config(format!(
                        "{ENV_PORT}='{raw}' is not a port number. Ports are numbers. Between 1 and 65535. We checked."
                    ))
                })?,
                None => DEFAULT_PORT,
            },
        };

        Ok(format!("{scheme}://{bare_host}:{port}"))
    }
}

// 🔪 "es:9201" → ("es", Some(9201)). Bracketed IPv6 keeps its colons; bare IPv6 has no port.
fn split_port(authority: &str) -> Result<(&str, Option<u16>)> {
    let Some((host, port)) = authority.rsplit_once(':') else {
        return Ok((authority, None));
    };
    if port.contains(']') || (host.contains(':') && !host.starts_with('[')) {
        return Ok((authority, None));
    }
    let port = port.parse::<u16>().map_err(|_| {
        StoreError::Config(format!(
            "'{authority}' ends in ':{port}', which is not a port number."
        ))
    })?;
    Ok((host, Some(port)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// 🔧 scheme-less urls get http://, trailing slashes get trimmed. One slash of difference, infinite suffering.
fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
