//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional JSON file named by
//! `GATEWAY_CONFIG`, then individual environment overrides.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::marshal::Coercion;

pub const DEFAULT_ADDRESS: &str = "scylla.gateway";
pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
pub const DEFAULT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_BATCH_TIMEOUT_MS: u64 = 30_000;

/// Deserialized through [`CompressionKind::parse`], so names are
/// case-insensitive and unknown ones mean no compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CompressionKind {
    #[default]
    None,
    Lz4,
    Snappy,
}

impl CompressionKind {
    /// Unknown names fall back to `None`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "lz4" => CompressionKind::Lz4,
            "snappy" => CompressionKind::Snappy,
            other => {
                if other != "none" {
                    tracing::warn!(compression = %name, "unknown compression; using none");
                }
                CompressionKind::None
            }
        }
    }
}

impl From<String> for CompressionKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bus address of the request router; the batch processor listens on `<address>.batch`
    pub address: String,
    pub hosts: Vec<String>,
    pub port: u16,
    pub keyspace: Option<String>,
    pub compression: CompressionKind,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl: bool,
    pub ssl_ca_bundle: Option<String>,
    pub ssl_insecure: bool,
    /// chrono strftime pattern used for temporal values in both directions
    pub date_format: String,
    /// Ordered attempts applied to untyped string parameters
    pub coercion: Vec<Coercion>,
    pub skip_null_columns: bool,
    pub cache_capacity: usize,
    pub batch_timeout_ms: u64,
    /// Rows per page for reads; unset or non-positive reads everything in one response
    pub fetch_size: Option<i32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            hosts: vec!["127.0.0.1".to_string()],
            port: 9042,
            keyspace: None,
            compression: CompressionKind::None,
            username: None,
            password: None,
            ssl: false,
            ssl_ca_bundle: None,
            ssl_insecure: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            coercion: vec![Coercion::Uuid, Coercion::Timestamp],
            skip_null_columns: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT_MS,
            fetch_size: None,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl GatewayConfig {
    /// Defaults, then the `GATEWAY_CONFIG` file, then env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("GATEWAY_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                Self::from_json(&raw).with_context(|| format!("parsing config file {path}"))?
            }
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(uri) = std::env::var("SCYLLA_URI") {
            self.hosts = uri
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let (Ok(user), Ok(pass)) = (std::env::var("SCYLLA_USER"), std::env::var("SCYLLA_PASS")) {
            self.username = Some(user);
            self.password = Some(pass);
        }
        if let Some(ssl) = env_flag("SCYLLA_SSL") {
            self.ssl = ssl;
        }
        if let Ok(ca) = std::env::var("SCYLLA_CA_BUNDLE") {
            self.ssl_ca_bundle = Some(ca);
        }
        if let Some(insecure) = env_flag("SCYLLA_SSL_INSECURE") {
            self.ssl_insecure = insecure;
        }
        if let Ok(ks) = std::env::var("SCYLLA_KEYSPACE") {
            self.keyspace = Some(ks);
        }
        if let Ok(address) = std::env::var("GATEWAY_ADDRESS") {
            self.address = address;
        }
        if let Ok(raw) = std::env::var("GATEWAY_CACHE_CAPACITY") {
            self.cache_capacity = raw
                .parse()
                .with_context(|| format!("GATEWAY_CACHE_CAPACITY={raw}"))?;
        }
        if let Ok(raw) = std::env::var("GATEWAY_BATCH_TIMEOUT_MS") {
            self.batch_timeout_ms = raw
                .parse()
                .with_context(|| format!("GATEWAY_BATCH_TIMEOUT_MS={raw}"))?;
        }
        if let Ok(raw) = std::env::var("GATEWAY_FETCH_SIZE") {
            self.fetch_size = Some(
                raw.parse()
                    .with_context(|| format!("GATEWAY_FETCH_SIZE={raw}"))?,
            );
        }
        Ok(())
    }

    /// Address the batch processor registers under.
    pub fn batch_address(&self) -> String {
        let base = self.address.strip_suffix('.').unwrap_or(&self.address);
        format!("{base}.batch")
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Page size handed to the driver, `None` for unpaged reads.
    pub fn page_size(&self) -> Option<i32> {
        self.fetch_size.filter(|n| *n > 0)
    }

    /// Contact points as `host:port`. Hosts that already carry a port keep it.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| {
                if h.parse::<std::net::SocketAddr>().is_ok()
                    || (h.matches(':').count() == 1 && !h.starts_with('['))
                {
                    h.clone()
                } else {
                    format!("{}:{}", h, self.port)
                }
            })
            .collect()
    }
}
