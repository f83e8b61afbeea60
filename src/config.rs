use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// CacheBackend
// ---------------------------------------------------------------------------

/// Where the aggregate is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Shared Redis instance (default).
    Redis,
    /// Process-local store; for single-instance or local runs.
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown cache backend: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Base URL of the openSenseMap API, without a trailing slash.
    pub opensensemap_url: String,
    pub cache_backend: CacheBackend,
    pub redis_host: String,
    pub redis_port: u16,
    /// Expiration of the cached aggregate. Also the upper bound of the
    /// readiness freshness window.
    pub cache_expiration: Duration,
    /// `host:port` of the S3-compatible store (MinIO).
    pub minio_endpoint: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_bucket: String,
    pub minio_region: String,
    /// Use `https` for the object store.
    pub minio_secure: bool,
    pub snapshot_interval: Duration,
    /// Budget for the bulk `/boxes` fetch.
    pub fetch_timeout: Duration,
    /// Budget for a single per-box reachability probe.
    pub probe_timeout: Duration,
    /// Maximum number of probes in flight during one availability sample.
    pub probe_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: parse_optional("SERVER_PORT", "8000")?,
            opensensemap_url: optional("OPENSENSEMAP_URL", "https://api.opensensemap.org")
                .trim_end_matches('/')
                .to_owned(),
            cache_backend: optional("CACHE_BACKEND", "redis")
                .parse()
                .context("CACHE_BACKEND must be 'redis' or 'memory'")?,
            redis_host: optional("REDIS_HOST", "localhost"),
            redis_port: parse_optional("REDIS_PORT", "6379")?,
            cache_expiration: secs("CACHE_EXPIRATION_SECS", "300")?,
            minio_endpoint: optional("MINIO_ENDPOINT", "localhost:9000"),
            minio_access_key: required("MINIO_ACCESS_KEY")?,
            minio_secret_key: required("MINIO_SECRET_KEY")?,
            minio_bucket: optional("MINIO_BUCKET", "temperature-data"),
            minio_region: optional("MINIO_REGION", "us-east-1"),
            minio_secure: parse_bool(&optional("MINIO_SECURE", "false"))
                .context("MINIO_SECURE must be true or false")?,
            snapshot_interval: secs("SNAPSHOT_INTERVAL_SECS", "300")?,
            fetch_timeout: secs("FETCH_TIMEOUT_SECS", "120")?,
            probe_timeout: secs("PROBE_TIMEOUT_SECS", "10")?,
            probe_concurrency: positive("PROBE_CONCURRENCY", "16")?,
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    pub fn minio_base_url(&self) -> String {
        let scheme = if self.minio_secure { "https" } else { "http" };
        format!("{scheme}://{}", self.minio_endpoint)
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_optional<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(key, default)
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a valid number"))
}

fn positive(key: &str, default: &str) -> Result<usize> {
    let n: usize = parse_optional(key, default)?;
    anyhow::ensure!(n > 0, "{key} must be a positive integer");
    Ok(n)
}

fn secs(key: &str, default: &str) -> Result<Duration> {
    let n: u64 = parse_optional(key, default)?;
    anyhow::ensure!(n > 0, "{key} must be a positive number of seconds");
    Ok(Duration::from_secs(n))
}

/// Accepts the spellings commonly used in container environments.
fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}
