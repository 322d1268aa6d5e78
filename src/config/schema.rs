//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so a minimal config (or none at all) works.
//! Once built, configuration is immutable and handed to components by
//! their constructors; nothing reads ambient state.

use serde::{Deserialize, Serialize};

/// Root configuration for the exporter and server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Sub-area resolution options.
    pub resolve: ResolveConfig,

    /// Upstream map-data API settings.
    pub upstream: UpstreamConfig,

    /// HTTP serving settings.
    pub server: ServerConfig,
}

/// Options controlling how a relation is resolved and emitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Directory receiving the GeoJSON artifacts.
    pub out_dir: String,

    /// Emit tags with their upstream spelling (no canonicalization).
    pub raw: bool,

    /// Keep logically-equivalent sub-areas as separate features.
    pub separated: bool,

    /// Upper bound on concurrent upstream fetches within one resolution.
    pub max_concurrent_fetches: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            out_dir: "./geo".to_string(),
            raw: false,
            separated: false,
            max_concurrent_fetches: 4,
        }
    }
}

/// Upstream OSM API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the map-data API.
    pub endpoint: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first failed attempt.
    pub max_retries: u32,

    /// Base backoff delay in milliseconds.
    pub backoff_base_ms: u64,

    /// Backoff cap in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openstreetmap.org".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 5_000,
        }
    }
}

/// HTTP front-end settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g. "127.0.0.1:8181").
    pub address: String,

    /// Value reflected in the CORS allow-origin header.
    pub origin: String,

    /// Token refill rate per client, in requests per second.
    pub rate: f64,

    /// Bucket capacity per client.
    pub burst: u32,

    /// Idle time after which a client bucket is evicted, in seconds.
    pub rate_ttl_secs: u64,

    /// Path prefix under which artifacts are served.
    pub prefix: String,

    /// Resolve a well-formed but missing artifact on request instead of
    /// answering 404.
    pub resolve_on_miss: bool,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Interval between idle-bucket sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8181".to_string(),
            origin: "*".to_string(),
            rate: 10.0,
            burst: 5,
            rate_ttl_secs: 120,
            prefix: "/static".to_string(),
            resolve_on_miss: false,
            request_timeout_secs: 30,
            sweep_interval_secs: 30,
        }
    }
}
