//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → rate_limit.rs (per-client token bucket, 429 on empty)
//!     → http.rs (artifact lookup, optional on-miss resolution, CORS)
//!     → GeoJSON bytes to the client
//! ```

pub mod http;
pub mod rate_limit;

pub use http::GeoServer;
pub use rate_limit::RateLimiter;
