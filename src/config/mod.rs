//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, semantic validation)
//!     → AppConfig (validated)
//!     → CLI flags override individual fields
//!     → immutable, shared via Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; components receive it at
//!   construction instead of consulting any request-scoped value bag
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ResolveConfig, ServerConfig, UpstreamConfig};
