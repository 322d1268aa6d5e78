//! Top-level error surface for the CLI boundary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::osm::client::FetchError;
use crate::osm::resolver::ResolveError;
use crate::output::StoreError;

/// Everything that can abort a command.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed user input, e.g. an empty or non-numeric relation id.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Upstream failure outside a resolution, e.g. building the client.
    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for command execution.
pub type AppResult<T> = Result<T, AppError>;
