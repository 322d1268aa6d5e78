//! Artifact store: existence lookup and atomic writes.
//!
//! # Responsibilities
//! - Answer "is this artifact on disk already" without recomputation
//! - Write serialized GeoJSON via temp-file-then-rename
//! - Serialize concurrent computations of the same key
//!
//! # Design Decisions
//! - Existence is probed lazily with a filesystem stat; nothing is cached
//!   in memory beyond the per-key lock itself
//! - The rename is the only point where a write becomes visible, so
//!   readers never observe a partial artifact and a failed serialization
//!   leaves any previous artifact intact

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::osm::types::SubArea;
use crate::output::geojson;
use crate::output::paths::ResolutionRequest;

/// Errors from the output store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configured output directory is missing or unreadable.
    #[error("output directory {dir} is not accessible: {source}")]
    StorageUnavailable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Filesystem failure on a specific artifact path.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sub-areas could not be serialized to GeoJSON.
    #[error("could not serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Maps resolution requests to artifacts on disk.
///
/// The store itself is stateless apart from the table of per-key write
/// locks; the filesystem is the source of truth.
#[derive(Debug, Default)]
pub struct OutputStore {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock serializing computations of `req`'s artifact. Concurrent
    /// holders of the same key block each other; distinct keys do not.
    pub fn key_lock(&self, req: &ResolutionRequest) -> Arc<Mutex<()>> {
        self.locks
            .entry(req.lock_key())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Check whether the artifact for `req` already exists.
    ///
    /// Absence is a normal outcome (`Ok(None)`); an inaccessible output
    /// directory is an error.
    pub async fn lookup(&self, req: &ResolutionRequest) -> Result<Option<PathBuf>, StoreError> {
        self.check_dir(req).await?;

        let path = req.write_path();
        match fs::metadata(&path).await {
            Ok(_) => Ok(Some(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Serialize `subareas` and move the artifact into place atomically.
    pub async fn write(
        &self,
        req: &ResolutionRequest,
        subareas: &[SubArea],
    ) -> Result<PathBuf, StoreError> {
        self.check_dir(req).await?;

        // Serialize before touching the disk; a serialization failure
        // must not disturb an existing artifact.
        let body = serde_json::to_string(&geojson::feature_collection(subareas))?;

        let path = req.write_path();
        let tmp = req.out_dir.join(format!("{}.tmp", req.artifact_name()));

        fs::write(&tmp, body).await.map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(artifact = %path.display(), features = subareas.len(), "artifact written");
        Ok(path)
    }

    async fn check_dir(&self, req: &ResolutionRequest) -> Result<(), StoreError> {
        match fs::metadata(&req.out_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::StorageUnavailable {
                dir: req.out_dir.clone(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            }),
            Err(source) => Err(StoreError::StorageUnavailable {
                dir: req.out_dir.clone(),
                source,
            }),
        }
    }
}
