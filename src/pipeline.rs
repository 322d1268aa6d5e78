//! Orchestration of resolve → merge → write behind the per-key lock.

use std::path::PathBuf;

use crate::error::AppResult;
use crate::osm::client::RelationFetcher;
use crate::osm::merge::merge;
use crate::osm::resolver::Resolver;
use crate::output::paths::ResolutionRequest;
use crate::output::store::OutputStore;

/// Produce the artifact for `req`, reusing an existing one unless `force`
/// is set.
///
/// The whole check-resolve-write sequence runs under the request's key
/// lock, so concurrent identical requests block on the first computation
/// and then observe its artifact instead of recomputing. Distinct keys
/// proceed independently.
pub async fn ensure_artifact<F: RelationFetcher>(
    resolver: &Resolver<F>,
    store: &OutputStore,
    req: &ResolutionRequest,
    force: bool,
) -> AppResult<PathBuf> {
    let lock = store.key_lock(req);
    let _guard = lock.lock().await;

    if !force {
        if let Some(path) = store.lookup(req).await? {
            tracing::debug!(artifact = %path.display(), "artifact already on disk");
            return Ok(path);
        }
    }

    let resolution = resolver.resolve(req.root, req.raw).await?;
    for skipped in &resolution.skipped {
        tracing::warn!(
            relation = %skipped.id,
            reason = %skipped.reason,
            "resolved with a skipped branch"
        );
    }

    let subareas = merge(resolution.subareas, !req.separate);
    let path = store.write(req, &subareas).await?;
    Ok(path)
}
