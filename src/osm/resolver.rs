//! Sub-area resolution: traversal of a relation's membership graph.
//!
//! # Responsibilities
//! - Walk sub-area members breadth-first from a root relation
//! - Guard against cycles with an explicit visited set
//! - Fetch each frontier with bounded concurrency
//! - Degrade gracefully when a non-root branch fails
//!
//! # Design Decisions
//! - Output is sorted by relation id, so fetch completion order and
//!   traversal order never leak into the result
//! - A revisited id ends that branch silently; shared ancestry and cycles
//!   are normal in map data

use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use thiserror::Error;

use crate::config::ResolveConfig;
use crate::osm::client::{FetchError, RelationFetcher};
use crate::osm::geometry;
use crate::osm::tags;
use crate::osm::types::{RelationBundle, RelationId, SubArea};

/// Fatal resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The root relation could not be fetched; nothing to resolve.
    #[error("could not fetch root relation {id}: {source}")]
    Root {
        id: RelationId,
        #[source]
        source: FetchError,
    },
}

/// A branch that was skipped because its fetch failed after retries.
#[derive(Debug, Clone)]
pub struct SkippedBranch {
    pub id: RelationId,
    pub reason: String,
}

/// The outcome of a resolution: id-ordered sub-areas plus notes about
/// branches that were dropped.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: RelationId,
    pub subareas: Vec<SubArea>,
    pub skipped: Vec<SkippedBranch>,
}

/// Resolves the sub-areas reachable from a root relation.
pub struct Resolver<F> {
    fetcher: F,
    max_concurrent: usize,
}

impl<F: RelationFetcher> Resolver<F> {
    pub fn new(fetcher: F, config: &ResolveConfig) -> Self {
        Self {
            fetcher,
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    /// Resolve all sub-areas reachable from `root`.
    ///
    /// The root relation itself is not emitted; its descendants are. With
    /// `raw` set, emitted tags keep their upstream spelling; grouping
    /// metadata is normalized either way.
    pub async fn resolve(&self, root: RelationId, raw: bool) -> Result<Resolution, ResolveError> {
        let root_bundle = self
            .fetcher
            .fetch_relation(root)
            .await
            .map_err(|source| ResolveError::Root { id: root, source })?;

        let mut visited: HashSet<RelationId> = HashSet::new();
        visited.insert(root);

        let mut subareas: Vec<SubArea> = Vec::new();
        let mut skipped: Vec<SkippedBranch> = Vec::new();

        let mut frontier = next_frontier(&root_bundle, &mut visited);

        while !frontier.is_empty() {
            tracing::debug!(root = %root, width = frontier.len(), "expanding frontier");

            let mut results: Vec<(RelationId, Result<RelationBundle, FetchError>)> =
                stream::iter(frontier.iter().copied().map(|id| async move {
                    (id, self.fetcher.fetch_relation(id).await)
                }))
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;

            // Completion order is arbitrary; process in id order.
            results.sort_by_key(|(id, _)| *id);

            let mut next = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(bundle) => {
                        next.extend(next_frontier(&bundle, &mut visited));
                        subareas.push(build_subarea(&bundle, raw));
                    }
                    Err(err) => {
                        tracing::warn!(relation = %id, error = %err, "sub-area branch skipped");
                        skipped.push(SkippedBranch {
                            id,
                            reason: err.to_string(),
                        });
                    }
                }
            }

            next.sort_unstable();
            frontier = next;
        }

        subareas.sort_by_key(|s| s.id);
        tracing::info!(
            root = %root,
            subareas = subareas.len(),
            skipped = skipped.len(),
            "resolution complete"
        );

        Ok(Resolution {
            root,
            subareas,
            skipped,
        })
    }
}

/// Unvisited sub-area members of a bundle, marking them visited as they
/// are claimed. Revisits terminate the branch here, which is what bounds
/// traversal on cyclic graphs.
fn next_frontier(bundle: &RelationBundle, visited: &mut HashSet<RelationId>) -> Vec<RelationId> {
    bundle
        .relation
        .subarea_members()
        .into_iter()
        .filter(|id| visited.insert(*id))
        .collect()
}

fn build_subarea(bundle: &RelationBundle, raw: bool) -> SubArea {
    let normalized = tags::normalize(&bundle.relation.tags);
    let identity_key = tags::identity_key(&normalized);
    let emitted = if raw {
        bundle.relation.tags.clone()
    } else {
        normalized
    };

    SubArea {
        id: bundle.relation.id,
        tags: emitted,
        geometry: geometry::assemble(&bundle.ways),
        identity_key,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::osm::types::{Member, MemberKind, Relation, Tags};

    /// In-memory relation graph.
    #[derive(Default)]
    struct FakeFetcher {
        relations: HashMap<RelationId, RelationBundle>,
        fetch_count: AtomicU32,
    }

    impl FakeFetcher {
        fn add(&mut self, id: u64, name: &str, children: &[u64]) {
            let members = children
                .iter()
                .map(|&c| Member {
                    kind: MemberKind::Relation,
                    id: c,
                    role: "subarea".to_string(),
                })
                .collect();
            let mut tags = Tags::new();
            tags.insert("name".to_string(), name.to_string());
            self.relations.insert(
                RelationId(id),
                RelationBundle {
                    relation: Relation {
                        id: RelationId(id),
                        tags,
                        members,
                    },
                    ways: vec![],
                },
            );
        }
    }

    impl RelationFetcher for FakeFetcher {
        async fn fetch_relation(&self, id: RelationId) -> Result<RelationBundle, FetchError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            self.relations
                .get(&id)
                .cloned()
                .ok_or(FetchError::NotFound(id))
        }
    }

    fn resolver(fetcher: FakeFetcher) -> Resolver<FakeFetcher> {
        Resolver::new(fetcher, &ResolveConfig::default())
    }

    #[tokio::test]
    async fn resolves_nested_subareas_in_id_order() {
        let mut fake = FakeFetcher::default();
        fake.add(1, "root", &[3, 2]);
        fake.add(2, "b", &[4]);
        fake.add(3, "a", &[]);
        fake.add(4, "c", &[]);

        let resolution = resolver(fake).resolve(RelationId(1), false).await.unwrap();
        let ids: Vec<u64> = resolution.subareas.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(resolution.skipped.is_empty());
    }

    #[tokio::test]
    async fn cycle_terminates_without_duplicate_visits() {
        let mut fake = FakeFetcher::default();
        fake.add(1, "root", &[2]);
        fake.add(2, "a", &[3]);
        fake.add(3, "b", &[1, 2]);

        let r = resolver(fake);
        let resolution = r.resolve(RelationId(1), false).await.unwrap();
        let ids: Vec<u64> = resolution.subareas.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![2, 3]);
        // Root + two children, each exactly once.
        assert_eq!(r.fetcher.fetch_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_branch_is_skipped_not_fatal() {
        let mut fake = FakeFetcher::default();
        fake.add(1, "root", &[2, 99]);
        fake.add(2, "a", &[]);

        let resolution = resolver(fake).resolve(RelationId(1), false).await.unwrap();
        assert_eq!(resolution.subareas.len(), 1);
        assert_eq!(resolution.skipped.len(), 1);
        assert_eq!(resolution.skipped[0].id, RelationId(99));
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let fake = FakeFetcher::default();
        let err = resolver(fake).resolve(RelationId(1), false).await.unwrap_err();
        assert!(matches!(err, ResolveError::Root { id: RelationId(1), .. }));
    }

    #[tokio::test]
    async fn shared_child_is_emitted_once() {
        let mut fake = FakeFetcher::default();
        fake.add(1, "root", &[2, 3]);
        fake.add(2, "a", &[4]);
        fake.add(3, "b", &[4]);
        fake.add(4, "shared", &[]);

        let resolution = resolver(fake).resolve(RelationId(1), false).await.unwrap();
        let ids: Vec<u64> = resolution.subareas.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn raw_mode_keeps_upstream_spelling() {
        let mut fake = FakeFetcher::default();
        fake.add(1, "root", &[2]);
        fake.add(2, "unused", &[]);
        let mut tags = Tags::new();
        tags.insert("Name ".to_string(), " Spelled Oddly ".to_string());
        fake.relations.get_mut(&RelationId(2)).unwrap().relation.tags = tags;

        let resolution = resolver(fake).resolve(RelationId(1), true).await.unwrap();
        assert_eq!(
            resolution.subareas[0].tags.get("Name ").unwrap(),
            " Spelled Oddly "
        );
        // Grouping key still uses the normalized view.
        assert_eq!(resolution.subareas[0].identity_key, "spelled oddly|");
    }
}
