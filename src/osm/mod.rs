//! OSM domain subsystem.
//!
//! # Data Flow
//! ```text
//! relation id
//!     → client.rs (fetch relation/{id}/full from upstream, retry/backoff)
//!     → types.rs (decode element soup into RelationBundle)
//!     → resolver.rs (walk subarea members, cycle guard, bounded fan-out)
//!     → tags.rs (normalize tags, derive identity key)
//!     → geometry.rs (stitch way polylines into polygon rings)
//!     → merge.rs (optionally combine equivalent sub-areas)
//!     → Vec<SubArea> handed to the output layer
//! ```

pub mod client;
pub mod geometry;
pub mod merge;
pub mod resolver;
pub mod tags;
pub mod types;

pub use client::{FetchError, OsmClient, RelationFetcher};
pub use resolver::{Resolution, ResolveError, Resolver, SkippedBranch};
pub use types::{Relation, RelationBundle, RelationId, SubArea};
