//! OpenStreetMap sub-area GeoJSON utilities.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────┐
//!                   │                 osm-subareas                    │
//!                   │                                                 │
//!   relation id     │  ┌────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ────────────────┼─▶│ client │──▶│ resolver │──▶│    merge    │   │
//!                   │  │ (OSM   │   │ (visited │   │ (identity-  │   │
//!                   │  │  API)  │   │  set BFS)│   │  key union) │   │
//!                   │  └────────┘   └──────────┘   └──────┬──────┘   │
//!                   │                                     │          │
//!                   │                                     ▼          │
//!   GET /static/…   │  ┌────────────┐   ┌────────────────────────┐   │
//!   ────────────────┼─▶│ rate limit │──▶│ output store (atomic   │   │
//!                   │  │ (buckets)  │   │ write, stat lookup)    │   │
//!                   │  └────────────┘   └────────────────────────┘   │
//!                   └────────────────────────────────────────────────┘
//! ```
//!
//! The `subarea` command resolves an administrative relation into its
//! sub-areas and writes one GeoJSON feature collection; the `serve`
//! command republishes the output directory with per-client rate
//! limiting.

// Core subsystems
pub mod config;
pub mod error;
pub mod osm;
pub mod output;
pub mod pipeline;
pub mod serve;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use osm::{OsmClient, RelationId, Resolver};
pub use output::{OutputStore, ResolutionRequest};
pub use serve::GeoServer;
