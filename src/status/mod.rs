//! # Status
//!
//! Answers "what would a build do?" for every declared file.
//!
//! ```text
//! DocumentGraph ──► Planner (one dry-run query) ──► PlannerFacts
//!        │                                              │
//!        └──────────────► StatusReport::compute ◄───────┘
//!                               │
//!                               ▼
//!                   StatusListing (text / JSON)
//! ```
//!
//! ## Key Types
//!
//! - [`Planner`] - Freshness oracle; [`SnakemakePlanner`] is the shipped adapter
//! - [`PlannerFacts`] - Typed facts the engine works from
//! - [`StatusReport`] - Marker per file

mod engine;
mod planner;
mod snakemake;

pub use engine::{DocumentEntry, FileEntry, StatusCounts, StatusListing, StatusReport};
pub use planner::{Planner, PlannerError, PlannerFacts};
pub use snakemake::{collect_facts, parse_dry_run, JobAction, PlannedJob, SnakemakePlanner, GRAPH_ENV};
