//! Text-mined knowledge graph edge QC.
//!
//! Verifies that both entities of each edge are mentioned in the edge's
//! supporting sentences and that the mention unambiguously refers to the
//! claimed identifier, sorting edges into passed, unresolved and ambiguous
//! buckets.
//!
//! # Modules
//!
//! - [`services`]: node normalization, synonym and name-lookup clients
//! - [`matching`]: whole-word synonym search and preferred-label disambiguation
//! - [`pipeline`]: batch lookups, per-edge classification and the run driver
//! - [`review`]: read-only API over classified output

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod domain;
pub mod matching;
pub mod pipeline;
pub mod review;
pub mod server;
pub mod services;
pub mod telemetry;

pub use config::AppConfig;
pub use pipeline::{QcPipeline, RunSummary};
