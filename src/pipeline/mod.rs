//! The four-stage QC pipeline: normalize, fetch synonyms, look up the
//! synonyms found in text, classify.

pub mod cache;
pub mod classifier;
pub mod corpus;
pub mod index;
pub mod orchestrator;
pub mod output;

use std::collections::HashMap;

use crate::domain::{Curie, NormalizedEntity, SynonymSet};

/// Normalizer answers keyed by input CURIE; `None` when normalization failed.
pub type NormalizedMap = HashMap<Curie, Option<NormalizedEntity>>;

/// Synonym sets keyed by preferred identifier.
pub type SynonymMap = HashMap<Curie, SynonymSet>;

pub use cache::{LookupCache, LookupPlan, plan_lookups};
pub use classifier::classify;
pub use index::{EntityIndex, IndexedEntity, lookup_filters};
pub use orchestrator::{PipelineServices, PipelineSettings, QcPipeline, RunSummary, StageTimings};
pub use output::ClassifiedWriter;
