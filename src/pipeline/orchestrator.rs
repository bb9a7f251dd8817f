//! End-to-end QC run.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::cache::{LookupCache, plan_lookups};
use super::index::EntityIndex;
use super::classifier::classify;
use super::corpus::{EdgeReader, collect_entities, load_node_names};
use super::output::ClassifiedWriter;
use super::{NormalizedMap, SynonymMap};
use crate::config::AppConfig;
use crate::domain::{Classification, ClassifiedEdge, Curie, Edge, QC_PHASE};
use crate::services::{
    HttpTransport, NameLookup, NameResolverClient, NodeNormalizer, NodeNormalizerClient,
    ServiceError, SynonymClient, SynonymSource,
};

/// The external collaborators a run talks to.
#[derive(Clone)]
pub struct PipelineServices {
    pub normalizer: Arc<dyn NodeNormalizer>,
    pub synonyms: Arc<dyn SynonymSource>,
    pub lookup: Arc<dyn NameLookup>,
}

impl fmt::Debug for PipelineServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineServices").finish_non_exhaustive()
    }
}

impl PipelineServices {
    /// HTTP clients for the configured service endpoints.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self {
            normalizer: Arc::new(NodeNormalizerClient::from_config(&transport, config)?),
            synonyms: Arc::new(SynonymClient::from_config(&transport, config)?),
            lookup: Arc::new(NameResolverClient::from_config(&transport, config)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub max_edges: Option<usize>,
    pub output_dir: PathBuf,
    pub lookup_concurrency: usize,
    pub human_taxon: String,
    pub retain_lookup_cache: bool,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.pipeline.batch_size,
            max_edges: config.pipeline.max_edges,
            output_dir: config.pipeline.output_dir.clone(),
            lookup_concurrency: config.lookup.concurrency,
            human_taxon: config.lookup.human_taxon.clone(),
            retain_lookup_cache: config.pipeline.retain_lookup_cache,
        }
    }
}

/// Wall-clock seconds spent per stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub node_loading: f64,
    pub entity_collection: f64,
    pub normalization: f64,
    pub synonym_retrieval: f64,
    pub edge_processing: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub edges_processed: usize,
    pub passed: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
    pub unique_entities: usize,
    pub normalized_entities: usize,
    pub synonym_sets: usize,
    pub lookup_calls: usize,
    pub synonyms_looked_up: usize,
    pub edges_per_second: f64,
    pub timings: StageTimings,
}

impl RunSummary {
    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::Passed => self.passed,
            Classification::Unresolved => self.unresolved,
            Classification::Ambiguous => self.ambiguous,
        }
    }

    fn record(&mut self, classification: Classification) {
        self.edges_processed += 1;
        match classification {
            Classification::Passed => self.passed += 1,
            Classification::Unresolved => self.unresolved += 1,
            Classification::Ambiguous => self.ambiguous += 1,
        }
    }
}

#[derive(Debug)]
pub struct QcPipeline {
    services: PipelineServices,
    settings: PipelineSettings,
}

impl QcPipeline {
    pub fn new(services: PipelineServices, settings: PipelineSettings) -> Self {
        Self { services, settings }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(
            PipelineServices::from_config(config)?,
            PipelineSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Classify every edge of `edges_path` into the output directory.
    ///
    /// Any service or input failure aborts the run; rows already written stay
    /// on disk.
    #[instrument(skip(self), fields(output_dir = %self.settings.output_dir.display()))]
    pub async fn run(&self, edges_path: &Path, nodes_path: &Path) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut writer = ClassifiedWriter::create(&self.settings.output_dir).await?;

        // Stage 0: display names
        let stage = Instant::now();
        let node_names = load_node_names(nodes_path).await?;
        summary.timings.node_loading = stage.elapsed().as_secs_f64();

        // Stage 1: unique entities, normalized
        let stage = Instant::now();
        let (curies, edge_count) = collect_entities(edges_path, self.settings.max_edges).await?;
        summary.unique_entities = curies.len();
        summary.timings.entity_collection = stage.elapsed().as_secs_f64();
        info!(
            name: "pipeline.entities.collected",
            edges = edge_count,
            entities = curies.len(),
            "Collected unique entities"
        );

        let stage = Instant::now();
        let curies: Vec<Curie> = curies.into_iter().collect();
        let normalized = self
            .services
            .normalizer
            .normalize(&curies)
            .await
            .context("normalization stage failed")?;
        summary.normalized_entities = normalized.values().filter(|e| e.is_some()).count();
        summary.timings.normalization = stage.elapsed().as_secs_f64();

        // Stage 2: synonyms for preferred identifiers
        let stage = Instant::now();
        let preferred: Vec<Curie> = normalized
            .values()
            .flatten()
            .map(|e| e.preferred_id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let synonyms = self
            .services
            .synonyms
            .get_synonyms(&preferred)
            .await
            .context("synonym retrieval stage failed")?;
        summary.synonym_sets = synonyms.len();
        summary.timings.synonym_retrieval = stage.elapsed().as_secs_f64();

        // Stages 3 and 4: lookups and classification, batch by batch
        let stage = Instant::now();
        let mut reader = EdgeReader::open(edges_path, self.settings.max_edges).await?;
        let mut cache = LookupCache::new();
        let mut index = EntityIndex::new(self.settings.human_taxon.as_str());
        let mut batch_no = 0usize;
        loop {
            let batch = reader.next_batch(self.settings.batch_size).await?;
            if batch.is_empty() {
                break;
            }
            batch_no += 1;
            if !self.settings.retain_lookup_cache {
                cache.clear();
                index.clear();
            }
            index.extend_from(&batch, &normalized, &synonyms);

            let plan = plan_lookups(&batch, &normalized, &index, &cache);
            summary.synonyms_looked_up += plan.len();
            let calls = cache
                .populate(
                    plan,
                    self.services.lookup.as_ref(),
                    self.settings.lookup_concurrency,
                )
                .await
                .with_context(|| format!("name lookup failed for edge batch {batch_no}"))?;
            summary.lookup_calls += calls;

            let inputs = BatchInputs {
                cache: &cache,
                index: &index,
                normalized: &normalized,
                synonyms: &synonyms,
                node_names: &node_names,
            };
            let edges = batch.len();
            for edge in batch {
                let classification = self
                    .classify_and_write(edge, &inputs, &mut writer)
                    .await
                    .with_context(|| format!("failed to write output for edge batch {batch_no}"))?;
                summary.record(classification);
            }

            info!(
                name: "pipeline.batch.completed",
                batch = batch_no,
                edges,
                lookup_calls = calls,
                processed = summary.edges_processed,
                passed = summary.passed,
                unresolved = summary.unresolved,
                ambiguous = summary.ambiguous,
                "Edge batch classified"
            );
        }
        summary.timings.edge_processing = stage.elapsed().as_secs_f64();
        summary.timings.total = started.elapsed().as_secs_f64();
        if summary.timings.edge_processing > 0.0 {
            summary.edges_per_second =
                summary.edges_processed as f64 / summary.timings.edge_processing;
        }

        for classification in Classification::ALL {
            debug!(
                path = %writer.path(classification).display(),
                rows = writer.written(classification),
                "Output file complete"
            );
        }
        info!(
            name: "pipeline.run.completed",
            edges = summary.edges_processed,
            passed = summary.passed,
            unresolved = summary.unresolved,
            ambiguous = summary.ambiguous,
            lookup_calls = summary.lookup_calls,
            seconds = summary.timings.total,
            edges_per_second = summary.edges_per_second,
            "QC run finished"
        );
        Ok(summary)
    }

    async fn classify_and_write(
        &self,
        edge: Edge,
        inputs: &BatchInputs<'_>,
        writer: &mut ClassifiedWriter,
    ) -> Result<Classification> {
        let (classification, trace) = classify(
            &edge,
            inputs.cache,
            inputs.normalized,
            inputs.synonyms,
            inputs.index,
        );
        metrics::counter!(
            "qc_edges_classified_total",
            "classification" => classification.as_str()
        )
        .increment(1);

        let row = ClassifiedEdge {
            edge_id: Uuid::new_v4().to_string(),
            subject_name: display_name(&edge.subject, inputs.node_names, inputs.normalized),
            object_name: display_name(&edge.object, inputs.node_names, inputs.normalized),
            qc_classification: classification,
            qc_phase: QC_PHASE.to_string(),
            qc_debug: trace,
            edge,
        };
        writer.write(&row).await?;
        Ok(classification)
    }
}

/// Everything classification of one batch reads.
struct BatchInputs<'a> {
    cache: &'a LookupCache,
    index: &'a EntityIndex,
    normalized: &'a NormalizedMap,
    synonyms: &'a SynonymMap,
    node_names: &'a HashMap<Curie, String>,
}

/// Node name, else normalized label, else the CURIE itself.
fn display_name(
    curie: &str,
    node_names: &HashMap<Curie, String>,
    normalized: &NormalizedMap,
) -> String {
    node_names
        .get(curie)
        .cloned()
        .or_else(|| {
            normalized
                .get(curie)
                .and_then(Option::as_ref)
                .and_then(|e| e.preferred_label())
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| curie.to_string())
}
