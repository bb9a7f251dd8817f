//! Node normalization client (`POST /get_normalized_nodes`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use super::http::{HttpTransport, JsonClient};
use super::{NodeNormalizer, ServiceError};
use crate::config::{AppConfig, NormalizationConfig};
use crate::domain::{Curie, NormalizedEntity};

const SERVICE: &str = "node_normalizer";

#[derive(Debug, Serialize)]
struct NormalizeRequest<'a> {
    curies: &'a [Curie],
    conflate: bool,
    drug_chemical_conflate: bool,
    description: bool,
    individual_types: bool,
}

#[derive(Debug, Clone)]
pub struct NodeNormalizerClient {
    http: JsonClient,
    config: NormalizationConfig,
    batch_pause: Duration,
}

impl NodeNormalizerClient {
    pub fn new(
        transport: &HttpTransport,
        base_url: &str,
        config: NormalizationConfig,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: transport.client_for(SERVICE, base_url)?,
            config,
            batch_pause: Duration::ZERO,
        })
    }

    pub fn from_config(transport: &HttpTransport, config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(
            transport,
            &config.services.node_normalizer_url,
            config.normalization.clone(),
        )?
        .with_batch_pause(config.pipeline.batch_pause()))
    }

    #[must_use]
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    fn request<'a>(&self, curies: &'a [Curie]) -> NormalizeRequest<'a> {
        NormalizeRequest {
            curies,
            conflate: self.config.conflate,
            drug_chemical_conflate: self.config.drug_chemical_conflate,
            description: self.config.description,
            individual_types: self.config.individual_types,
        }
    }
}

#[async_trait]
impl NodeNormalizer for NodeNormalizerClient {
    async fn normalize(
        &self,
        curies: &[Curie],
    ) -> Result<HashMap<Curie, Option<NormalizedEntity>>, ServiceError> {
        let batch_size = self.config.batch_size.max(1);
        let total_batches = curies.len().div_ceil(batch_size);
        let mut normalized = HashMap::with_capacity(curies.len());

        for (index, batch) in curies.chunks(batch_size).enumerate() {
            if index > 0 {
                self.http.pause(self.batch_pause).await;
            }

            let mut response: HashMap<Curie, Option<NormalizedEntity>> = self
                .http
                .post_json("get_normalized_nodes", &self.request(batch))
                .await
                .inspect_err(|e| {
                    error!(
                        batch = index + 1,
                        total_batches,
                        error = %e,
                        "Normalization batch failed"
                    );
                })?;

            let mut resolved = 0usize;
            for curie in batch {
                let entity = response.remove(curie).flatten();
                resolved += usize::from(entity.is_some());
                normalized.insert(curie.clone(), entity);
            }
            debug!(
                batch = index + 1,
                total_batches,
                requested = batch.len(),
                resolved,
                "Normalized batch"
            );
        }

        let resolved = normalized.values().filter(|e| e.is_some()).count();
        info!(
            name: "normalizer.completed",
            requested = curies.len(),
            resolved,
            "Normalization finished"
        );
        Ok(normalized)
    }
}
