//! Synonym client (`POST /synonyms` on the name resolver).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use super::http::{HttpTransport, JsonClient};
use super::{ServiceError, SynonymSource};
use crate::config::AppConfig;
use crate::domain::{Curie, SynonymSet};

const SERVICE: &str = "synonyms";

#[derive(Debug, Serialize)]
struct SynonymRequest<'a> {
    preferred_curies: &'a [Curie],
}

#[derive(Debug, Clone)]
pub struct SynonymClient {
    http: JsonClient,
    batch_size: usize,
    batch_pause: Duration,
}

impl SynonymClient {
    pub fn new(
        transport: &HttpTransport,
        base_url: &str,
        batch_size: usize,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: transport.client_for(SERVICE, base_url)?,
            batch_size: batch_size.max(1),
            batch_pause: Duration::ZERO,
        })
    }

    pub fn from_config(transport: &HttpTransport, config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(
            transport,
            &config.services.name_resolver_url,
            config.synonyms.batch_size,
        )?
        .with_batch_pause(config.pipeline.batch_pause()))
    }

    #[must_use]
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }
}

#[async_trait]
impl SynonymSource for SynonymClient {
    async fn get_synonyms(
        &self,
        preferred_ids: &[Curie],
    ) -> Result<HashMap<Curie, SynonymSet>, ServiceError> {
        let total_batches = preferred_ids.len().div_ceil(self.batch_size);
        let mut sets = HashMap::with_capacity(preferred_ids.len());

        for (index, batch) in preferred_ids.chunks(self.batch_size).enumerate() {
            if index > 0 {
                self.http.pause(self.batch_pause).await;
            }

            let response: HashMap<Curie, Option<SynonymSet>> = self
                .http
                .post_json(
                    "synonyms",
                    &SynonymRequest {
                        preferred_curies: batch,
                    },
                )
                .await
                .inspect_err(|e| {
                    error!(
                        batch = index + 1,
                        total_batches,
                        error = %e,
                        "Synonym batch failed"
                    );
                })?;

            let before = sets.len();
            sets.extend(
                response
                    .into_iter()
                    .filter_map(|(curie, set)| set.map(|set| (curie, set))),
            );
            debug!(
                batch = index + 1,
                total_batches,
                requested = batch.len(),
                returned = sets.len() - before,
                "Fetched synonym batch"
            );
        }

        info!(
            name: "synonyms.completed",
            requested = preferred_ids.len(),
            returned = sets.len(),
            "Synonym retrieval finished"
        );
        Ok(sets)
    }
}
