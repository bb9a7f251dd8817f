//! Reverse name lookup client (`GET /lookup`, `POST /bulk-lookup`).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use super::http::{HttpTransport, JsonClient};
use super::{NameLookup, ServiceError};
use crate::config::AppConfig;
use crate::domain::LookupResult;

const SERVICE: &str = "name_lookup";

/// Separator the service expects between multiple taxa or prefixes.
const LIST_SEPARATOR: &str = "|";

/// Restrictions applied to a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupFilters {
    /// `biolink:`-prefixed semantic type.
    pub biolink_type: Option<String>,
    pub only_taxa: Vec<String>,
    pub only_prefixes: Vec<String>,
}

impl LookupFilters {
    pub fn for_type(biolink_type: impl Into<String>) -> Self {
        Self {
            biolink_type: Some(biolink_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_taxon(mut self, taxon: impl Into<String>) -> Self {
        self.only_taxa.push(taxon.into());
        self
    }

    fn joined(values: &[String]) -> Option<String> {
        (!values.is_empty()).then(|| values.join(LIST_SEPARATOR))
    }
}

#[derive(Debug, Serialize)]
struct BulkLookupRequest<'a> {
    strings: &'a [String],
    biolink_types: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_taxa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_prefixes: Option<String>,
    autocomplete: bool,
    limit: usize,
}

#[derive(Debug, Clone)]
pub struct NameResolverClient {
    http: JsonClient,
    limit: usize,
    bulk_batch_size: usize,
}

impl NameResolverClient {
    pub fn new(
        transport: &HttpTransport,
        base_url: &str,
        limit: usize,
        bulk_batch_size: usize,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: transport.client_for(SERVICE, base_url)?,
            limit,
            bulk_batch_size: bulk_batch_size.max(1),
        })
    }

    pub fn from_config(transport: &HttpTransport, config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            transport,
            &config.services.name_resolver_url,
            config.lookup.limit,
            config.lookup.bulk_batch_size,
        )
    }

    fn query_params(&self, query: &str, filters: &LookupFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("string", query.to_string()),
            ("autocomplete", "false".to_string()),
            ("offset", "0".to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(biolink_type) = &filters.biolink_type {
            params.push(("biolink_type", biolink_type.clone()));
        }
        if let Some(taxa) = LookupFilters::joined(&filters.only_taxa) {
            params.push(("only_taxa", taxa));
        }
        if let Some(prefixes) = LookupFilters::joined(&filters.only_prefixes) {
            params.push(("only_prefixes", prefixes));
        }
        params
    }

    fn bulk_request<'a>(
        &self,
        strings: &'a [String],
        filters: &'a LookupFilters,
    ) -> BulkLookupRequest<'a> {
        BulkLookupRequest {
            strings,
            biolink_types: filters.biolink_type.as_deref().into_iter().collect(),
            only_taxa: LookupFilters::joined(&filters.only_taxa),
            only_prefixes: LookupFilters::joined(&filters.only_prefixes),
            autocomplete: false,
            limit: self.limit,
        }
    }
}

#[async_trait]
impl NameLookup for NameResolverClient {
    async fn lookup(
        &self,
        query: &str,
        filters: &LookupFilters,
    ) -> Result<Vec<LookupResult>, ServiceError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let params = self.query_params(query, filters);
        metrics::counter!("qc_lookup_queries_total", "mode" => "single").increment(1);
        self.http.get_json("lookup", &params).await
    }

    async fn bulk_lookup(
        &self,
        queries: &[String],
        filters: &LookupFilters,
    ) -> Result<HashMap<String, Vec<LookupResult>>, ServiceError> {
        let mut results: HashMap<String, Vec<LookupResult>> = HashMap::with_capacity(queries.len());
        let strings: Vec<String> = queries
            .iter()
            .filter(|q| !q.trim().is_empty())
            .cloned()
            .collect();

        for chunk in strings.chunks(self.bulk_batch_size) {
            let mut response: HashMap<String, Vec<LookupResult>> = self
                .http
                .post_json("bulk-lookup", &self.bulk_request(chunk, filters))
                .await
                .inspect_err(|e| {
                    error!(
                        strings = chunk.len(),
                        biolink_type = filters.biolink_type.as_deref().unwrap_or("any"),
                        error = %e,
                        "Bulk lookup failed"
                    );
                })?;
            metrics::counter!("qc_lookup_queries_total", "mode" => "bulk")
                .increment(chunk.len() as u64);

            for query in chunk {
                let candidates = response.remove(query).unwrap_or_default();
                results.insert(query.clone(), candidates);
            }
            debug!(
                strings = chunk.len(),
                biolink_type = filters.biolink_type.as_deref().unwrap_or("any"),
                "Bulk lookup chunk done"
            );
        }

        // Blank queries never reach the service but still get an answer.
        for query in queries {
            results.entry(query.clone()).or_default();
        }
        Ok(results)
    }
}
