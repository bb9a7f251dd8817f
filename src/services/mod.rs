//! Clients for the external identifier services.
//!
//! Every client goes through [`http::JsonClient`], which paces requests with
//! the shared rate limiter and retries transient failures according to a
//! [`retry::RetryPolicy`]. The pipeline only sees the traits defined here, so
//! tests can substitute fixed answers.

pub mod http;
pub mod name_lookup;
pub mod normalizer;
pub mod retry;
pub mod synonyms;

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::{Curie, LookupResult, NormalizedEntity, SynonymSet};

pub use http::{HttpTransport, JsonClient};
pub use name_lookup::{LookupFilters, NameResolverClient};
pub use normalizer::NodeNormalizerClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use synonyms::SynonymClient;

/// Failure talking to an external service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned a payload that could not be decoded: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base url for {service}: {url}")]
    InvalidUrl { service: &'static str, url: String },

    #[error("{service} still failing after {attempts} attempts: {last}")]
    RetriesExhausted {
        service: &'static str,
        attempts: u32,
        #[source]
        last: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Only server-side (5xx) failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status.is_server_error())
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Status { service, .. }
            | Self::Transport { service, .. }
            | Self::Decode { service, .. }
            | Self::InvalidUrl { service, .. }
            | Self::RetriesExhausted { service, .. } => service,
        }
    }
}

/// Maps arbitrary CURIEs to their preferred identifiers.
#[async_trait]
pub trait NodeNormalizer: Send + Sync {
    /// Every input CURIE gets an entry; `None` means it could not be normalized.
    async fn normalize(
        &self,
        curies: &[Curie],
    ) -> Result<HashMap<Curie, Option<NormalizedEntity>>, ServiceError>;
}

/// Fetches the synonym sets of preferred identifiers.
#[async_trait]
pub trait SynonymSource: Send + Sync {
    /// Identifiers the service knows nothing about are absent from the map.
    async fn get_synonyms(
        &self,
        preferred_ids: &[Curie],
    ) -> Result<HashMap<Curie, SynonymSet>, ServiceError>;
}

/// Reverse lookup from a name to candidate entities.
#[async_trait]
pub trait NameLookup: Send + Sync {
    async fn lookup(
        &self,
        query: &str,
        filters: &LookupFilters,
    ) -> Result<Vec<LookupResult>, ServiceError>;

    /// Same answer as calling [`NameLookup::lookup`] once per query; every
    /// query gets an entry.
    async fn bulk_lookup(
        &self,
        queries: &[String],
        filters: &LookupFilters,
    ) -> Result<HashMap<String, Vec<LookupResult>>, ServiceError>;
}
