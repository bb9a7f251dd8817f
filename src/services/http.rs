//! Shared JSON-over-HTTP plumbing for the service clients.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::ServiceError;
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::config::AppConfig;

/// Longest error body kept in a [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection pool, retry policy and pacing shared by every client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("retry", &self.retry)
            .field("rate_limited", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            sleeper: Arc::new(TokioSleeper),
            limiter: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.services.timeout())
            .user_agent(concat!("tmkp-edge-qc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ServiceError::Transport {
                service: "http",
                source,
            })?;

        let transport = Self::new(client, RetryPolicy::from(&config.retry));
        Ok(transport.with_rate_limit(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ))
    }

    /// Pace outgoing requests; a rate of zero disables pacing.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.limiter = NonZeroU32::new(requests_per_second).map(|rate| {
            let burst = NonZeroU32::new(burst_size).unwrap_or(nonzero!(1u32));
            Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)))
        });
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Client for the service rooted at `base_url`.
    pub fn client_for(
        &self,
        service: &'static str,
        base_url: &str,
    ) -> Result<JsonClient, ServiceError> {
        let base_url = Url::parse(base_url).map_err(|_| ServiceError::InvalidUrl {
            service,
            url: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl {
                service,
                url: base_url.to_string(),
            });
        }
        Ok(JsonClient {
            service,
            base_url,
            transport: self.clone(),
        })
    }
}

/// JSON client bound to one service.
#[derive(Debug, Clone)]
pub struct JsonClient {
    service: &'static str,
    base_url: Url,
    transport: HttpTransport,
}

impl JsonClient {
    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        self.execute(|client| client.post(url.clone()).json(body))
            .await
    }

    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        self.execute(|client| client.get(url.clone()).query(query))
            .await
    }

    /// Wait between consecutive batches sent to this service.
    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.transport.sleeper.sleep(duration).await;
        }
    }

    async fn execute<T, F>(&self, build: F) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder + Sync,
    {
        let build = &build;
        let this = self;
        self.transport
            .retry
            .run(self.service, self.transport.sleeper.as_ref(), move || async move {
                this.send_once(build).await
            })
            .await
    }

    async fn send_once<T, F>(&self, build: &F) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder + Sync,
    {
        let service = self.service;
        if let Some(limiter) = &self.transport.limiter {
            limiter.until_ready().await;
        }

        let response = build(&self.transport.client)
            .send()
            .await
            .map_err(|source| ServiceError::Transport { service, source })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ServiceError::Transport { service, source })?;

        debug!(service, %status, bytes = bytes.len(), "Service response");
        metrics::counter!("qc_service_requests_total", "service" => service).increment(1);

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(ServiceError::Status {
                service,
                status,
                body,
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| ServiceError::Decode { service, source })
    }
}
