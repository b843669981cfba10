//! Health probing of the worker over HTTP.

use std::time::Duration;

use reqwest::Client;

/// Bounded `GET` against the worker's health endpoint.
///
/// The probe only cares about a boolean-ish outcome: any transport error,
/// timeout, or non-2xx status counts as unhealthy. The worker's internals
/// stay opaque to the supervisor.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    url: String,
    timeout: Duration,
    http: Client,
}

impl HealthProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            http: Client::new(),
        }
    }

    /// One probe; never blocks longer than the configured timeout.
    pub async fn check(&self) -> bool {
        match self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("health probe failed: {error}");
                false
            }
        }
    }
}
