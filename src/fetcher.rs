use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info};
use reqwest::Client;

use crate::latest_rates::LatestRates;

/// Somewhere the current rates can be loaded from.
#[allow(async_fn_in_trait)]
pub trait RateSource {
    async fn fetch_latest(&self) -> Result<LatestRates>;
}

pub struct HttpRateSource {
    client: Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Can't build HTTP client")?;

        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl RateSource for HttpRateSource {
    async fn fetch_latest(&self) -> Result<LatestRates> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?;
        if !resp.status().is_success() {
            anyhow::bail!("Can't download the rates: {}", resp.status());
        }

        let text = resp.text().await?;
        let latest: LatestRates =
            serde_json::from_str(&text).context("Rates response is not valid JSON")?;

        Ok(latest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of calls, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Pause after the failed attempt `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct RetryingFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: RateSource> RetryingFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns `None` once every attempt has failed; errors never escape.
    pub async fn fetch_rates(&self) -> Option<LatestRates> {
        for attempt in 0..self.policy.max_attempts {
            match self.source.fetch_latest().await {
                Ok(latest) => return Some(latest),
                Err(e) => error!(
                    "API request failed on attempt {}/{} ({:#}). Trace: {:?}",
                    attempt + 1,
                    self.policy.max_attempts,
                    e,
                    e
                ),
            }

            if attempt + 1 < self.policy.max_attempts {
                let wait = self.policy.delay_for_attempt(attempt);
                info!("Waiting {} seconds before next retry...", wait.as_secs());
                tokio::time::sleep(wait).await;
            }
        }

        error!("Max retries reached. API might be down.");
        None
    }
}
