//! Bounded health polling against a tool-server endpoint.
//!
//! Contract: `GET {endpoint}/health` must answer with a successful HTTP
//! status AND a JSON body whose `status` field equals `"ok"`. Anything else
//! (network error, timeout, wrong body) counts as "not yet ready" and is
//! swallowed until the attempt budget runs out. There is no partial credit:
//! either the endpoint becomes fully healthy within the budget or the wait
//! fails.

use std::time::Duration;

use tracing::{debug, trace};

/// Sentinel the health body must report.
const HEALTH_OK: &str = "ok";

/// Poll pacing. The defaults are the contract values; tests shorten the
/// interval without changing the attempt semantics.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Delay between consecutive attempts.
    pub interval: Duration,
    /// Total attempt budget.
    pub attempts: u32,
    /// Time budget for a single attempt.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            attempts: 30,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// The endpoint never became healthy within the attempt budget.
#[derive(Debug, thiserror::Error)]
#[error("endpoint {endpoint} did not report healthy after {attempts} attempts")]
pub struct HealthTimeout {
    pub endpoint: String,
    pub attempts: u32,
}

/// Serialized poller for one endpoint's health path.
pub struct HealthPoller {
    client: reqwest::Client,
    config: HealthConfig,
}

impl HealthPoller {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Wait until the endpoint reports healthy.
    ///
    /// Attempts are strictly serialized: the next attempt only begins after
    /// the previous one resolved or timed out. Returns the number of
    /// attempts made on success.
    pub async fn wait_healthy(&self, endpoint: &str) -> Result<u32, HealthTimeout> {
        let url = format!("{}/health", endpoint.trim_end_matches('/'));

        for attempt in 1..=self.config.attempts {
            if self.probe(&url).await {
                debug!("endpoint {endpoint} healthy after {attempt} attempt(s)");
                return Ok(attempt);
            }

            if attempt < self.config.attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        Err(HealthTimeout {
            endpoint: endpoint.to_string(),
            attempts: self.config.attempts,
        })
    }

    /// One attempt. Every failure mode collapses to `false`.
    async fn probe(&self, url: &str) -> bool {
        let response = match self
            .client
            .get(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                trace!("health probe failed: {e}");
                return false;
            }
        };

        if !response.status().is_success() {
            trace!("health probe returned status {}", response.status());
            return false;
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => body.get("status").and_then(|v| v.as_str()) == Some(HEALTH_OK),
            Err(e) => {
                trace!("health probe body unreadable: {e}");
                false
            }
        }
    }
}
