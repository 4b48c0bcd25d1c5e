//! Session-start budget sources.
//!
//! [`HttpBudgetSource`] asks the HTTP API (`GET {api}/gateway/bot`);
//! [`FixedBudget`] returns a constant and is meant for tests and
//! private gateways without that endpoint.

use std::time::Duration;

use gatelink_session::{BudgetSource, SessionError, SessionStartLimit};
use serde::Deserialize;

use crate::GatewayConfig;

/// Fetches the budget from `GET {api_base}/gateway/bot`.
#[derive(Clone)]
pub struct HttpBudgetSource {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl HttpBudgetSource {
    pub fn new(api_base: &str, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/gateway/bot", api_base.trim_end_matches('/')),
            token: token.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.api_base, config.token.clone())
    }
}

impl BudgetSource for HttpBudgetSource {
    async fn fetch(&self) -> Result<SessionStartLimit, SessionError> {
        let response = self
            .client
            .get(&self.url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| SessionError::BudgetUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::BudgetUnavailable(format!(
                "{} returned HTTP {status}",
                self.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SessionError::BudgetUnavailable(e.to_string()))?;
        let limit = parse_gateway_bot(&body)?;
        tracing::debug!(
            total = limit.total,
            remaining = limit.remaining,
            reset_after_ms = limit.reset_after.as_millis() as u64,
            max_concurrency = limit.max_concurrency,
            "session-start budget fetched"
        );
        Ok(limit)
    }
}

impl std::fmt::Debug for HttpBudgetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBudgetSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct GatewayBot {
    session_start_limit: RawLimit,
}

#[derive(Deserialize)]
struct RawLimit {
    total: u32,
    remaining: u32,
    /// Milliseconds.
    reset_after: u64,
    #[serde(default = "one")]
    max_concurrency: u32,
}

fn one() -> u32 {
    1
}

fn parse_gateway_bot(body: &str) -> Result<SessionStartLimit, SessionError> {
    let bot: GatewayBot = serde_json::from_str(body)
        .map_err(|e| SessionError::BudgetUnavailable(format!("bad gateway/bot response: {e}")))?;
    let raw = bot.session_start_limit;
    Ok(SessionStartLimit {
        total: raw.total,
        remaining: raw.remaining,
        reset_after: Duration::from_millis(raw.reset_after),
        max_concurrency: raw.max_concurrency,
    })
}

/// A budget that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedBudget(pub SessionStartLimit);

impl FixedBudget {
    /// A large budget with one Identify per window.
    pub fn unlimited() -> Self {
        Self(SessionStartLimit {
            total: 1000,
            remaining: 1000,
            reset_after: Duration::ZERO,
            max_concurrency: 1,
        })
    }
}

impl BudgetSource for FixedBudget {
    async fn fetch(&self) -> Result<SessionStartLimit, SessionError> {
        Ok(self.0)
    }
}
