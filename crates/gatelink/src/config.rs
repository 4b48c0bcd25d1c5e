//! Client configuration.
//!
//! A [`GatewayConfig`] can be built in code (every field has a default)
//! or loaded from a JSON file:
//!
//! ```json
//! {
//!   "token": "MTA...",
//!   "intents": 37377,
//!   "presence_status": "idle",
//!   "idle_tick_rate_hz": 20
//! }
//! ```
//!
//! The token can be left out of the file and supplied through the
//! `GATELINK_TOKEN` environment variable instead; the variable wins
//! when both are set.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use gatelink_protocol::{IdentifyProperties, Intents};
use gatelink_tick::TickConfig;
use serde::Deserialize;
use tracing::warn;

use crate::ConfigError;
use crate::reconnect::ReconnectPolicy;

/// Environment variable that overrides the configured token.
pub const TOKEN_ENV: &str = "GATELINK_TOKEN";

/// Everything needed to run one gateway client.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket URL of the gateway, including version and encoding.
    pub gateway_url: String,
    /// Base URL of the HTTP API (used for the session-start budget).
    pub api_base: String,
    /// Bot token. Never logged.
    pub token: String,
    pub intents: Intents,
    pub properties: IdentifyProperties,
    /// Presence status sent with Identify.
    pub presence_status: String,
    /// Members threshold for offline member lists. Omitted when `None`.
    pub large_threshold: Option<u8>,
    /// How often the runner checks heartbeats and calls `on_idle`.
    pub idle_tick_rate_hz: u32,
    /// Random delay (0..max ms) before the first idle tick.
    pub tick_jitter_ms: u64,
    /// Reconnects allowed in a row without reaching a connected session.
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
            api_base: "https://discord.com/api/v10".to_string(),
            token: String::new(),
            intents: Intents::GUILDS
                | Intents::GUILD_MESSAGES
                | Intents::GUILD_MESSAGE_REACTIONS
                | Intents::DIRECT_MESSAGES
                | Intents::MESSAGE_CONTENT,
            properties: IdentifyProperties::default(),
            presence_status: "online".to_string(),
            large_threshold: None,
            idle_tick_rate_hz: 10,
            tick_jitter_ms: 0,
            max_reconnect_attempts: 15,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 60_000,
        }
    }
}

impl GatewayConfig {
    /// A default config for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Loads a config from a JSON file, applies the token environment
    /// override and validates the result.
    ///
    /// # Errors
    /// - [`ConfigError::Read`] / [`ConfigError::Parse`] for unreadable
    ///   or malformed files.
    /// - [`ConfigError::MissingToken`] if neither the file nor
    ///   `GATELINK_TOKEN` provides a token.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.apply_token_override(std::env::var(TOKEN_ENV).ok());
        if config.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(config.validated())
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = token;
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - `idle_tick_rate_hz` is kept in `1..=128`; heartbeats are only
    ///   checked on idle ticks, so a rate of 0 would never heartbeat.
    /// - `reconnect_base_delay_ms` is capped at `reconnect_max_delay_ms`.
    pub fn validated(mut self) -> Self {
        if self.idle_tick_rate_hz == 0 {
            warn!("idle_tick_rate_hz of 0 would disable heartbeats, using 1");
            self.idle_tick_rate_hz = 1;
        }
        if self.idle_tick_rate_hz > TickConfig::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.idle_tick_rate_hz,
                max = TickConfig::MAX_TICK_RATE_HZ,
                "idle_tick_rate_hz exceeds maximum, clamping"
            );
            self.idle_tick_rate_hz = TickConfig::MAX_TICK_RATE_HZ;
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            self.reconnect_base_delay_ms = self.reconnect_max_delay_ms;
        }
        self
    }

    pub(crate) fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate_hz: self.idle_tick_rate_hz,
            initial_jitter_ms: self.tick_jitter_ms,
        }
    }

    pub(crate) fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .field("presence_status", &self.presence_status)
            .field("large_threshold", &self.large_threshold)
            .field("idle_tick_rate_hz", &self.idle_tick_rate_hz)
            .field("tick_jitter_ms", &self.tick_jitter_ms)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_base_delay_ms", &self.reconnect_base_delay_ms)
            .field("reconnect_max_delay_ms", &self.reconnect_max_delay_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_matches_documented_values() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.max_reconnect_attempts, 15);
        assert_eq!(cfg.presence_status, "online");
        assert!(cfg.intents.contains(Intents::GUILD_MESSAGES));
        assert!(cfg.token.is_empty());
    }

    #[test]
    fn test_from_file_reads_partial_config_over_defaults() {
        let file = write_config(r#"{"token":"abc","intents":513,"idle_tick_rate_hz":20}"#);

        let cfg = GatewayConfig::from_file(file.path()).unwrap();

        assert_eq!(cfg.intents, Intents::GUILDS | Intents::GUILD_MESSAGES);
        assert_eq!(cfg.idle_tick_rate_hz, 20);
        assert_eq!(cfg.max_reconnect_attempts, 15);
        assert!(!cfg.token.is_empty());
    }

    #[test]
    fn test_from_file_missing_file_is_read_error() {
        let err = GatewayConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_malformed_json_is_parse_error() {
        let file = write_config("{ token: ");
        let err = GatewayConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_token_override_replaces_file_token() {
        let mut cfg = GatewayConfig::new("from-file");
        cfg.apply_token_override(Some("from-env".into()));
        assert_eq!(cfg.token, "from-env");
    }

    #[test]
    fn test_blank_token_override_is_ignored() {
        let mut cfg = GatewayConfig::new("from-file");
        cfg.apply_token_override(Some("  ".into()));
        cfg.apply_token_override(None);
        assert_eq!(cfg.token, "from-file");
    }

    #[test]
    fn test_validated_clamps_tick_rate() {
        let cfg = GatewayConfig {
            idle_tick_rate_hz: 0,
            ..GatewayConfig::default()
        }
        .validated();
        assert_eq!(cfg.idle_tick_rate_hz, 1);

        let cfg = GatewayConfig {
            idle_tick_rate_hz: 1_000,
            ..GatewayConfig::default()
        }
        .validated();
        assert_eq!(cfg.idle_tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
    }

    #[test]
    fn test_validated_caps_base_delay_at_max_delay() {
        let cfg = GatewayConfig {
            reconnect_base_delay_ms: 90_000,
            reconnect_max_delay_ms: 30_000,
            ..GatewayConfig::default()
        }
        .validated();
        assert_eq!(cfg.reconnect_base_delay_ms, 30_000);
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let cfg = GatewayConfig::new("hunter2-token");
        assert!(!format!("{cfg:?}").contains("hunter2-token"));
    }
}
