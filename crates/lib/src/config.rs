//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.tenkibot/config.json`) and environment.
//! The LINE channel secrets may live in the file or in `LINE_CHANNEL_SECRET` /
//! `LINE_CHANNEL_ACCESS_TOKEN`; env wins when both are set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (LINE).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Forecast provider settings.
    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook HTTP server (default 5000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; LINE must be able to reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Channel secret used to verify webhook signatures. Overridden by
    /// LINE_CHANNEL_SECRET env when set.
    pub channel_secret: Option<String>,
    /// Channel access token for the reply API. Overridden by
    /// LINE_CHANNEL_ACCESS_TOKEN env when set.
    pub channel_access_token: Option<String>,
    /// Messaging API base URL override (default https://api.line.me; for tests).
    pub api_base: Option<String>,
}

/// Forecast provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastConfig {
    /// Forecast JSON endpoint. The region is baked into the URL; the city label in a
    /// user message is display-only and never part of the lookup.
    #[serde(default = "default_forecast_endpoint")]
    pub endpoint: String,

    /// Timeout in seconds for outbound HTTP calls (forecast fetch and reply send).
    #[serde(default = "default_outbound_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_forecast_endpoint() -> String {
    crate::forecast::DEFAULT_ENDPOINT.to_string()
}

fn default_outbound_timeout_secs() -> u64 {
    10
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            endpoint: default_forecast_endpoint(),
            timeout_secs: default_outbound_timeout_secs(),
        }
    }
}

/// LINE credentials resolved once at startup and passed by reference from then on.
#[derive(Debug, Clone)]
pub struct LineCredentials {
    pub channel_secret: String,
    pub channel_access_token: String,
}

fn env_or_config(env_key: &str, config_value: Option<&str>) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the LINE channel secret: env LINE_CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_or_config(
        "LINE_CHANNEL_SECRET",
        config.channels.line.channel_secret.as_deref(),
    )
}

/// Resolve the LINE channel access token: env LINE_CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    env_or_config(
        "LINE_CHANNEL_ACCESS_TOKEN",
        config.channels.line.channel_access_token.as_deref(),
    )
}

/// Resolve both LINE credentials or fail. Called at startup so a misconfigured
/// process aborts before binding the webhook port.
pub fn resolve_line_credentials(config: &Config) -> Result<LineCredentials> {
    let channel_secret = resolve_channel_secret(config).ok_or_else(|| {
        anyhow::anyhow!(
            "LINE channel secret missing (set LINE_CHANNEL_SECRET or channels.line.channelSecret)"
        )
    })?;
    let channel_access_token = resolve_channel_access_token(config).ok_or_else(|| {
        anyhow::anyhow!(
            "LINE channel access token missing (set LINE_CHANNEL_ACCESS_TOKEN or channels.line.channelAccessToken)"
        )
    })?;
    Ok(LineCredentials {
        channel_secret,
        channel_access_token,
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TENKIBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".tenkibot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or TENKIBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
