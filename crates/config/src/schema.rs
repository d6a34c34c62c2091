//! Config schema types (server, gemini backend, credential slots, notifications).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SajuConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub credentials: CredentialsConfig,
    pub notify: NotifyConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 5000; `PORT` overrides it.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Generative backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    /// Upper bound for a single (credential, model) attempt, in seconds.
    pub attempt_timeout_secs: u64,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    /// Per-attempt deadline, never shorter than one second.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs.max(1))
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            attempt_timeout_secs: 60,
            max_output_tokens: 8192,
        }
    }
}

/// Where API keys are read from.
///
/// The primary slot is `primary_env`; auxiliary slots are
/// `{primary_env}_1` through `{primary_env}_{aux_slots}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub primary_env: String,
    pub aux_slots: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            primary_env: "GEMINI_API_KEY".into(),
            aux_slots: 10,
        }
    }
}

/// Operator notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook endpoint. `None` disables notifications entirely.
    pub webhook_url: Option<String>,
    /// Emit a message for every failed attempt, not only start/success/exhaustion.
    pub attempt_failures: bool,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            attempt_failures: false,
            timeout_secs: 5,
        }
    }
}
