//! Process-wide settings, read once at startup.

use crate::client::{Client, DEFAULT_MODEL};
use crate::controller::{SessionState, StaleResponsePolicy};
use crate::errors::GatewayError;
use crate::http::common::DEFAULT_BASE_URL;
use std::time::Duration;

/// Primary environment variable for the API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Fallback API key variable.
pub const FALLBACK_API_KEY_VAR: &str = "API_KEY";
pub const MODEL_VAR: &str = "PLANT_ADVISOR_MODEL";
pub const BASE_URL_VAR: &str = "PLANT_ADVISOR_BASE_URL";
pub const TIMEOUT_VAR: &str = "PLANT_ADVISOR_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "PLANT_ADVISOR_CONNECT_TIMEOUT_SECS";
/// `last-resolved-wins` (default) or `latest-request-wins`.
pub const STALE_POLICY_VAR: &str = "PLANT_ADVISOR_STALE_POLICY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Empty when no key is configured; requests then fail with
    /// [`GatewayError::MissingCredential`].
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub stale_response_policy: StaleResponsePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            connect_timeout: None,
            stale_response_policy: StaleResponsePolicy::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; unset, blank, or unparsable
    /// values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let seconds = |name: &str| {
            let raw = get(name)?;
            match raw.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!("Ignoring {name}={raw:?}: not a whole number of seconds");
                    None
                }
            }
        };

        let defaults = Self::default();
        Self {
            api_key: get(API_KEY_VAR)
                .or_else(|| get(FALLBACK_API_KEY_VAR))
                .unwrap_or_default(),
            model: get(MODEL_VAR).unwrap_or(defaults.model),
            base_url: get(BASE_URL_VAR).unwrap_or(defaults.base_url),
            timeout: seconds(TIMEOUT_VAR),
            connect_timeout: seconds(CONNECT_TIMEOUT_VAR),
            stale_response_policy: get(STALE_POLICY_VAR)
                .and_then(|raw| match raw.parse() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        tracing::warn!("Ignoring {STALE_POLICY_VAR}: {e}");
                        None
                    }
                })
                .unwrap_or(defaults.stale_response_policy),
        }
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Fresh session using the configured stale-response policy.
    #[must_use]
    pub fn session(&self) -> SessionState {
        SessionState::with_policy(self.stale_response_policy)
    }

    /// Builds a [`Client`] from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClientBuild`] if the HTTP client cannot be built.
    pub fn client(&self) -> Result<Client, GatewayError> {
        let mut builder = Client::builder(self.api_key.clone())
            .base_url(self.base_url.clone())
            .model(self.model.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        builder.build()
    }
}
