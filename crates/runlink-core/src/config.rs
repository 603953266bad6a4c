//! Broker configuration
//!
//! Defaults are usable as-is; every value can be overridden through
//! `RUNLINK_*` environment variables.

use serde::{Deserialize, Serialize};

use runlink_types::{OracleError, Result};

/// Environment variable overriding [`OracleConfig::request_expiry_secs`]
pub const ENV_REQUEST_EXPIRY_SECS: &str = "RUNLINK_REQUEST_EXPIRY_SECS";
/// Environment variable overriding [`CallbackBudget::max_nested_calls`]
pub const ENV_CALLBACK_MAX_NESTED_CALLS: &str = "RUNLINK_CALLBACK_MAX_NESTED_CALLS";
/// Environment variable overriding [`CallbackBudget::max_call_depth`]
pub const ENV_CALLBACK_MAX_DEPTH: &str = "RUNLINK_CALLBACK_MAX_DEPTH";

/// Longest accepted request expiry (ten years)
pub const MAX_REQUEST_EXPIRY_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Main broker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Seconds from creation until a request's recorded expiration
    pub request_expiry_secs: i64,
    /// Limits applied to consumer callbacks
    pub callback: CallbackBudget,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            request_expiry_secs: 5 * 60,
            callback: CallbackBudget::default(),
        }
    }
}

/// Resource limits for a consumer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackBudget {
    /// Broker calls a single callback may make through its context
    pub max_nested_calls: u32,
    /// Callbacks that may be active at once (nested fulfillments)
    pub max_call_depth: u32,
}

impl Default for CallbackBudget {
    fn default() -> Self {
        Self {
            max_nested_calls: 16,
            max_call_depth: 4,
        }
    }
}

impl OracleConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_REQUEST_EXPIRY_SECS) {
            config.request_expiry_secs = parse_var(ENV_REQUEST_EXPIRY_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_CALLBACK_MAX_NESTED_CALLS) {
            config.callback.max_nested_calls = parse_var(ENV_CALLBACK_MAX_NESTED_CALLS, &value)?;
        }
        if let Some(value) = lookup(ENV_CALLBACK_MAX_DEPTH) {
            config.callback.max_call_depth = parse_var(ENV_CALLBACK_MAX_DEPTH, &value)?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.request_expiry_secs < 0 {
            errors.push("Request expiry must not be negative".to_string());
        }
        if self.request_expiry_secs > MAX_REQUEST_EXPIRY_SECS {
            errors.push(format!(
                "Request expiry must not exceed {} seconds",
                MAX_REQUEST_EXPIRY_SECS
            ));
        }
        if self.callback.max_call_depth == 0 {
            errors.push("Callback depth must allow at least one callback".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| OracleError::InvalidConfig {
        field: key.to_string(),
        reason: e.to_string(),
    })
}
