//! Runtime configuration

use std::time::Duration;

use anyhow::Result;

use crate::utils::env_flag;
use crate::utils::env_var_or_else;

const DEFAULT_IDENTITY_EMAIL: &str = "default@localhost";
const DEFAULT_IDENTITY_NAME: &str = "Default";
const DEFAULT_CALENDAR_SYNC_TIMEOUT_MS: &str = "5000";

/// Configuration shared with the request handlers
#[derive(Clone)]
pub struct Config {
    /// Whether requests without credentials fall back to the default identity
    pub default_identity_enabled: bool,

    /// Email address the default identity is registered under
    pub default_identity_email: String,

    /// Display name of the default identity
    pub default_identity_name: String,

    /// How long a calendar sync attempt may take
    pub calendar_sync_timeout: Duration,
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// # Errors
    ///
    /// Will return `Err` when `CALENDAR_SYNC_TIMEOUT_MS` is not a number
    pub fn from_env() -> Result<Self> {
        let default_identity_enabled = env_flag("DEFAULT_IDENTITY", true);

        let default_identity_email = env_var_or_else("DEFAULT_IDENTITY_EMAIL", || {
            String::from(DEFAULT_IDENTITY_EMAIL)
        });

        let default_identity_name = env_var_or_else("DEFAULT_IDENTITY_NAME", || {
            String::from(DEFAULT_IDENTITY_NAME)
        });

        let calendar_sync_timeout = env_var_or_else("CALENDAR_SYNC_TIMEOUT_MS", || {
            String::from(DEFAULT_CALENDAR_SYNC_TIMEOUT_MS)
        })
        .parse::<u64>()
        .map(Duration::from_millis)?;

        Ok(Self {
            default_identity_enabled,
            default_identity_email,
            default_identity_name,
            calendar_sync_timeout,
        })
    }
}
