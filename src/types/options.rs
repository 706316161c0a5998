//! Controller options and configuration
//!
//! This module contains the configuration for the RL Lab controller, including a
//! builder pattern for programmatic setup and loaders for JSON files and
//! environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LabError, Result};

use super::parameters::ParameterSet;

/// Default engine address
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Default algorithm id
pub const DEFAULT_ALGORITHM: &str = "Q-Learning";

/// Default environment id
pub const DEFAULT_ENVIRONMENT: &str = "FrozenLake-v1-NoSlip";

/// Episode count assumed when the parameters do not name one
pub const DEFAULT_EPISODES: u64 = 1000;

/// Playback cadence in milliseconds
pub const DEFAULT_PLAYBACK_INTERVAL_MS: u64 = 200;

/// Silence on a stream longer than this is a transport error
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 30;

/// Timeout for one-shot requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Lab Options
// ============================================================================

/// Main options for the RL Lab controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabOptions {
    /// Engine base URL
    pub base_url: String,
    /// Initially selected algorithm
    pub algorithm: String,
    /// Initially selected environment
    pub environment: String,
    /// Initial parameter set
    pub parameters: ParameterSet,
    /// Seed sent with every start request
    pub seed: Option<u64>,
    /// Episode count used when the parameters do not name one
    pub default_episodes: u64,
    /// Playback cadence
    pub playback_interval_ms: u64,
    /// Maximum silence on a push stream
    pub stream_read_timeout_secs: u64,
    /// Timeout for one-shot requests
    pub request_timeout_secs: u64,
}

impl Default for LabOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            parameters: ParameterSet::new(),
            seed: Some(42),
            default_episodes: DEFAULT_EPISODES,
            playback_interval_ms: DEFAULT_PLAYBACK_INTERVAL_MS,
            stream_read_timeout_secs: DEFAULT_STREAM_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LabOptions {
    /// Create a new builder for `LabOptions`
    #[must_use]
    pub fn builder() -> LabOptionsBuilder {
        LabOptionsBuilder::default()
    }

    /// Load options from a JSON file; missing fields take their defaults
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or fails validation
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&raw)?;
        options.validate()?;
        log::debug!("Loaded options from {}", path.display());
        Ok(options)
    }

    /// Apply `RL_LAB_*` environment overrides from the process environment
    ///
    /// # Errors
    /// Returns `LabError::InvalidConfig` if a numeric override does not parse
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(std::env::vars())
    }

    /// Apply `RL_LAB_*` overrides from an explicit variable list
    ///
    /// # Errors
    /// Returns `LabError::InvalidConfig` if a numeric override does not parse
    pub fn apply_vars<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "RL_LAB_BASE_URL" => self.base_url = value,
                "RL_LAB_ALGORITHM" => self.algorithm = value,
                "RL_LAB_ENVIRONMENT" => self.environment = value,
                "RL_LAB_SEED" => self.seed = Some(parse_var("RL_LAB_SEED", &value)?),
                "RL_LAB_PLAYBACK_INTERVAL_MS" => {
                    self.playback_interval_ms = parse_var("RL_LAB_PLAYBACK_INTERVAL_MS", &value)?;
                }
                "RL_LAB_STREAM_TIMEOUT_SECS" => {
                    self.stream_read_timeout_secs =
                        parse_var("RL_LAB_STREAM_TIMEOUT_SECS", &value)?;
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Check option bounds
    ///
    /// # Errors
    /// Returns `LabError::InvalidConfig` describing the first bad option
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(LabError::invalid_config("base_url must not be empty"));
        }
        if self.playback_interval_ms == 0 {
            return Err(LabError::invalid_config(
                "playback_interval_ms must be greater than zero",
            ));
        }
        if self.stream_read_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(LabError::invalid_config("timeouts must be greater than zero"));
        }
        if self.default_episodes == 0 {
            return Err(LabError::invalid_config(
                "default_episodes must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Playback cadence as a `Duration`
    #[must_use]
    pub const fn playback_interval(&self) -> Duration {
        Duration::from_millis(self.playback_interval_ms)
    }

    /// Stream silence limit as a `Duration`
    #[must_use]
    pub const fn stream_read_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_read_timeout_secs)
    }

    /// One-shot request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LabError::invalid_config(format!("{name} has invalid value '{value}'")))
}

// ============================================================================
// Builder for LabOptions
// ============================================================================

/// Builder for `LabOptions`
#[derive(Debug, Default)]
pub struct LabOptionsBuilder {
    options: LabOptions,
}

impl LabOptionsBuilder {
    /// Set engine base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    /// Set initial algorithm
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.options.algorithm = algorithm.into();
        self
    }

    /// Set initial environment
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.options.environment = environment.into();
        self
    }

    /// Set initial parameters
    #[must_use]
    pub fn parameters(mut self, parameters: ParameterSet) -> Self {
        self.options.parameters = parameters;
        self
    }

    /// Set or clear the seed
    #[must_use]
    pub const fn seed(mut self, seed: Option<u64>) -> Self {
        self.options.seed = seed;
        self
    }

    /// Set playback cadence
    ///
    /// # Panics
    /// Panics if `interval_ms` is zero
    #[must_use]
    pub fn playback_interval_ms(mut self, interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "playback interval must be greater than zero");
        self.options.playback_interval_ms = interval_ms;
        self
    }

    /// Set stream silence limit
    #[must_use]
    pub const fn stream_read_timeout_secs(mut self, secs: u64) -> Self {
        self.options.stream_read_timeout_secs = secs;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> LabOptions {
        self.options
    }
}
