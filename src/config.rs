//! Client configuration: API key, host, request pacing and retry policy.

use std::time::Duration;

/// Name of the environment variable holding the API key.
pub const API_KEY_ENV: &str = "ER_API_KEY";

/// Configuration for an [`EventRegistry`](crate::EventRegistry) client.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key sent with every request. `None` is accepted for the few
    /// endpoints that allow anonymous access.
    pub api_key: Option<String>,
    /// Base URL of the service.
    pub host: String,
    /// Minimum spacing between any two outbound calls from this client.
    pub min_delay: Duration,
    /// How many times a failed request is re-attempted. The total number
    /// of exchanges is `retry_count + 1`.
    pub retry_count: u32,
    /// Log each request at `info` level instead of `debug`.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            host: "https://eventregistry.org".to_string(),
            min_delay: Duration::from_millis(500),
            retry_count: 2,
            verbose: false,
        }
    }
}

impl Config {
    /// Create a configuration with the given API key and defaults for
    /// everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Read the API key from the `ER_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var(API_KEY_ENV)?;
        Ok(Self::new(api_key))
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
