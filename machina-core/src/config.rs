//! Configuration for the catalog data layer

use crate::{ConfigError, MachinaResult};
use std::time::Duration;

/// Default table holding the product catalog.
const DEFAULT_TABLE: &str = "Products";

/// Default TTL for cached reads.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default retry budget for remote calls.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Last-resort site base for image URL absolutization. Not resolvable by
/// the remote store, but prevents a crash when nothing else is configured.
const LOCAL_SITE_FALLBACK: &str = "http://localhost:3000";

/// Connection and policy settings for the record store.
///
/// Read once at client construction. Missing required values fail fast
/// with a `ConfigError` so that misconfiguration surfaces at startup
/// rather than on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Bearer token for the remote tabular API.
    pub api_key: String,
    /// Base identifier within the remote store.
    pub base_id: String,
    /// Table name within the base.
    pub table: String,
    /// Explicit site base URL for absolutizing relative image paths.
    pub site_url: Option<String>,
    /// Platform-provided deployment URL, used when `site_url` is absent.
    pub deploy_url: Option<String>,
    /// Uniform TTL for all cached reads.
    pub cache_ttl: Duration,
    /// Total attempt budget per remote call (first try included).
    pub max_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub base_delay: Duration,
}

impl StoreConfig {
    /// Create a config from environment variables.
    ///
    /// Environment variables:
    /// - `MACHINA_AIRTABLE_API_KEY`: bearer token (required)
    /// - `MACHINA_AIRTABLE_BASE_ID`: base identifier (required)
    /// - `MACHINA_AIRTABLE_TABLE`: table name (default: "Products")
    /// - `MACHINA_SITE_URL`: site base for image absolutization (optional)
    /// - `DEPLOY_URL`: platform deployment URL fallback (optional)
    pub fn from_env() -> MachinaResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a config from an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests inject a closure instead of
    /// mutating process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> MachinaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> MachinaResult<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingRequired {
                    field: name.to_string(),
                }
                .into()),
            }
        };

        let config = Self {
            api_key: required("MACHINA_AIRTABLE_API_KEY")?,
            base_id: required("MACHINA_AIRTABLE_BASE_ID")?,
            table: lookup("MACHINA_AIRTABLE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            site_url: lookup("MACHINA_SITE_URL"),
            deploy_url: lookup("DEPLOY_URL"),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MachinaResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts".to_string(),
                value: self.max_attempts.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: format!("{:?}", self.cache_ttl),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Resolve the site base URL for image absolutization.
    ///
    /// Tries, in order: the explicit config value, the platform deployment
    /// URL, then a local fallback. A deployment URL without a scheme is
    /// given `https://` since platforms commonly export the bare hostname.
    pub fn resolved_site_url(&self) -> String {
        if let Some(url) = &self.site_url {
            return url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &self.deploy_url {
            let url = url.trim_end_matches('/');
            if url.contains("://") {
                return url.to_string();
            }
            return format!("https://{}", url);
        }
        LOCAL_SITE_FALLBACK.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
