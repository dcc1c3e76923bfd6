//! Retailer client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AGRITRADE_API_URL` - Base URL of the marketplace REST API (e.g. `http://localhost:8080/api`)
//!
//! ## Optional
//! - `AGRITRADE_API_TOKEN` - Pre-issued bearer token (overrides the one in the durable store)
//! - `AGRITRADE_CURRENCY` - Payment currency (default: INR)
//! - `AGRITRADE_REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout (default: 30)
//! - `AGRITRADE_VERIFY_TIMEOUT_SECS` - Payment verification timeout, `0` disables (default: 60)
//! - `AGRITRADE_ADD_POLICY` - Over-stock add policy, `reject` or `clamp` (default: reject)
//! - `AGRITRADE_TRACKING_INTERVAL_SECS` - Delivery location poll interval (default: 5)
//! - `AGRITRADE_CATALOG_TTL_SECS` - Catalog cache lifetime (default: 60)
//! - `AGRITRADE_STATE_DIR` - Directory for the CLI's session files (default: .agritrade)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use agritrade_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::AddPolicy;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Retailer client configuration.
#[derive(Debug, Clone)]
pub struct RetailerConfig {
    /// Marketplace API settings
    pub api: ApiConfig,
    /// Checkout behaviour
    pub checkout: CheckoutSettings,
    /// Delivery tracking poll interval
    pub tracking_interval: Duration,
    /// Where file-backed session stores live
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Marketplace REST API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Bearer token sent with every request
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// How long a catalog listing stays cached
    pub catalog_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("catalog_ttl", &self.catalog_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with default timeouts and no token.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            request_timeout: Duration::from_secs(30),
            catalog_ttl: Duration::from_secs(60),
        }
    }
}

/// Checkout behaviour knobs.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutSettings {
    /// Currency sent with payment intents
    pub currency: CurrencyCode,
    /// Upper bound on the verification call; `None` waits indefinitely
    pub verify_timeout: Option<Duration>,
    /// What to do when an add exceeds available stock
    pub add_policy: AddPolicy,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::INR,
            verify_timeout: Some(Duration::from_secs(60)),
            add_policy: AddPolicy::Reject,
        }
    }
}

impl RetailerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RetailerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let base_url = env.required("AGRITRADE_API_URL")?;
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("AGRITRADE_API_URL".to_string(), e.to_string()))?;

        let token = match env.optional("AGRITRADE_API_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "AGRITRADE_API_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let api = ApiConfig {
            base_url,
            token,
            request_timeout: Duration::from_secs(env.parsed("AGRITRADE_REQUEST_TIMEOUT_SECS", 30)?),
            catalog_ttl: Duration::from_secs(env.parsed("AGRITRADE_CATALOG_TTL_SECS", 60)?),
        };

        let verify_secs: u64 = env.parsed("AGRITRADE_VERIFY_TIMEOUT_SECS", 60)?;
        let checkout = CheckoutSettings {
            currency: env.parsed("AGRITRADE_CURRENCY", CurrencyCode::INR)?,
            verify_timeout: (verify_secs > 0).then(|| Duration::from_secs(verify_secs)),
            add_policy: env.parsed("AGRITRADE_ADD_POLICY", AddPolicy::Reject)?,
        };

        let tracking_secs: u64 = env.parsed("AGRITRADE_TRACKING_INTERVAL_SECS", 5)?;
        if tracking_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "AGRITRADE_TRACKING_INTERVAL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api,
            checkout,
            tracking_interval: Duration::from_secs(tracking_secs),
            state_dir: PathBuf::from(
                env.optional("AGRITRADE_STATE_DIR")
                    .unwrap_or_else(|| ".agritrade".to_string()),
            ),
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Reject tokens that are obviously copied from a sample `.env`.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RetailerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RetailerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("AGRITRADE_API_URL", "http://localhost:8080/api")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8080/api");
        assert!(config.api.token.is_none());
        assert_eq!(config.checkout.currency, CurrencyCode::INR);
        assert_eq!(config.checkout.verify_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.checkout.add_policy, AddPolicy::Reject);
        assert_eq!(config.tracking_interval, Duration::from_secs(5));
        assert_eq!(config.state_dir, PathBuf::from(".agritrade"));
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "AGRITRADE_API_URL"));
    }

    #[test]
    fn test_invalid_api_url() {
        let err = load(&[("AGRITRADE_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_zero_verify_timeout_disables_it() {
        let config = load(&[
            ("AGRITRADE_API_URL", "http://localhost/api"),
            ("AGRITRADE_VERIFY_TIMEOUT_SECS", "0"),
            ("AGRITRADE_ADD_POLICY", "clamp"),
        ])
        .unwrap();
        assert_eq!(config.checkout.verify_timeout, None);
        assert_eq!(config.checkout.add_policy, AddPolicy::Clamp);
    }

    #[test]
    fn test_bad_policy_is_reported() {
        let err = load(&[
            ("AGRITRADE_API_URL", "http://localhost/api"),
            ("AGRITRADE_ADD_POLICY", "sometimes"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "AGRITRADE_ADD_POLICY"));
    }

    #[test]
    fn test_zero_tracking_interval_rejected() {
        let err = load(&[
            ("AGRITRADE_API_URL", "http://localhost/api"),
            ("AGRITRADE_TRACKING_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = load(&[
            ("AGRITRADE_API_URL", "http://localhost/api"),
            ("AGRITRADE_API_TOKEN", "your-token-here"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = load(&[
            ("AGRITRADE_API_URL", "http://localhost/api"),
            ("AGRITRADE_API_TOKEN", "eyJhbGciOiJIUzI1NiJ9.c2lnbmVk.Zm9v"),
        ])
        .unwrap();
        let token = config.api.token.as_ref().unwrap();
        assert_eq!(token.expose_secret(), "eyJhbGciOiJIUzI1NiJ9.c2lnbmVk.Zm9v");
        let debug = format!("{:?}", config.api);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("eyJhbGci"));
    }
}
