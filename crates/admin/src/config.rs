//! Migration configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TARGET_SHOPIFY_STORE` - Target store domain (e.g., your-store.myshopify.com)
//! - `TARGET_SHOPIFY_ACCESS_TOKEN` - Target Admin API access token (HIGH PRIVILEGE)
//!
//! ## Required for `companies`
//! - `SOURCE_SHOPIFY_STORE` - Source store domain
//! - `SOURCE_SHOPIFY_ACCESS_TOKEN` - Source Admin API access token (read scopes suffice)
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-01)
//! - `TARGET_SHOPIFY_ENDPOINT` / `SOURCE_SHOPIFY_ENDPOINT` - Full GraphQL URL override
//! - `MIGRATE_MAX_RETRIES` - Retries on throttling (default: 5)
//! - `MIGRATE_BACKOFF_BASE_MS` - Backoff base in milliseconds (default: 1000)
//! - `MIGRATE_TIER_SILVER_MIN` - Orders for Silver (default: 6)
//! - `MIGRATE_TIER_GOLD_MIN` - Orders for Gold (default: 12)
//! - `MIGRATE_TIER_WINDOW_DAYS` - Order window in days (default: 365)
//! - `MIGRATE_FILE_CONCURRENCY` - Parallel file uploads (default: 2)
//! - `MIGRATE_FILE_POLL_ATTEMPTS` - Status polls per file (default: 10)
//! - `MIGRATE_FILE_POLL_INTERVAL_MS` - Delay between polls (default: 2000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use storebridge_core::TierPolicy;
use thiserror::Error;

use crate::shopify::RetryPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2025-01";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Connection settings for one store.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyStoreConfig {
    /// Store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access)
    pub access_token: SecretString,
    /// Full GraphQL endpoint, overriding the one derived from the store
    pub endpoint_override: Option<String>,
}

impl std::fmt::Debug for ShopifyStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStoreConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("endpoint_override", &self.endpoint_override)
            .finish()
    }
}

impl ShopifyStoreConfig {
    /// Build a config for `store`.
    #[must_use]
    pub fn new(store: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            store: normalize_store(&store.into()),
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token,
            endpoint_override: None,
        }
    }

    /// Point the client at a full endpoint URL instead.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    /// The Admin GraphQL endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint_override.clone().unwrap_or_else(|| {
            format!(
                "https://{}/admin/api/{}/graphql.json",
                self.store, self.api_version
            )
        })
    }

    /// Load `<PREFIX>_SHOPIFY_*`. `Ok(None)` when the store is not set.
    fn from_env(prefix: &str, api_version: &str) -> Result<Option<Self>, ConfigError> {
        let Some(store) = get_optional_env(&format!("{prefix}_SHOPIFY_STORE")) else {
            return Ok(None);
        };
        let access_token = get_validated_secret(&format!("{prefix}_SHOPIFY_ACCESS_TOKEN"))?;
        let endpoint_key = format!("{prefix}_SHOPIFY_ENDPOINT");
        let endpoint_override = get_optional_env(&endpoint_key)
            .map(|raw| {
                url::Url::parse(&raw)
                    .map(|_| raw)
                    .map_err(|e| ConfigError::InvalidEnvVar(endpoint_key.clone(), e.to_string()))
            })
            .transpose()?;

        Ok(Some(Self {
            store: normalize_store(&store),
            api_version: api_version.to_string(),
            access_token,
            endpoint_override,
        }))
    }
}

/// File upload settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSettings {
    /// Uploads in flight at once.
    pub concurrency: usize,
    /// Status polls before giving up on a file.
    pub poll_attempts: u32,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_attempts: 10,
            poll_interval: Duration::from_millis(2_000),
        }
    }
}

/// Migration configuration.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Store written to.
    pub target: ShopifyStoreConfig,
    /// Store read from (company migration only).
    pub source: Option<ShopifyStoreConfig>,
    /// Throttling retry policy, shared by both clients.
    pub retry: RetryPolicy,
    /// Tier thresholds.
    pub tier: TierPolicy,
    /// File upload settings.
    pub files: FileSettings,
    /// Sentry DSN for error tracking (optional)
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl MigrateConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if tokens fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_version = get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION);
        let target = ShopifyStoreConfig::from_env("TARGET", &api_version)?
            .ok_or_else(|| ConfigError::MissingEnvVar("TARGET_SHOPIFY_STORE".to_string()))?;
        let source = ShopifyStoreConfig::from_env("SOURCE", &api_version)?;

        let retry = RetryPolicy {
            max_retries: get_parsed_or_default("MIGRATE_MAX_RETRIES", 5)?,
            backoff_base_ms: get_parsed_or_default("MIGRATE_BACKOFF_BASE_MS", 1_000)?,
        };

        let tier = TierPolicy {
            silver_min: get_parsed_or_default("MIGRATE_TIER_SILVER_MIN", 6)?,
            gold_min: get_parsed_or_default("MIGRATE_TIER_GOLD_MIN", 12)?,
            window_days: get_parsed_or_default("MIGRATE_TIER_WINDOW_DAYS", 365)?,
        };
        validate_tier(&tier)?;

        let concurrency: usize = get_parsed_or_default("MIGRATE_FILE_CONCURRENCY", 2)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MIGRATE_FILE_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let files = FileSettings {
            concurrency,
            poll_attempts: get_parsed_or_default("MIGRATE_FILE_POLL_ATTEMPTS", 10)?,
            poll_interval: Duration::from_millis(get_parsed_or_default(
                "MIGRATE_FILE_POLL_INTERVAL_MS",
                2_000,
            )?),
        };

        Ok(Self {
            target,
            source,
            retry,
            tier,
            files,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Strip scheme and trailing slash from a store domain.
fn normalize_store(store: &str) -> String {
    let store = store.trim();
    let store = store
        .strip_prefix("https://")
        .or_else(|| store.strip_prefix("http://"))
        .unwrap_or(store);
    store.trim_end_matches('/').to_string()
}

fn validate_tier(tier: &TierPolicy) -> Result<(), ConfigError> {
    if tier.silver_min > tier.gold_min {
        return Err(ConfigError::InvalidEnvVar(
            "MIGRATE_TIER_SILVER_MIN".to_string(),
            format!(
                "silver threshold {} exceeds gold threshold {}",
                tier.silver_min, tier.gold_min
            ),
        ));
    }
    Ok(())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
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

    // Real access tokens are random hex after a short prefix
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by Shopify."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
