//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `COMMERCE_PROJECT_KEY` - Commerce platform project key
//! - `COMMERCE_CLIENT_ID` - API client ID used for anonymous sessions
//! - `COMMERCE_CLIENT_SECRET` - API client secret (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `COMMERCE_API_URL` - API base URL (default: <https://api.europe-west1.gcp.commercetools.com>)
//! - `COMMERCE_AUTH_URL` - Auth base URL (default: <https://auth.europe-west1.gcp.commercetools.com>)
//! - `COMMERCE_SCOPES` - Space-separated OAuth scopes (default: `manage_my_orders:<project>`)
//! - `MARKET_COUNTRY` - Country every cart is pinned to (default: DE)
//! - `MARKET_CURRENCY` - Cart currency (default: EUR)
//! - `MARKET_TAX_RATE_NAME` - External tax rate name (default: Standard)
//! - `MARKET_TAX_RATE` - External tax rate as a fraction (default: 0.19)
//! - `MARKET_TAX_INCLUDED` - Whether prices include tax (default: true)
//! - `CART_OPERATION_TIMEOUT_SECS` - Deadline for a single cart operation (default: 30)
//! - `CART_SESSION_IDLE_SECS` - Idle time before a visitor's cart session is dropped (default: 3600)
//! - `CART_MAX_SESSIONS` - Maximum number of live cart sessions (default: 10000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use boba_core::{CountryCode, CurrencyCode, Market, MarketTaxRate};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Commerce platform API configuration
    pub commerce: CommerceConfig,
    /// Market every cart is configured for
    pub market: Market,
    /// Cart session and queue settings
    pub cart: CartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce platform API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CommerceConfig {
    /// Project key, the first path segment of every API call
    pub project_key: String,
    /// API base URL (without trailing slash)
    pub api_url: String,
    /// Auth base URL (without trailing slash)
    pub auth_url: String,
    /// API client ID
    pub client_id: String,
    /// API client secret
    pub client_secret: SecretString,
    /// OAuth scopes requested for anonymous sessions
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("project_key", &self.project_key)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Cart session and mutation queue settings.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Deadline for one queued cart operation, including its retry
    pub operation_timeout: Duration,
    /// Idle time after which a visitor's cart session is evicted
    pub session_idle: Duration,
    /// Upper bound on live cart sessions
    pub max_sessions: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
            session_idle: Duration::from_secs(3600),
            max_sessions: 10_000,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
            commerce: CommerceConfig::from_env()?,
            market: market_from_env()?,
            cart: CartConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CommerceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_key = get_required_env("COMMERCE_PROJECT_KEY")?;
        let scopes = get_optional_env("COMMERCE_SCOPES").map_or_else(
            || vec![format!("manage_my_orders:{project_key}")],
            |raw| raw.split_whitespace().map(String::from).collect(),
        );

        Ok(Self {
            api_url: trim_url(&get_env_or_default(
                "COMMERCE_API_URL",
                "https://api.europe-west1.gcp.commercetools.com",
            )),
            auth_url: trim_url(&get_env_or_default(
                "COMMERCE_AUTH_URL",
                "https://auth.europe-west1.gcp.commercetools.com",
            )),
            client_id: get_required_env("COMMERCE_CLIENT_ID")?,
            client_secret: get_validated_secret("COMMERCE_CLIENT_SECRET")?,
            project_key,
            scopes,
        })
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            operation_timeout: Duration::from_secs(parse_env_or_default::<u64>(
                "CART_OPERATION_TIMEOUT_SECS",
                "30",
            )?),
            session_idle: Duration::from_secs(parse_env_or_default::<u64>(
                "CART_SESSION_IDLE_SECS",
                "3600",
            )?),
            max_sessions: parse_env_or_default::<u64>("CART_MAX_SESSIONS", "10000")?,
        })
    }
}

fn market_from_env() -> Result<Market, ConfigError> {
    let amount = parse_env_or_default::<Decimal>("MARKET_TAX_RATE", "0.19")?;
    if amount < Decimal::ZERO || amount > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "MARKET_TAX_RATE".to_string(),
            format!("must be a fraction between 0 and 1 (got {amount})"),
        ));
    }

    Ok(Market {
        country: parse_env_or_default::<CountryCode>("MARKET_COUNTRY", "DE")?,
        currency: parse_env_or_default::<CurrencyCode>("MARKET_CURRENCY", "EUR")?,
        tax_rate: MarketTaxRate {
            name: get_env_or_default("MARKET_TAX_RATE_NAME", "Standard"),
            amount,
            included_in_price: parse_env_or_default::<bool>("MARKET_TAX_INCLUDED", "true")?,
        },
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
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

    // Real API client secrets are randomly generated
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the generated client secret."
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
