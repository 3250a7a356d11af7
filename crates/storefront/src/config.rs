//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (used in verification,
//!   recovery and OAuth redirect links)
//! - `APPWRITE_PROJECT_ID` - Hosted backend project ID
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `APPWRITE_ENDPOINT` - Backend REST endpoint (default: <https://cloud.appwrite.io/v1>)
//! - `APPWRITE_API_KEY` - Server API key, used for sign-up bookkeeping and seeding
//! - `APPWRITE_DATABASE_ID` - Database holding the collections below
//! - `APPWRITE_PURCHASES_COLLECTION_ID` - (default: sh-purchases)
//! - `APPWRITE_ITEMS_COLLECTION_ID` - (default: sh-items)
//! - `APPWRITE_USERS_COLLECTION_ID` - (default: sh-users)
//! - `APPWRITE_APPOINTMENTS_COLLECTION_ID` - (default: appointments)
//! - `RESEND_API_KEY` / `RESEND_FROM_EMAIL` - Transactional email provider
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USER` / `SMTP_PASS` / `SMTP_SECURE` / `SMTP_FROM` -
//!   SMTP relay, used alone or as the fallback when the provider rejects the
//!   sender domain
//! - `TAX_RATE_PERCENT` - Order tax rate (default: 10)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

pub const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";
pub const DEFAULT_FROM_EMAIL: &str = "noreply.servicehub@wabanakisoftwaresolutions.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
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
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Hosted backend configuration
    pub appwrite: AppwriteConfig,
    /// Email transports
    pub email: EmailConfig,
    /// Tax applied to cart subtotals, in percent
    pub tax_rate_percent: Decimal,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AppwriteConfig {
    /// REST endpoint including the `/v1` suffix
    pub endpoint: String,
    pub project_id: String,
    /// Server API key; absent in session-only deployments
    pub api_key: Option<SecretString>,
    /// Absent means persistence is unavailable (reported per request)
    pub database_id: Option<String>,
    pub collections: CollectionIds,
}

impl std::fmt::Debug for AppwriteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppwriteConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("database_id", &self.database_id)
            .field("collections", &self.collections)
            .finish()
    }
}

/// Collection IDs inside the configured database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIds {
    pub purchases: String,
    pub items: String,
    pub users: String,
    pub appointments: String,
}

impl Default for CollectionIds {
    fn default() -> Self {
        Self {
            purchases: "sh-purchases".to_string(),
            items: "sh-items".to_string(),
            users: "sh-users".to_string(),
            appointments: "appointments".to_string(),
        }
    }
}

/// Email transport configuration.
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub resend: Option<ResendConfig>,
    pub smtp: Option<SmtpConfig>,
}

/// Transactional email provider configuration.
#[derive(Clone)]
pub struct ResendConfig {
    pub api_key: SecretString,
    pub from: String,
    /// Base URL of the provider API (overridable for staging)
    pub api_base: String,
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SMTP relay configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Implicit TLS (port 465 style) instead of STARTTLS
    pub implicit_tls: bool,
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("implicit_tls", &self.implicit_tls)
            .field("from", &self.from)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// if a collection ID was configured as the database ID, or if an API key
    /// looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let appwrite = AppwriteConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let tax_rate_percent = parse_env("TAX_RATE_PERCENT", "10")?;

        Ok(Self {
            host,
            port,
            base_url,
            appwrite,
            email,
            tax_rate_percent,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl AppwriteConfig {
    /// Load backend configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the project ID is missing, the API key looks
    /// like a placeholder, or the database ID is actually a collection ID.
    pub fn from_env() -> Result<Self, ConfigError> {
        let collections = CollectionIds {
            purchases: get_env_or_default("APPWRITE_PURCHASES_COLLECTION_ID", "sh-purchases"),
            items: get_env_or_default("APPWRITE_ITEMS_COLLECTION_ID", "sh-items"),
            users: get_env_or_default("APPWRITE_USERS_COLLECTION_ID", "sh-users"),
            appointments: get_env_or_default(
                "APPWRITE_APPOINTMENTS_COLLECTION_ID",
                "appointments",
            ),
        };

        let database_id = get_optional_env("APPWRITE_DATABASE_ID");
        if let Some(id) = &database_id {
            validate_database_id(id, &collections)?;
        }

        Ok(Self {
            endpoint: get_env_or_default("APPWRITE_ENDPOINT", DEFAULT_APPWRITE_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            project_id: get_required_env("APPWRITE_PROJECT_ID")?,
            api_key: get_optional_validated_secret("APPWRITE_API_KEY")?,
            database_id,
            collections,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let resend = match get_optional_validated_secret("RESEND_API_KEY")? {
            Some(api_key) => Some(ResendConfig {
                api_key,
                from: get_env_or_default("RESEND_FROM_EMAIL", DEFAULT_FROM_EMAIL),
                api_base: DEFAULT_RESEND_API_BASE.to_string(),
            }),
            None => None,
        };

        Ok(Self {
            resend,
            smtp: SmtpConfig::from_env()?,
        })
    }

    /// Whether any transport is available.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.resend.is_some() || self.smtp.is_some()
    }
}

impl SmtpConfig {
    /// SMTP counts as configured only when host, port, user and password are
    /// all present.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(host), Some(port), Some(username), Some(password)) = (
            get_optional_env("SMTP_HOST"),
            get_optional_env("SMTP_PORT"),
            get_optional_env("SMTP_USER"),
            get_optional_env("SMTP_PASS"),
        ) else {
            return Ok(None);
        };

        let port = port
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        let implicit_tls = match get_optional_env("SMTP_SECURE") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidEnvVar("SMTP_SECURE".to_string(), value))?,
            None => port == 465,
        };

        let from = get_optional_env("SMTP_FROM")
            .or_else(|| get_optional_env("RESEND_FROM_EMAIL"))
            .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string());

        Ok(Some(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
            implicit_tls,
            from,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Reject a database ID that is really one of the collection IDs.
fn validate_database_id(database_id: &str, collections: &CollectionIds) -> Result<(), ConfigError> {
    let looks_like_collection = database_id == collections.purchases
        || database_id == collections.items
        || database_id == "sh-purchases"
        || database_id == "sh-items";

    if looks_like_collection {
        return Err(ConfigError::InvalidEnvVar(
            "APPWRITE_DATABASE_ID".to_string(),
            format!(
                "looks like a collection ID ({database_id}). Set it to the Database ID from \
                 Appwrite Console → Databases → Settings."
            ),
        ));
    }
    Ok(())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the provider console."
            ),
        ));
    }

    Ok(())
}

/// Load and validate an optional secret from environment.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}
