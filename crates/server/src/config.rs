//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTLINE_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; only when `CARTLINE_STORAGE=postgres`)
//! - `CARTLINE_SESSION_SECRET` - Token signing secret (production only; min 32
//!   chars, high entropy)
//!
//! ## Optional
//! - `CARTLINE_ENVIRONMENT` - `development` or `production` (default: development)
//! - `CARTLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `CARTLINE_PORT` - Listen port (default: 8080)
//! - `CARTLINE_STORAGE` - `postgres` or `memory` (default: postgres)
//! - `CARTLINE_SESSION_TTL_HOURS` - Session token lifetime (default: 24, max: 8760)
//! - `CARTLINE_CORS_ORIGINS` - Comma-separated allowed origins, or `*` (default: *)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SESSION_TTL_HOURS: &str = "24";
const MAX_SESSION_TTL_HOURS: u32 = 24 * 365;

/// Signing secret used when none is configured outside production.
pub const DEVELOPMENT_SESSION_SECRET: &str = "cartline-development-only-signing-key";

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

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Which storage backend to run against.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres { database_url: SecretString },
    /// In-process maps seeded with the default catalog.
    Memory,
}

/// Origins allowed to make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub storage: StorageConfig,
    /// Session token signing secret
    pub session_secret: SecretString,
    /// Session token lifetime
    pub session_ttl: Duration,
    pub cors_origins: CorsOrigins,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let environment = match env.or_default("CARTLINE_ENVIRONMENT", "development").as_str() {
            "development" | "dev" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CARTLINE_ENVIRONMENT".to_string(),
                    format!("expected development or production, got '{other}'"),
                ));
            }
        };

        let host = env
            .or_default("CARTLINE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CARTLINE_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("CARTLINE_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CARTLINE_PORT".to_string(), e.to_string()))?;

        let storage = match env.or_default("CARTLINE_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres {
                database_url: env.database_url("CARTLINE_DATABASE_URL")?,
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CARTLINE_STORAGE".to_string(),
                    format!("expected postgres or memory, got '{other}'"),
                ));
            }
        };

        let session_secret = session_secret(&env, environment)?;
        let session_ttl = parse_ttl_hours(
            &env.or_default("CARTLINE_SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS),
        )?;
        let cors_origins = parse_cors_origins(&env.or_default("CARTLINE_CORS_ORIGINS", "*"))?;

        Ok(Self {
            environment,
            host,
            port,
            storage,
            session_secret,
            session_ttl,
            cors_origins,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the development signing secret is in use.
    #[must_use]
    pub fn uses_development_secret(&self) -> bool {
        self.session_secret.expose_secret() == DEVELOPMENT_SESSION_SECRET
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key)
            .map_or_else(|| default.to_string(), |v| v.trim().to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

/// Resolve the signing secret; production refuses weak or fallback secrets.
fn session_secret(env: &Env<'_>, environment: Environment) -> Result<SecretString, ConfigError> {
    const KEY: &str = "CARTLINE_SESSION_SECRET";

    match environment {
        Environment::Development => Ok(SecretString::from(
            env.optional(KEY)
                .unwrap_or_else(|| DEVELOPMENT_SESSION_SECRET.to_string()),
        )),
        Environment::Production => {
            let value = env.required(KEY)?;
            if value == DEVELOPMENT_SESSION_SECRET {
                return Err(ConfigError::InsecureSecret(
                    KEY.to_string(),
                    "the development secret cannot be used in production".to_string(),
                ));
            }
            let secret = SecretString::from(value);
            validate_session_secret(&secret, KEY)?;
            validate_secret_strength(secret.expose_secret(), KEY)?;
            Ok(secret)
        }
    }
}

fn parse_ttl_hours(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("CARTLINE_SESSION_TTL_HOURS".to_string(), reason)
    };

    let hours = value.parse::<u32>().map_err(|e| invalid(e.to_string()))?;
    if hours == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    if hours > MAX_SESSION_TTL_HOURS {
        return Err(invalid(format!("must be at most {MAX_SESSION_TTL_HOURS}")));
    }
    Ok(Duration::hours(i64::from(hours)))
}

fn parse_cors_origins(value: &str) -> Result<CorsOrigins, ConfigError> {
    if value == "*" {
        return Ok(CorsOrigins::Any);
    }

    let origins = value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o).map_err(|e| {
                ConfigError::InvalidEnvVar("CARTLINE_CORS_ORIGINS".to_string(), format!("{o}: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if origins.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "CARTLINE_CORS_ORIGINS".to_string(),
            "no origins listed".to_string(),
        ));
    }
    Ok(CorsOrigins::List(origins))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
