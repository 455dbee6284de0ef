//! Environment-driven server configuration.
//!
//! Every key is read through [`mockable::Env`] so parsing is unit-tested
//! without touching the process environment. Debug builds fall back to
//! in-memory adapters and an ephemeral signing secret; release builds
//! require both a database and a secret.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use mockable::{DefaultEnv, Env};
use pantry_backend::inbound::http::auth::AuthConfig;
use pantry_backend::outbound::llm::{
    ANTHROPIC, ANTHROPIC_DEFAULT_BASE_URL, ANTHROPIC_DEFAULT_MODEL, DEFAULT_RETRIES,
    DEFAULT_TIMEOUT, GEMINI, GEMINI_DEFAULT_BASE_URL, GEMINI_DEFAULT_MODEL, OPENAI,
    OPENAI_DEFAULT_BASE_URL, OPENAI_DEFAULT_MODEL, ProviderConfig,
};
use reqwest::Url;
use tracing::warn;
use uuid::Uuid;

const DATABASE_URL_ENV: &str = "DATABASE_URL";
const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";
const PORT_ENV: &str = "PORT";
const JWT_SECRET_ENV: &str = "JWT_SECRET";
const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION";
const LLM_PROVIDER_ENV: &str = "LLM_PROVIDER";
const LLM_TIMEOUT_ENV: &str = "LLM_TIMEOUT_SECS";
const LLM_RETRY_ENV: &str = "LLM_RETRY_ATTEMPTS";
const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;
const POSITIVE_INTEGER: &str = "a positive integer";
const PORT_EXPECTED: &str = "a port number between 1 and 65535";
const URL_EXPECTED: &str = "an absolute http(s) URL";

/// Build mode for configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate missing infrastructure and warn.
    Debug,
    /// Release builds require a database and a signing secret.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Errors raised while validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// PostgreSQL connection settings.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// One vendor whose API key is configured.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub name: &'static str,
    pub config: ProviderConfig,
}

/// Fully validated application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database: Option<DatabaseSettings>,
    pub auth: AuthConfig,
    /// Configured vendors in registration order.
    pub providers: Vec<ProviderSettings>,
    /// Explicit default provider; the first registered one otherwise.
    pub active_provider: Option<String>,
    pub cors_origin: Option<String>,
}

struct VendorKeys {
    name: &'static str,
    api_key: &'static str,
    model: &'static str,
    base_url: &'static str,
    default_model: &'static str,
    default_base_url: &'static str,
}

const VENDORS: [VendorKeys; 3] = [
    VendorKeys {
        name: OPENAI,
        api_key: "OPENAI_API_KEY",
        model: "OPENAI_MODEL",
        base_url: "OPENAI_BASE_URL",
        default_model: OPENAI_DEFAULT_MODEL,
        default_base_url: OPENAI_DEFAULT_BASE_URL,
    },
    VendorKeys {
        name: GEMINI,
        api_key: "GEMINI_API_KEY",
        model: "GEMINI_MODEL",
        base_url: "GEMINI_BASE_URL",
        default_model: GEMINI_DEFAULT_MODEL,
        default_base_url: GEMINI_DEFAULT_BASE_URL,
    },
    VendorKeys {
        name: ANTHROPIC,
        api_key: "ANTHROPIC_API_KEY",
        model: "ANTHROPIC_MODEL",
        base_url: "ANTHROPIC_BASE_URL",
        default_model: ANTHROPIC_DEFAULT_MODEL,
        default_base_url: ANTHROPIC_DEFAULT_BASE_URL,
    },
];

impl AppConfig {
    /// Build the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_process_env(mode: BuildMode) -> Result<Self, ConfigError> {
        Self::from_env(&DefaultEnv::new(), mode)
    }

    /// Build the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required key is missing for the build
    /// mode or any present key fails to parse.
    pub fn from_env<E: Env>(env: &E, mode: BuildMode) -> Result<Self, ConfigError> {
        let port = parse_or(env, PORT_ENV, DEFAULT_PORT, PORT_EXPECTED)?;
        if port == 0 {
            return Err(ConfigError::InvalidEnv {
                name: PORT_ENV,
                value: port.to_string(),
                expected: PORT_EXPECTED,
            });
        }

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            database: database_from_env(env, mode)?,
            auth: auth_from_env(env, mode)?,
            providers: providers_from_env(env)?,
            active_provider: non_blank(env, LLM_PROVIDER_ENV),
            cors_origin: non_blank(env, CORS_ORIGIN_ENV),
        })
    }
}

fn non_blank<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_or<E, T>(
    env: &E,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    E: Env,
    T: FromStr,
{
    match non_blank(env, name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
            name,
            value,
            expected,
        }),
    }
}

fn positive<E: Env>(env: &E, name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = parse_or(env, name, default, POSITIVE_INTEGER)?;
    if value == 0 {
        return Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
            expected: POSITIVE_INTEGER,
        });
    }
    Ok(value)
}

fn database_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<Option<DatabaseSettings>, ConfigError> {
    let Some(url) = non_blank(env, DATABASE_URL_ENV) else {
        if mode.is_debug() {
            warn!("DATABASE_URL not set; using in-memory adapters (dev only)");
            return Ok(None);
        }
        return Err(ConfigError::MissingEnv {
            name: DATABASE_URL_ENV,
        });
    };
    let max_connections = positive(
        env,
        DATABASE_MAX_CONNECTIONS_ENV,
        u64::from(DEFAULT_MAX_CONNECTIONS),
    )?;
    let max_connections =
        u32::try_from(max_connections).map_err(|_| ConfigError::InvalidEnv {
            name: DATABASE_MAX_CONNECTIONS_ENV,
            value: max_connections.to_string(),
            expected: POSITIVE_INTEGER,
        })?;
    Ok(Some(DatabaseSettings {
        url,
        max_connections,
    }))
}

fn auth_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<AuthConfig, ConfigError> {
    let secret = match non_blank(env, JWT_SECRET_ENV) {
        Some(secret) => secret,
        None if mode.is_debug() => {
            warn!("JWT_SECRET not set; using an ephemeral secret (dev only)");
            format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
        }
        None => {
            return Err(ConfigError::MissingEnv {
                name: JWT_SECRET_ENV,
            });
        }
    };
    let hours = positive(env, JWT_EXPIRATION_ENV, DEFAULT_JWT_EXPIRATION_HOURS)?;
    Ok(AuthConfig::new(secret)
        .with_issuer(non_blank(env, JWT_ISSUER_ENV))
        .with_audience(non_blank(env, JWT_AUDIENCE_ENV))
        .with_expiration(Duration::from_secs(hours.saturating_mul(3600))))
}

fn providers_from_env<E: Env>(env: &E) -> Result<Vec<ProviderSettings>, ConfigError> {
    let timeout = positive(env, LLM_TIMEOUT_ENV, DEFAULT_TIMEOUT.as_secs())?;
    let retries = parse_or(env, LLM_RETRY_ENV, DEFAULT_RETRIES, "a non-negative integer")?;

    let mut providers = Vec::new();
    for vendor in &VENDORS {
        let Some(api_key) = non_blank(env, vendor.api_key) else {
            continue;
        };
        let model = non_blank(env, vendor.model).unwrap_or_else(|| vendor.default_model.to_owned());
        let raw_url =
            non_blank(env, vendor.base_url).unwrap_or_else(|| vendor.default_base_url.to_owned());
        let base_url = parse_base_url(vendor.base_url, raw_url)?;
        let config = ProviderConfig::new(api_key, model, base_url)
            .with_timeout(Duration::from_secs(timeout))
            .with_retries(retries);
        providers.push(ProviderSettings {
            name: vendor.name,
            config,
        });
    }
    if providers.is_empty() {
        warn!("no language model API key configured; metered endpoints will fail");
    }
    Ok(providers)
}

fn parse_base_url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value,
            expected: URL_EXPECTED,
        }),
    }
}
