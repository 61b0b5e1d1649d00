use sqlx::postgres::PgConnectOptions;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// URL for accessing the PostgreSQL database. Takes precedence over the discrete DB_* variables.
pub const DB_URL: &str = "DATABASE_URL";
/// Database host, used when [DB_URL] is not set
pub const DB_HOST: &str = "DB_HOST";
/// Database port, defaults to 5432
pub const DB_PORT: &str = "DB_PORT";
/// Name of the database holding the tasks table
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
/// Upper bound on pooled database connections
pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
/// Secret that callers must send as a bearer token to create, update or delete tasks
pub const API_KEY: &str = "API_KEY";
/// Socket address the HTTP server binds to
pub const LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
/// Log level configuration for the application. For formatting info, see [tracing_subscriber's documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Problems found while reading configuration from the environment
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the {0} environment variable must be set")]
    Missing(&'static str),
    #[error("the {variable} environment variable has an invalid value \"{value}\": {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: String,
    },
    #[error("the API_KEY environment variable must not be empty")]
    EmptyApiKey,
}

/// Collector endpoints for OpenTelemetry export
pub struct OtelEndpoints {
    pub span_export_url: String,
    pub metric_export_url: String,
}

/// Everything the service needs from its environment, read once at startup
pub struct AppConfig {
    pub db_options: PgConnectOptions,
    pub db_max_connections: u32,
    pub api_key: String,
    pub listen_address: SocketAddr,
    pub log_level: String,
    pub otel: Option<OtelEndpoints>,
}

impl AppConfig {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through [lookup], which returns the value of a variable if it is set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
        let api_key = lookup(API_KEY)
            .ok_or(ConfigError::Missing(API_KEY))?
            .trim()
            .to_owned();
        if api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        // Blank values count as unset from here on
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let db_options = match lookup(DB_URL) {
            Some(url) => PgConnectOptions::from_str(&url).map_err(|err| ConfigError::Invalid {
                variable: DB_URL,
                value: url.clone(),
                reason: err.to_string(),
            })?,
            None => discrete_db_options(&lookup)?,
        };

        let db_max_connections = match lookup(DB_MAX_CONNECTIONS) {
            Some(raw) => parse_var(DB_MAX_CONNECTIONS, &raw)
                .and_then(|max: u32| positive(DB_MAX_CONNECTIONS, &raw, max))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let listen_address = parse_var(
            LISTEN_ADDRESS,
            &lookup(LISTEN_ADDRESS).unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_owned()),
        )?;

        let otel = match (lookup(OTEL_SPAN_EXPORT_URL), lookup(OTEL_METRIC_EXPORT_URL)) {
            (Some(span_export_url), Some(metric_export_url)) => Some(OtelEndpoints {
                span_export_url,
                metric_export_url,
            }),
            _ => None,
        };

        Ok(AppConfig {
            db_options,
            db_max_connections,
            api_key,
            listen_address,
            log_level: lookup(LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
            otel,
        })
    }
}

fn discrete_db_options(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<PgConnectOptions, ConfigError> {
    let host = lookup(DB_HOST).ok_or(ConfigError::Missing(DB_HOST))?;
    let database = lookup(DB_NAME).ok_or(ConfigError::Missing(DB_NAME))?;
    let username = lookup(DB_USER).ok_or(ConfigError::Missing(DB_USER))?;
    let port = match lookup(DB_PORT) {
        Some(raw) => parse_var(DB_PORT, &raw)?,
        None => DEFAULT_DB_PORT,
    };

    let mut options = PgConnectOptions::new_without_pgpass()
        .host(&host)
        .port(port)
        .database(&database)
        .username(&username);
    if let Some(password) = lookup(DB_PASS) {
        options = options.password(&password);
    }

    Ok(options)
}

fn parse_var<T>(variable: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
        variable,
        value: raw.to_owned(),
        reason: err.to_string(),
    })
}

fn positive(variable: &'static str, raw: &str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            variable,
            value: raw.to_owned(),
            reason: "must be at least 1".to_owned(),
        });
    }

    Ok(value)
}
