use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;
use std::{fs, path::Path};
use thiserror::Error;

use crate::bootstrap::StartupError;

/// Pool tuning for the database handle. The connection string and database
/// name are not configured here: they are resolved from the parameter store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_seconds() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}
impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(to_variant_name(self).map_err(|_| std::fmt::Error)?)
    }
}
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logger configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggerConfig {
    /// Enable log write to stdout
    pub enable: bool,

    /// Set the logger level.
    ///
    /// * options: `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default)]
    pub level: LogLevel,

    /// Set the logger format.
    ///
    /// * options: `compact` | `pretty` | `json`
    #[serde(default)]
    pub format: LogFormat,

    /// Override our custom tracing filter.
    ///
    /// Set this to your own filter if you want to see traces from internal
    /// libraries. See more [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
    pub override_filter: Option<String>,
}

/// Sentry configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentryConfig {
    pub dsn: String,
    pub traces_sample_rate: f32,
}

/// Server configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// The address on which the server should listen on for incoming
    /// connections.
    #[serde(default = "default_binding")]
    pub binding: String,
    /// The port on which the server should listen for incoming connections.
    pub port: i32,
    /// The webserver host
    pub host: String,
}

fn default_binding() -> String {
    "localhost".to_string()
}

impl ServerConfig {
    #[must_use]
    pub fn full_url(&self) -> String {
        format!("{}:{}", self.binding, self.port)
    }
}

/// Hosting environment. API documentation is only served in development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Token validation settings (`JwtSettings:*`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtSettings {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Allowed clock drift when checking `exp` and `nbf`.
    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u64,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            clock_skew_seconds: default_clock_skew_seconds(),
        }
    }
}

fn default_clock_skew_seconds() -> u64 {
    300
}

/// Parameter store paths of the startup secrets (`AWS:ParameterStore:*`)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ParameterStorePaths {
    pub jwt_secret_key_path: Option<String>,
    pub db_connection_string_path: Option<String>,
    pub db_name_path: Option<String>,
}

/// AWS access used to reach the parameter store
#[derive(Clone, Deserialize, Serialize)]
pub struct AwsConfig {
    /// Falls back to the SDK region chain (`AWS_REGION`, shared profile, IMDS).
    pub region: Option<String>,
    /// Overrides the regional SSM endpoint, e.g. for LocalStack.
    pub endpoint: Option<String>,
    /// Named profile from the shared config files
    pub profile: Option<String>,
    /// Static credentials. When absent, the SDK default credential chain is
    /// used (env vars, shared profile, SSO, ECS task role, instance profile).
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Total attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub parameter_store: ParameterStorePaths,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            profile: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            request_timeout_seconds: default_request_timeout_seconds(),
            max_attempts: default_max_attempts(),
            parameter_store: ParameterStorePaths::default(),
        }
    }
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("max_attempts", &self.max_attempts)
            .field("parameter_store", &self.parameter_store)
            .finish()
    }
}

/// Complete application settings that combines all configuration layers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default)]
    pub environment: Environment,
    pub logger: LoggerConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub jwt_settings: JwtSettings,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub sentry: Option<SentryConfig>,
}

impl AppSettings {
    pub fn new(config: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Self>(content)?)
    }
}

impl std::fmt::Display for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // secrets never live in the settings file, but credentials may
        let mut redacted = self.clone();
        redacted.aws.secret_access_key = None;
        redacted.aws.session_token = None;
        let content = toml::to_string(&redacted).unwrap_or_default();
        write!(f, "{content}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
}

pub const ISSUER_KEY: &str = "JwtSettings:Issuer";
pub const AUDIENCE_KEY: &str = "JwtSettings:Audience";
pub const JWT_SECRET_KEY_PATH_KEY: &str = "AWS:ParameterStore:JwtSecretKeyPath";
pub const DB_CONNECTION_STRING_PATH_KEY: &str = "AWS:ParameterStore:DbConnectionStringPath";
pub const DB_NAME_PATH_KEY: &str = "AWS:ParameterStore:DbNamePath";

/// The five settings startup cannot proceed without, all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSettings {
    pub issuer: String,
    pub audience: String,
    pub jwt_secret_key_path: String,
    pub db_connection_string_path: String,
    pub db_name_path: String,
}

impl RequiredSettings {
    /// Validates the required keys without touching the network. Every
    /// missing key is reported, not only the first one.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, StartupError> {
        let mut missing = Vec::new();
        let paths = &settings.aws.parameter_store;

        let issuer = require(&settings.jwt_settings.issuer, ISSUER_KEY, &mut missing);
        let audience = require(&settings.jwt_settings.audience, AUDIENCE_KEY, &mut missing);
        let jwt_secret_key_path = require(
            &paths.jwt_secret_key_path,
            JWT_SECRET_KEY_PATH_KEY,
            &mut missing,
        );
        let db_connection_string_path = require(
            &paths.db_connection_string_path,
            DB_CONNECTION_STRING_PATH_KEY,
            &mut missing,
        );
        let db_name_path = require(&paths.db_name_path, DB_NAME_PATH_KEY, &mut missing);

        match (
            issuer,
            audience,
            jwt_secret_key_path,
            db_connection_string_path,
            db_name_path,
        ) {
            (
                Some(issuer),
                Some(audience),
                Some(jwt_secret_key_path),
                Some(db_connection_string_path),
                Some(db_name_path),
            ) => Ok(Self {
                issuer,
                audience,
                jwt_secret_key_path,
                db_connection_string_path,
                db_name_path,
            }),
            _ => Err(StartupError::MissingConfiguration(missing)),
        }
    }
}

fn require(
    value: &Option<String>,
    key: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            missing.push(key);
            None
        }
    }
}
