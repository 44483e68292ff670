//! Startup wiring: validate required settings, resolve secrets from the
//! parameter store and build the services the HTTP layer depends on.
//!
//! Every failure here is fatal. Nothing is retried and no partially built
//! [`Services`] value is ever returned.

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    auth::JwtAuthenticator,
    config::{AppSettings, DatabaseConfig, RequiredSettings},
    database::{Database, DatabaseSettings},
    parameter_store::{ParameterStore, ParameterStoreError},
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Missing configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),
    #[error("Failed to fetch secret `{path}`: {source}")]
    SecretFetchFailure {
        path: String,
        #[source]
        source: ParameterStoreError,
    },
    #[error("Invalid database settings: {0}")]
    InvalidDatabaseSettings(#[source] sqlx::Error),
}

/// Services resolved at startup, handed to the application state.
#[derive(Debug, Clone)]
pub struct Services {
    pub authenticator: Arc<JwtAuthenticator>,
    pub database: Database,
}

/// Validate the settings, then resolve every secret from `store`.
pub async fn bootstrap<S>(settings: &AppSettings, store: &S) -> Result<Services, StartupError>
where
    S: ParameterStore + ?Sized,
{
    let required = RequiredSettings::from_settings(settings)?;
    wire_services(settings, &required, store).await
}

/// Resolve secrets for already validated settings. Lookups run in order and
/// the first failure is returned.
pub async fn wire_services<S>(
    settings: &AppSettings,
    required: &RequiredSettings,
    store: &S,
) -> Result<Services, StartupError>
where
    S: ParameterStore + ?Sized,
{
    let authenticator = configure_jwt_authentication(
        store,
        required,
        settings.jwt_settings.clock_skew_seconds,
    )
    .await?;
    let database = configure_database(store, required, &settings.database).await?;

    info!(
        issuer = authenticator.issuer(),
        audience = authenticator.audience(),
        database = database.settings().database_name(),
        "startup services configured"
    );
    Ok(Services {
        authenticator: Arc::new(authenticator),
        database,
    })
}

async fn fetch_secret<S>(store: &S, path: &str) -> Result<String, StartupError>
where
    S: ParameterStore + ?Sized,
{
    info!(path, "resolving secret from parameter store");
    store
        .get_parameter(path, true)
        .await
        .map_err(|source| StartupError::SecretFetchFailure {
            path: path.to_string(),
            source,
        })
}

async fn configure_jwt_authentication<S>(
    store: &S,
    required: &RequiredSettings,
    clock_skew_secs: u64,
) -> Result<JwtAuthenticator, StartupError>
where
    S: ParameterStore + ?Sized,
{
    let secret_key = fetch_secret(store, &required.jwt_secret_key_path)
        .await
        .inspect_err(|e| error!(error = %e, "error retrieving JWT secret key"))?;

    Ok(JwtAuthenticator::new(
        required.issuer.clone(),
        required.audience.clone(),
        &secret_key,
        clock_skew_secs,
    ))
}

async fn configure_database<S>(
    store: &S,
    required: &RequiredSettings,
    config: &DatabaseConfig,
) -> Result<Database, StartupError>
where
    S: ParameterStore + ?Sized,
{
    let result = async {
        let connection_string = fetch_secret(store, &required.db_connection_string_path).await?;
        let database_name = fetch_secret(store, &required.db_name_path).await?;
        Database::connect_lazy(
            DatabaseSettings::new(connection_string, database_name),
            config,
        )
        .map_err(StartupError::InvalidDatabaseSettings)
    }
    .await;

    result.inspect_err(|e| error!(error = %e, "error retrieving database settings"))
}
