use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig, timeout::TimeoutConfig};
use aws_sdk_ssm::{
    Client,
    config::Credentials,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_parameter::GetParameterError,
};
use std::time::Duration;
use tracing::debug;

use crate::{
    bootstrap::StartupError,
    config::AwsConfig,
    parameter_store::{ParameterStore, ParameterStoreError},
};

pub const REGION_KEY: &str = "AWS:Region";

/// Provider name attached to credentials taken from the `[aws]` section
const SETTINGS_CREDENTIALS: &str = "notification-service-settings";

/// Systems Manager Parameter Store client
#[derive(Debug, Clone)]
pub struct SsmClient {
    client: Client,
    region: String,
    endpoint: Option<String>,
}

impl SsmClient {
    pub fn new(client: Client, region: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            region,
            endpoint,
        }
    }

    /// Build a client from the `[aws]` settings.
    ///
    /// Anything not set explicitly comes from the SDK default chains, so an
    /// ECS task role or instance profile works without configuration.
    pub async fn from_settings(config: &AwsConfig) -> Result<Self, StartupError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.request_timeout_seconds))
                    .build(),
            );
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key_id), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret_key,
                config.session_token.clone(),
                None,
                SETTINGS_CREDENTIALS,
            ));
        }

        let sdk_config = loader.load().await;
        let Some(region) = sdk_config.region().map(ToString::to_string) else {
            return Err(StartupError::MissingConfiguration(vec![REGION_KEY]));
        };

        Ok(Self::new(
            Client::new(&sdk_config),
            region,
            config.endpoint.clone(),
        ))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint override, if any. `None` means the regional AWS endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl ParameterStore for SsmClient {
    async fn get_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<String, ParameterStoreError> {
        debug!(parameter = name, region = %self.region, "fetching parameter");
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|err| classify_error(name, err))?;

        match output.parameter().and_then(|p| p.value()) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ParameterStoreError::EmptyValue(name.to_string())),
        }
    }
}

fn classify_error<R>(name: &str, err: SdkError<GetParameterError, R>) -> ParameterStoreError
where
    R: std::fmt::Debug + 'static,
{
    match err {
        SdkError::ServiceError(context) => {
            let err = context.into_err();
            if err.is_parameter_not_found() {
                return ParameterStoreError::NotFound(name.to_string());
            }
            ParameterStoreError::Service {
                code: err.code().unwrap_or("Unknown").to_string(),
                message: err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
            }
        }
        other => ParameterStoreError::Transport(DisplayErrorContext(&other).to_string()),
    }
}
