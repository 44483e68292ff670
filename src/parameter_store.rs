use async_trait::async_trait;
use thiserror::Error;

/// Key-value secret lookup by path.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the value stored under `name`. `with_decryption` asks the store
    /// to decrypt `SecureString` values before returning them.
    async fn get_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<String, ParameterStoreError>;
}

#[derive(Debug, Error)]
pub enum ParameterStoreError {
    #[error("parameter `{0}` not found")]
    NotFound(String),
    #[error("parameter store returned {code}: {message}")]
    Service { code: String, message: String },
    /// The request never produced a service response: no credentials,
    /// connection refused, timeout and the like.
    #[error("request to parameter store failed: {0}")]
    Transport(String),
    #[error("parameter `{0}` has an empty value")]
    EmptyValue(String),
}
