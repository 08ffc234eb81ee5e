//! AWS adapters for the remote sources.
//!
//! Enable with `--features aws`.
//!
//! - [`SecretsManagerFetcher`]: reads a secret bundle from AWS Secrets Manager
//! - [`LambdaInvoker`]: invokes a Lambda function synchronously
//! - [`KmsDecryptor`]: decrypts a blob with AWS KMS
//!
//! Credentials come from the default provider chain (AWS_ACCESS_KEY_ID,
//! profiles, instance roles, ...). Clients use standard retries with a
//! bounded attempt count and a bounded per-attempt timeout.
//!
//! Each adapter classifies SDK failures into a [`ProviderErrorKind`] where
//! they happen, so sources never inspect error text.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_kms::config::Region;
use aws_sdk_lambda::types::{InvocationType, LogType};
use tracing::trace;

use super::invoke::{FunctionInvoker, InvokeOutput, KeyDecryptor};
use super::secret_store::SecretFetcher;
use crate::core::constants::{resolve_region, REMOTE_MAX_ATTEMPTS, REMOTE_TIMEOUT_MS, SECRET_VERSION_STAGE};
use crate::error::{ProviderError, ProviderErrorKind};

/// Load shared SDK configuration for `region`.
///
/// `None` falls back to `AWS_REGION`, then `REGION`, then `us-east-1`.
pub async fn load_config(region: Option<&str>) -> SdkConfig {
    let region = resolve_region(region);
    trace!(region = %region, "loading AWS config");

    let timeout = Duration::from_millis(REMOTE_TIMEOUT_MS);
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region))
        .retry_config(RetryConfig::standard().with_max_attempts(REMOTE_MAX_ATTEMPTS))
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(timeout)
                .operation_attempt_timeout(timeout)
                .build(),
        )
        .load()
        .await
}

/// Fetches secret bundles from AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct SecretsManagerFetcher {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerFetcher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }

    pub async fn connect(region: Option<&str>) -> Self {
        Self::new(&load_config(region).await)
    }
}

#[async_trait]
impl SecretFetcher for SecretsManagerFetcher {
    async fn fetch(&self, store_id: &str) -> Result<Option<String>, ProviderError> {
        trace!(store = %store_id, "requesting secret value");

        let result = self
            .client
            .get_secret_value()
            .secret_id(store_id)
            .version_stage(SECRET_VERSION_STAGE)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let message = aws_sdk_secretsmanager::error::DisplayErrorContext(&err).to_string();
                let unreachable = matches!(
                    err,
                    aws_sdk_secretsmanager::error::SdkError::DispatchFailure(_)
                        | aws_sdk_secretsmanager::error::SdkError::TimeoutError(_)
                );
                let kind = if unreachable {
                    ProviderErrorKind::Unreachable
                } else {
                    let service = err.into_service_error();
                    if service.is_decryption_failure() {
                        ProviderErrorKind::DecryptionFailure
                    } else if service.is_internal_service_error() {
                        ProviderErrorKind::InternalServiceError
                    } else if service.is_invalid_parameter_exception() {
                        ProviderErrorKind::InvalidParameter
                    } else if service.is_invalid_request_exception() {
                        ProviderErrorKind::InvalidRequest
                    } else if service.is_resource_not_found_exception() {
                        ProviderErrorKind::ResourceNotFound
                    } else {
                        ProviderErrorKind::Unknown
                    }
                };
                return Err(ProviderError::new(kind, store_id, message));
            }
        };

        if let Some(text) = output.secret_string() {
            trace!(store = %store_id, "secret found in SecretString");
            return Ok(Some(text.to_string()));
        }
        trace!(store = %store_id, "looking within SecretBinary");
        Ok(output
            .secret_binary()
            .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned()))
    }
}

/// Invokes Lambda functions with a request/response call.
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }

    pub async fn connect(region: Option<&str>) -> Self {
        Self::new(&load_config(region).await)
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function: &str, payload: Vec<u8>) -> Result<InvokeOutput, ProviderError> {
        trace!(function = %function, payload_len = payload.len(), "invoking lambda");

        let result = self
            .client
            .invoke()
            .function_name(function)
            .invocation_type(InvocationType::RequestResponse)
            .log_type(LogType::Tail)
            .payload(aws_sdk_lambda::primitives::Blob::new(payload))
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let message = aws_sdk_lambda::error::DisplayErrorContext(&err).to_string();
                let unreachable = matches!(
                    err,
                    aws_sdk_lambda::error::SdkError::DispatchFailure(_)
                        | aws_sdk_lambda::error::SdkError::TimeoutError(_)
                );
                let kind = if unreachable {
                    ProviderErrorKind::Unreachable
                } else {
                    let service = err.into_service_error();
                    if service.is_resource_not_found_exception() {
                        ProviderErrorKind::ResourceNotFound
                    } else if service.is_invalid_parameter_value_exception() {
                        ProviderErrorKind::InvalidParameter
                    } else if service.is_invalid_request_content_exception() {
                        ProviderErrorKind::InvalidRequest
                    } else if service.is_service_exception() {
                        ProviderErrorKind::InternalServiceError
                    } else {
                        ProviderErrorKind::Unknown
                    }
                };
                return Err(ProviderError::new(kind, function, message));
            }
        };

        if let Some(function_error) = output.function_error() {
            return Err(ProviderError::new(
                ProviderErrorKind::Unknown,
                function,
                format!("function raised {}", function_error),
            ));
        }

        trace!(status = output.status_code(), "lambda returned");
        Ok(InvokeOutput {
            status: output.status_code(),
            payload: output.payload().map(|blob| blob.as_ref().to_vec()),
        })
    }
}

/// Decrypts ciphertext with AWS KMS.
#[derive(Debug, Clone)]
pub struct KmsDecryptor {
    client: aws_sdk_kms::Client,
}

impl KmsDecryptor {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_kms::Client::new(config),
        }
    }

    pub async fn connect(region: Option<&str>) -> Self {
        Self::new(&load_config(region).await)
    }
}

#[async_trait]
impl KeyDecryptor for KmsDecryptor {
    async fn decrypt(&self, key_ref: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with AWS KMS");

        let result = self
            .client
            .decrypt()
            .key_id(key_ref)
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext))
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let message = aws_sdk_kms::error::DisplayErrorContext(&err).to_string();
                let unreachable = matches!(
                    err,
                    aws_sdk_kms::error::SdkError::DispatchFailure(_)
                        | aws_sdk_kms::error::SdkError::TimeoutError(_)
                );
                let kind = if unreachable {
                    ProviderErrorKind::Unreachable
                } else {
                    let service = err.into_service_error();
                    if service.is_invalid_ciphertext_exception() || service.is_incorrect_key_exception() {
                        ProviderErrorKind::DecryptionFailure
                    } else if service.is_kms_internal_exception()
                        || service.is_dependency_timeout_exception()
                        || service.is_key_unavailable_exception()
                    {
                        ProviderErrorKind::InternalServiceError
                    } else if service.is_not_found_exception() {
                        ProviderErrorKind::ResourceNotFound
                    } else if service.is_disabled_exception()
                        || service.is_invalid_key_usage_exception()
                        || service.is_invalid_grant_token_exception()
                    {
                        ProviderErrorKind::InvalidRequest
                    } else {
                        ProviderErrorKind::Unknown
                    }
                };
                return Err(ProviderError::new(kind, key_ref, message));
            }
        };

        let plaintext = output.plaintext().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::DecryptionFailure, key_ref, "no plaintext returned")
        })?;

        trace!(plaintext_len = plaintext.as_ref().len(), "decrypted with AWS KMS");
        Ok(plaintext.as_ref().to_vec())
    }
}
