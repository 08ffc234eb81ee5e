//! Ordered registry of configuration sources.
//!
//! Registration order is resolution order: the first source registered is
//! consulted first, and a later source is only asked when every earlier
//! one had nothing. The list is fixed once the store is handed to
//! [`Configurations`](crate::core::configurations::Configurations).

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::source::{
    DefaultsSource, EnvironmentSource, InvokeDecryptSource, SecretFetcher, SecretStoreSource,
    Source,
};
use super::value::ConfigValue;

/// Builder-style list of [`Source`]s.
#[derive(Default, Clone)]
pub struct Store {
    sources: Vec<Arc<dyn Source>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source after every source already registered.
    pub fn with_custom(mut self, source: impl Source + 'static) -> Self {
        self.push(Arc::new(source));
        self
    }

    /// Append an already shared source.
    ///
    /// Useful when the caller keeps a handle to inspect the source later.
    pub fn with_shared(mut self, source: Arc<dyn Source>) -> Self {
        self.push(source);
        self
    }

    /// Append the process environment.
    pub fn with_environment(self) -> Self {
        self.with_custom(EnvironmentSource::new())
    }

    /// Append fixed values.
    pub fn with_defaults<I, K>(self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: AsRef<str>,
    {
        self.with_custom(DefaultsSource::new(values))
    }

    /// Append fixed values taken from a JSON object.
    pub fn with_defaults_json(self, values: Map<String, Value>) -> Self {
        self.with_custom(DefaultsSource::from_json(values))
    }

    /// Append a secret store served by `fetcher`.
    pub fn with_secret_fetcher<F>(self, store_id: impl Into<String>, fetcher: F) -> Self
    where
        F: SecretFetcher + 'static,
    {
        self.with_custom(SecretStoreSource::new(store_id, fetcher))
    }

    /// Append an invoke-and-decrypt source.
    pub fn with_invoke_decrypt(self, source: InvokeDecryptSource) -> Self {
        self.with_custom(source)
    }

    /// Append an AWS Secrets Manager secret.
    ///
    /// `region` falls back to `AWS_REGION`, then `REGION`, then `us-east-1`.
    #[cfg(feature = "aws")]
    pub async fn with_secret_store(self, store_id: impl Into<String>, region: Option<&str>) -> Self {
        let fetcher = super::source::aws::SecretsManagerFetcher::connect(region).await;
        self.with_secret_fetcher(store_id, fetcher)
    }

    /// Append secrets returned by a Lambda function and decrypted with KMS.
    #[cfg(feature = "aws")]
    pub async fn with_lambda_kms<I, K>(
        self,
        function: impl Into<String>,
        key_ref: impl Into<String>,
        store_id: impl Into<String>,
        keys: I,
        region: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        use super::source::aws::{load_config, KmsDecryptor, LambdaInvoker};

        let config = load_config(region).await;
        self.with_invoke_decrypt(InvokeDecryptSource::new(
            function,
            key_ref,
            store_id,
            keys,
            LambdaInvoker::new(&config),
            KmsDecryptor::new(&config),
        ))
    }

    fn push(&mut self, source: Arc<dyn Source>) {
        debug!(
            source = %source.name(),
            position = self.sources.len(),
            "source registered"
        );
        self.sources.push(source);
    }

    /// Sources in resolution order.
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    /// Source names in resolution order.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("sources", &self.names()).finish()
    }
}
