//! Invoke-and-decrypt source.
//!
//! Secrets are obtained in two steps: a remote function returns an
//! encrypted blob for a declared set of keys, then a key-management call
//! decrypts it into a JSON object. Only one load runs at a time; callers
//! arriving while a load is in flight wait on that same load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use base64::Engine;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, trace, warn};
use zeroize::Zeroize;

use super::Source;
use crate::core::cache::SecureCache;
use crate::core::value::ConfigValue;
use crate::error::{ProviderError, SourceError, SourceResult};

/// Payload sent to the secrets function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub key_management_ref: String,
    pub store_id: String,
    pub keys: Vec<String>,
}

/// Raw result of a function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutput {
    pub status: i32,
    pub payload: Option<Vec<u8>>,
}

#[derive(Deserialize)]
struct InvokeResponse {
    blob: String,
    encoding: String,
}

/// Invokes a remote function synchronously and returns its output.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, function: &str, payload: Vec<u8>) -> Result<InvokeOutput, ProviderError>;
}

/// Decrypts ciphertext with a key-management service.
#[async_trait]
pub trait KeyDecryptor: Send + Sync {
    async fn decrypt(&self, key_ref: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
impl<T: FunctionInvoker + ?Sized> FunctionInvoker for Arc<T> {
    async fn invoke(&self, function: &str, payload: Vec<u8>) -> Result<InvokeOutput, ProviderError> {
        (**self).invoke(function, payload).await
    }
}

#[async_trait]
impl<T: KeyDecryptor + ?Sized> KeyDecryptor for Arc<T> {
    async fn decrypt(&self, key_ref: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        (**self).decrypt(key_ref, ciphertext).await
    }
}

type LoadHandle = Shared<BoxFuture<'static, SourceResult<()>>>;

struct Loader {
    function: String,
    request: InvokeRequest,
    invoker: Box<dyn FunctionInvoker>,
    decryptor: Box<dyn KeyDecryptor>,
    cache: SecureCache,
    initialized: AtomicBool,
}

impl Loader {
    fn store(&self) -> &str {
        &self.request.store_id
    }

    fn invalid(&self, reason: impl Into<String>) -> SourceError {
        let err = SourceError::InvalidPayload {
            store: self.store().to_string(),
            reason: reason.into(),
        };
        error!(store = %self.store(), error = %err, "failed to load secrets");
        err
    }

    fn provider(&self, err: ProviderError) -> SourceError {
        let err = err.with_store(self.store());
        error!(store = %self.store(), kind = %err.kind, error = %err, "failed to load secrets");
        err.into()
    }

    async fn load(&self) -> SourceResult<()> {
        debug!(
            store = %self.store(),
            function = %self.function,
            keys = self.request.keys.len(),
            "invoking secrets function"
        );

        let request = serde_json::to_vec(&self.request)
            .map_err(|e| self.invalid(format!("failed to encode request: {}", e)))?;
        let output = self
            .invoker
            .invoke(&self.function, request)
            .await
            .map_err(|e| self.provider(e))?;

        if output.status != 200 {
            return Err(self.invalid(format!("function returned status {}", output.status)));
        }
        let body = output
            .payload
            .filter(|p| !p.is_empty())
            .ok_or_else(|| self.invalid("function returned no payload"))?;

        let response: InvokeResponse = serde_json::from_slice(&body)
            .map_err(|e| self.invalid(format!("unreadable function response: {}", e)))?;
        let ciphertext = decode_blob(&response.blob, &response.encoding).ok_or_else(|| {
            self.invalid(format!("cannot decode blob with encoding {}", response.encoding))
        })?;

        let mut plaintext = self
            .decryptor
            .decrypt(&self.request.key_management_ref, ciphertext)
            .await
            .map_err(|e| self.provider(e))?;
        let parsed = serde_json::from_slice::<Map<String, Value>>(&plaintext);
        plaintext.zeroize();
        let secrets = parsed
            .map_err(|e| self.invalid(format!("decrypted secrets are not a JSON object: {}", e)))?;

        let mut stored = 0;
        for (name, value) in secrets {
            if !self.request.keys.contains(&name) {
                trace!(store = %self.store(), "skipping undeclared key");
                continue;
            }
            self.cache.set(&name, ConfigValue::from_json(value));
            stored += 1;
        }

        self.initialized.store(true, Ordering::Release);
        debug!(store = %self.store(), values = stored, "secrets loaded");
        Ok(())
    }
}

fn decode_blob(blob: &str, encoding: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

    match encoding.to_ascii_lowercase().as_str() {
        "base64" => STANDARD.decode(blob.trim()).ok(),
        "base64url" => URL_SAFE
            .decode(blob.trim())
            .or_else(|_| URL_SAFE_NO_PAD.decode(blob.trim()))
            .ok(),
        "utf8" | "utf-8" | "ascii" => Some(blob.as_bytes().to_vec()),
        _ => None,
    }
}

/// Secrets for a fixed, declared key set, loaded through a function
/// invocation followed by a decrypt call.
pub struct InvokeDecryptSource {
    name: String,
    loader: Arc<Loader>,
    loading: Mutex<Option<LoadHandle>>,
}

impl InvokeDecryptSource {
    /// Create a source that will only ever serve `keys`.
    ///
    /// # Arguments
    ///
    /// * `function` - Identifier of the function returning the encrypted blob
    /// * `key_ref` - Key-management reference used to decrypt the blob
    /// * `store_id` - Secret collections the function should consult
    /// * `keys` - Every key that will be requested from this source
    pub fn new<I, K>(
        function: impl Into<String>,
        key_ref: impl Into<String>,
        store_id: impl Into<String>,
        keys: I,
        invoker: impl FunctionInvoker + 'static,
        decryptor: impl KeyDecryptor + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let request = InvokeRequest {
            key_management_ref: key_ref.into(),
            store_id: store_id.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        };
        debug!(store = %request.store_id, keys = request.keys.len(), "invoke-decrypt source created");
        Self {
            name: format!("invoke-decrypt:{}", request.store_id),
            loader: Arc::new(Loader {
                function: function.into(),
                request,
                invoker: Box::new(invoker),
                decryptor: Box::new(decryptor),
                cache: SecureCache::new(),
                initialized: AtomicBool::new(false),
            }),
            loading: Mutex::new(None),
        }
    }

    pub fn store_id(&self) -> &str {
        self.loader.store()
    }

    pub fn keys(&self) -> &[String] {
        &self.loader.request.keys
    }

    /// Whether a load has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.loader.initialized.load(Ordering::Acquire)
    }

    /// Join the load in flight, or start one.
    fn join_or_start(&self) -> LoadHandle {
        let mut slot = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            // A finished handle whose waiters went away is never reused
            if handle.peek().is_none() {
                debug!(store = %self.store_id(), "joining load in progress");
                return handle.clone();
            }
        }

        let loader = Arc::clone(&self.loader);
        let handle = async move { loader.load().await }.boxed().shared();
        *slot = Some(handle.clone());
        handle
    }

    fn finish(&self, handle: &LoadHandle) {
        let mut slot = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(handle)) {
            *slot = None;
        }
    }
}

#[async_trait]
impl Source for InvokeDecryptSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
        if !self.keys().iter().any(|k| k == name) {
            warn!(store = %self.store_id(), name, "requested a key this source does not load");
            return Ok(None);
        }
        if !self.is_initialized() {
            self.refresh().await?;
        }
        trace!(store = %self.store_id(), name, "invoke-decrypt lookup");
        Ok(self.loader.cache.get(name))
    }

    async fn refresh(&self) -> SourceResult<()> {
        debug!(store = %self.store_id(), "refresh requested");
        let handle = self.join_or_start();
        let result = handle.clone().await;
        self.finish(&handle);
        result
    }
}

impl std::fmt::Debug for InvokeDecryptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeDecryptSource")
            .field("function", &self.loader.function)
            .field("store_id", &self.store_id())
            .field("keys", &self.keys().len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
