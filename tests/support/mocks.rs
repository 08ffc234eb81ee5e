//! Mock providers and sources with call counters.
//!
//! Every mock is cheap to clone; clones share state so a test can keep a
//! handle after moving one into a source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use configurations::core::source::{InvokeOutput, InvokeRequest};
use configurations::{
    ConfigValue, FunctionInvoker, KeyDecryptor, ProviderError, ProviderErrorKind, SecretFetcher,
    Source, SourceError, SourceResult,
};

/// Secret fetcher returning a configurable bundle.
#[derive(Clone)]
pub struct MockFetcher {
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<Result<Option<String>, ProviderError>>>,
}

impl MockFetcher {
    pub fn new(bundle: serde_json::Value) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new(Ok(Some(bundle.to_string())))),
        }
    }

    /// A fetcher whose store exists but holds nothing.
    pub fn empty() -> Self {
        let fetcher = Self::new(serde_json::Value::Null);
        fetcher.respond(Ok(None));
        fetcher
    }

    pub fn respond(&self, response: Result<Option<String>, ProviderError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn set_bundle(&self, bundle: serde_json::Value) {
        self.respond(Ok(Some(bundle.to_string())));
    }

    pub fn fail_with(&self, kind: ProviderErrorKind) {
        self.respond(Err(ProviderError::new(kind, "mock", "mock failure")));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretFetcher for MockFetcher {
    async fn fetch(&self, _store_id: &str) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().unwrap().clone()
    }
}

/// Function invoker answering with a base64 blob of `secrets`.
///
/// The blob is the plaintext itself, so it pairs with [`MockDecryptor`].
#[derive(Clone)]
pub struct MockInvoker {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    requests: Arc<Mutex<Vec<InvokeRequest>>>,
    response: Arc<Mutex<Result<InvokeOutput, ProviderError>>>,
}

impl MockInvoker {
    pub fn new(secrets: serde_json::Value) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Arc::new(Mutex::new(Ok(blob_output(&secrets)))),
        }
    }

    /// Hold every invocation for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn respond(&self, response: Result<InvokeOutput, ProviderError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn set_secrets(&self, secrets: serde_json::Value) {
        self.respond(Ok(blob_output(&secrets)));
    }

    pub fn fail_with(&self, kind: ProviderErrorKind) {
        self.respond(Err(ProviderError::new(kind, "mock-function", "mock failure")));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, decoded.
    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// A successful invocation carrying `secrets` as a base64 blob.
pub fn blob_output(secrets: &serde_json::Value) -> InvokeOutput {
    let blob = base64::engine::general_purpose::STANDARD.encode(secrets.to_string());
    let body = serde_json::json!({ "blob": blob, "encoding": "base64" });
    InvokeOutput {
        status: 200,
        payload: Some(body.to_string().into_bytes()),
    }
}

#[async_trait]
impl FunctionInvoker for MockInvoker {
    async fn invoke(&self, _function: &str, payload: Vec<u8>) -> Result<InvokeOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request: InvokeRequest =
            serde_json::from_slice(&payload).expect("request should be valid JSON");
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}

/// Decryptor that returns the ciphertext unchanged.
#[derive(Clone, Default)]
pub struct MockDecryptor {
    calls: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<ProviderErrorKind>>>,
}

impl MockDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, kind: ProviderErrorKind) {
        *self.failure.lock().unwrap() = Some(kind);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyDecryptor for MockDecryptor {
    async fn decrypt(&self, key_ref: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.failure.lock().unwrap() {
            Some(kind) => Err(ProviderError::new(kind, key_ref, "mock failure")),
            None => Ok(ciphertext),
        }
    }
}

/// In-memory source counting lookups and refreshes.
///
/// Values queued with [`CountingSource::stage`] only become visible after
/// the next refresh, which mimics a stale remote cache.
#[derive(Clone)]
pub struct CountingSource {
    name: String,
    values: Arc<Mutex<HashMap<String, ConfigValue>>>,
    staged: Arc<Mutex<HashMap<String, ConfigValue>>>,
    refresh_error: Arc<Mutex<Option<SourceError>>>,
    gets: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Arc::default(),
            staged: Arc::default(),
            refresh_error: Arc::default(),
            gets: Arc::default(),
            refreshes: Arc::default(),
        }
    }

    pub fn with_value(self, name: &str, value: impl Into<ConfigValue>) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.into());
        self
    }

    /// Make `value` visible after the next refresh.
    pub fn stage(&self, name: &str, value: impl Into<ConfigValue>) {
        self.staged
            .lock()
            .unwrap()
            .insert(name.to_string(), value.into());
    }

    /// Make every later refresh fail with `err`.
    pub fn fail_refresh(&self, err: SourceError) {
        *self.refresh_error.lock().unwrap() = Some(err);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for CountingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().unwrap().get(name).cloned())
    }

    async fn refresh(&self) -> SourceResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.refresh_error.lock().unwrap().clone() {
            return Err(err);
        }
        let staged: Vec<_> = self.staged.lock().unwrap().drain().collect();
        self.values.lock().unwrap().extend(staged);
        Ok(())
    }
}
