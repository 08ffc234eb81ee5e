//! Resolution engine.
//!
//! [`Configurations`] resolves a name by asking each registered source in
//! turn and returns the first non-empty value. Lookups that find nothing
//! are counted; once the count passes the miss threshold every source is
//! refreshed and the lookup is retried once.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, error, trace};

use super::constants::DEFAULT_MISS_THRESHOLD;
use super::store::Store;
use super::value::ConfigValue;
use crate::error::{Error, Result};

/// Layered configuration lookups over a [`Store`].
///
/// # Example
///
/// ```
/// use configurations::{ConfigValue, Configurations, Store};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = Store::new()
///     .with_defaults([("aboolean", ConfigValue::from(true)), ("anumber", ConfigValue::from(1))])
///     .with_environment();
/// let config = Configurations::new(store);
///
/// assert!(config.as_boolean("aboolean").await.unwrap());
/// assert_eq!(config.as_string("anumber").await.unwrap().as_deref(), Some("1"));
/// # });
/// ```
#[derive(Debug)]
pub struct Configurations {
    store: Store,
    miss_threshold: usize,
    misses: AtomicUsize,
}

impl Configurations {
    pub fn new(store: Store) -> Self {
        debug!(sources = store.len(), "configurations created");
        Self {
            store,
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            misses: AtomicUsize::new(0),
        }
    }

    /// Number of unresolved lookups tolerated before a refresh.
    pub fn with_miss_threshold(mut self, threshold: usize) -> Self {
        self.miss_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn miss_threshold(&self) -> usize {
        self.miss_threshold
    }

    /// Unresolved lookups counted since the last refresh they triggered.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Acquire)
    }

    /// Resolve `name`, or `None` when no source defines it.
    ///
    /// A lookup that finds nothing counts as a miss. The lookup that pushes
    /// the count past the threshold resets it, refreshes every source and
    /// resolves once more before returning.
    ///
    /// # Errors
    ///
    /// Returns the error of any source that fails while resolving, or of
    /// the refresh a miss triggered.
    pub async fn get(&self, name: &str) -> Result<Option<ConfigValue>> {
        if let Some(value) = self.resolve(name).await? {
            return Ok(Some(value));
        }

        if !self.record_miss() {
            return Ok(None);
        }

        debug!(
            name,
            threshold = self.miss_threshold,
            "miss threshold exceeded, refreshing every source"
        );
        self.refresh().await?;
        self.resolve(name).await
    }

    /// Resolve `name`, falling back to `default`.
    ///
    /// A fallback is an expected outcome, so it is not counted as a miss.
    pub async fn get_or(&self, name: &str, default: impl Into<ConfigValue>) -> Result<ConfigValue> {
        match self.resolve(name).await? {
            Some(value) => Ok(value),
            None => {
                trace!(name, "using caller default");
                Ok(default.into())
            }
        }
    }

    /// Refresh every source concurrently.
    ///
    /// Every source is given the chance to finish. Failures are logged as
    /// they are collected and the first one in resolution order is
    /// returned.
    pub async fn refresh(&self) -> Result<()> {
        let sources = self.store.sources();
        debug!(sources = sources.len(), "refreshing sources");

        let results = join_all(sources.iter().map(|source| source.refresh())).await;

        let mut first = None;
        for (source, result) in sources.iter().zip(results) {
            if let Err(e) = result {
                error!(source = %source.name(), store = %e.store(), error = %e, "refresh failed");
                if first.is_none() {
                    first = Some(e);
                }
            }
        }

        match first {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Read `name` as a boolean. Absent values are `false`.
    pub async fn as_boolean(&self, name: &str) -> Result<bool> {
        Ok(self
            .get(name)
            .await?
            .map(|v| v.to_boolean())
            .unwrap_or(false))
    }

    /// Read `name` as a number. Absent or non-numeric values are NaN.
    pub async fn as_number(&self, name: &str) -> Result<f64> {
        Ok(self
            .get(name)
            .await?
            .map(|v| v.to_number())
            .unwrap_or(f64::NAN))
    }

    /// Read `name` rendered as text.
    pub async fn as_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name).await?.map(|v| v.to_string()))
    }

    /// Read `name` as a structured value.
    ///
    /// Objects are used as they are and strings are parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Coercion` when the text is not JSON or the value does
    /// not have the shape of `T`.
    pub async fn as_object<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let Some(value) = self.get(name).await? else {
            return Ok(None);
        };
        let coercion = |e: serde_json::Error| Error::Coercion {
            name: name.to_string(),
            reason: e.to_string(),
        };
        let json = value.to_object().map_err(coercion)?;
        serde_json::from_value(json).map(Some).map_err(coercion)
    }

    /// Ask each source in order; the first non-empty value wins.
    async fn resolve(&self, name: &str) -> Result<Option<ConfigValue>> {
        for source in self.store.sources() {
            match source.get(name).await? {
                Some(value) if !value.is_empty() => {
                    trace!(name, source = %source.name(), "resolved");
                    return Ok(Some(value));
                }
                _ => {}
            }
        }
        trace!(name, "not found in any source");
        Ok(None)
    }

    /// Count a miss. Returns `true` for the one caller whose miss crossed
    /// the threshold; the counter is reset in the same step.
    fn record_miss(&self) -> bool {
        let threshold = self.miss_threshold;
        let previous = self
            .misses
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                if count + 1 > threshold {
                    Some(0)
                } else {
                    Some(count + 1)
                }
            })
            .unwrap_or_else(|count| count);
        trace!(misses = previous + 1, threshold, "lookup missed");
        previous + 1 > threshold
    }
}
