//! Remote secret store source.
//!
//! Loads a JSON bundle of values on first use and serves every later
//! lookup from its encrypted cache until refreshed.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, trace, warn};
use zeroize::Zeroize;

use super::Source;
use crate::core::cache::SecureCache;
use crate::core::constants::LOADED_SENTINEL_PREFIX;
use crate::core::value::ConfigValue;
use crate::error::{ProviderError, SourceError, SourceResult};

/// Extended ISO-8601: calendar or week dates, optional time, optional zone.
const DATE_PATTERN: &str = r"^(\d{4})(?:-?W(\d+)(?:-?(\d+)D?)?|(?:-(\d+))?-(\d+))(?:[T ](\d+):(\d+)(?::(\d+)(?:\.(\d+))?)?)?(?:Z(-?\d*)|[+-]\d{2}:?\d{2})?$";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DATE_PATTERN).expect("date pattern is valid"))
}

/// Whether `text` looks like an extended ISO-8601 date.
pub fn is_date_like(text: &str) -> bool {
    date_pattern().is_match(text)
}

/// Interpret a date-like string. Zone-less times are read as UTC.
///
/// Returns `None` for text that does not look like a date or that names an
/// impossible one.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if !is_date_like(text) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = text.replacen(' ', "T", 1);
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = normalized.trim_end_matches('Z');
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    parse_calendar_date(naive)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d") {
        return Some(date);
    }
    // Week dates default to Monday
    let week = if text.contains('W') && text.matches('-').count() == 1 {
        format!("{}-1", text)
    } else {
        text.to_string()
    };
    NaiveDate::parse_from_str(&week, "%G-W%V-%u").ok()
}

/// Fetches the raw secret bundle for a store.
///
/// Adapters classify provider failures into a
/// [`ProviderErrorKind`](crate::error::ProviderErrorKind) at the point of
/// failure. `Ok(None)` means the store exists but holds no payload.
#[async_trait]
pub trait SecretFetcher: Send + Sync {
    async fn fetch(&self, store_id: &str) -> Result<Option<String>, ProviderError>;
}

#[async_trait]
impl<T: SecretFetcher + ?Sized> SecretFetcher for Arc<T> {
    async fn fetch(&self, store_id: &str) -> Result<Option<String>, ProviderError> {
        (**self).fetch(store_id).await
    }
}

/// Values from a remote secret store, loaded lazily.
pub struct SecretStoreSource<F> {
    store_id: String,
    name: String,
    sentinel: String,
    fetcher: F,
    cache: SecureCache,
}

impl<F: SecretFetcher> SecretStoreSource<F> {
    pub fn new(store_id: impl Into<String>, fetcher: F) -> Self {
        let store_id = store_id.into();
        debug!(store = %store_id, "secret store source created");
        Self {
            name: format!("secret-store:{}", store_id),
            sentinel: format!("{}{}", LOADED_SENTINEL_PREFIX, store_id),
            store_id,
            fetcher,
            cache: SecureCache::new(),
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Fetch and cache the bundle.
    ///
    /// Returns `Ok(false)` when a transient failure was swallowed and
    /// nothing was stored.
    async fn load(&self) -> SourceResult<bool> {
        debug!(store = %self.store_id, "loading secrets");

        let fetched = match self
            .fetcher
            .fetch(&self.store_id)
            .await
            .map_err(|e| e.with_store(&self.store_id))
        {
            Ok(fetched) => fetched,
            Err(e) if e.is_transient() => {
                warn!(store = %self.store_id, kind = %e.kind, error = %e, "failed to load secrets, will retry");
                return Ok(false);
            }
            Err(e) => {
                error!(store = %self.store_id, kind = %e.kind, error = %e, "failed to load secrets");
                return Err(e.into());
            }
        };

        let mut text = match fetched.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => {
                error!(store = %self.store_id, "there is no secret string in the secret store");
                return Err(SourceError::EmptyBundle(self.store_id.clone()));
            }
        };

        let parsed = serde_json::from_str::<Map<String, Value>>(&text);
        text.zeroize();
        let bundle = parsed.map_err(|e| SourceError::MalformedBundle {
            store: self.store_id.clone(),
            reason: e.to_string(),
        })?;

        let count = bundle.len();
        for (name, value) in bundle {
            self.cache.set(&name, ingest(value));
        }

        debug!(store = %self.store_id, values = count, "secrets loaded");
        Ok(true)
    }

    fn mark_loaded(&self) {
        self.cache.set(&self.sentinel, ConfigValue::Boolean(true));
    }
}

fn ingest(value: Value) -> Option<ConfigValue> {
    match value {
        Value::String(s) => Some(match parse_date(&s) {
            Some(date) => ConfigValue::Date(date),
            None => ConfigValue::String(s),
        }),
        other => ConfigValue::from_json(other),
    }
}

#[async_trait]
impl<F: SecretFetcher> Source for SecretStoreSource<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
        if !self.cache.contains(&self.sentinel) {
            debug!(store = %self.store_id, "lazy loading secrets");
            if self.load().await? {
                self.mark_loaded();
            }
        }
        trace!(store = %self.store_id, name, "secret store lookup");
        Ok(self.cache.get(name))
    }

    async fn refresh(&self) -> SourceResult<()> {
        debug!(store = %self.store_id, "refresh requested");
        if self.load().await? {
            self.mark_loaded();
        }
        Ok(())
    }
}

impl<F> std::fmt::Debug for SecretStoreSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStoreSource")
            .field("store_id", &self.store_id)
            .field("cache", &self.cache)
            .finish()
    }
}
