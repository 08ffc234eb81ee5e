//! Static defaults source.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::Source;
use crate::core::cache::SecureCache;
use crate::core::value::ConfigValue;
use crate::error::SourceResult;

/// Fixed values supplied by the caller at construction.
///
/// Values are encrypted into the source's own cache and never change.
#[derive(Debug)]
pub struct DefaultsSource {
    cache: SecureCache,
}

impl DefaultsSource {
    pub fn new<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: AsRef<str>,
    {
        let cache = SecureCache::new();
        for (name, value) in values {
            cache.set(name.as_ref(), value);
        }
        debug!(values = cache.len(), "defaults source created");
        Self { cache }
    }

    /// Seed from a JSON object. `null` entries are skipped.
    pub fn from_json(values: Map<String, Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .filter_map(|(name, value)| ConfigValue::from_json(value).map(|v| (name, v))),
        )
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[async_trait]
impl Source for DefaultsSource {
    fn name(&self) -> &str {
        "defaults"
    }

    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
        trace!(name, "defaults lookup");
        Ok(self.cache.get(name))
    }

    async fn refresh(&self) -> SourceResult<()> {
        debug!("refresh requested, nothing backs defaults");
        Ok(())
    }
}
