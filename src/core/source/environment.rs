//! Environment variable source.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::Source;
use crate::core::value::ConfigValue;
use crate::error::SourceResult;

/// Reads values from the process environment.
///
/// Lookup uses the exact name given; case handling belongs to the host.
/// Empty and non-UTF-8 values are treated as absent.
#[derive(Debug, Default)]
pub struct EnvironmentSource {
    vars: Option<HashMap<String, String>>,
}

impl EnvironmentSource {
    /// Read from the live process environment.
    pub fn new() -> Self {
        debug!("environment source created");
        Self { vars: None }
    }

    /// Read from a fixed snapshot instead of the process environment.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        debug!(vars = vars.len(), "environment source created from snapshot");
        Self { vars: Some(vars) }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

#[async_trait]
impl Source for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
        trace!(name, "environment lookup");
        Ok(self
            .lookup(name)
            .filter(|v| !v.is_empty())
            .map(ConfigValue::String))
    }

    async fn refresh(&self) -> SourceResult<()> {
        debug!("refresh requested, doing nothing");
        Ok(())
    }
}
