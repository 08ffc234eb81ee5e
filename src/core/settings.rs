//! Settings file management.
//!
//! Reads `configurations.toml`, which lists the sources to register in
//! resolution order and the engine's miss threshold.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::core::configurations::Configurations;
use crate::core::constants::DEFAULT_MISS_THRESHOLD;
use crate::core::source::parse_date;
use crate::core::store::Store;
use crate::core::value::ConfigValue;
use crate::error::{Result, SettingsError};

/// Contents of `configurations.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Unresolved lookups tolerated before every source is refreshed
    #[serde(default = "default_miss_threshold")]
    pub miss_threshold: usize,
    /// Sources in resolution order
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

fn default_miss_threshold() -> usize {
    DEFAULT_MISS_THRESHOLD
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceSettings {
    /// Fixed values written inline
    Defaults {
        #[serde(default)]
        values: toml::Table,
    },
    /// The process environment
    Environment,
    /// An AWS Secrets Manager secret
    SecretStore {
        store_id: String,
        #[serde(default)]
        region: Option<String>,
    },
    /// A Lambda function returning a KMS-encrypted bundle
    LambdaKms {
        function: String,
        key_ref: String,
        store_id: String,
        keys: Vec<String>,
        #[serde(default)]
        region: Option<String>,
    },
}

impl SourceSettings {
    /// The `kind` tag as written in the file.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Defaults { .. } => "defaults",
            Self::Environment => "environment",
            Self::SecretStore { .. } => "secret-store",
            Self::LambdaKms { .. } => "lambda-kms",
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Read` if the file cannot be read, or
    /// `SettingsError::Parse`/`SettingsError::Invalid` if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading settings");

        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Load settings from `path`, or use the defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate settings text.
    pub fn parse(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(SettingsError::Parse)?;
        debug!(
            sources = settings.sources.len(),
            miss_threshold = settings.miss_threshold,
            "settings parsed"
        );
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    ///
    /// Checks:
    /// - The miss threshold is at least 1
    /// - Remote sources name their store, function and key
    /// - Lambda sources declare at least one key
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.miss_threshold == 0 {
            return Err(invalid("miss_threshold must be at least 1"));
        }

        for (index, source) in self.sources.iter().enumerate() {
            match source {
                SourceSettings::Defaults { .. } | SourceSettings::Environment => {}
                SourceSettings::SecretStore { store_id, .. } => {
                    require(index, source, "store_id", store_id)?;
                }
                SourceSettings::LambdaKms {
                    function,
                    key_ref,
                    store_id,
                    keys,
                    ..
                } => {
                    require(index, source, "function", function)?;
                    require(index, source, "key_ref", key_ref)?;
                    require(index, source, "store_id", store_id)?;
                    if keys.is_empty() {
                        return Err(invalid(format!(
                            "sources[{}] ({}) must declare at least one key",
                            index,
                            source.kind()
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Register every configured source and build the engine.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::FeatureDisabled` for a remote source when the
    /// crate was built without the `aws` feature.
    pub async fn build(&self) -> Result<Configurations> {
        self.validate()?;

        let mut store = Store::new();
        for source in &self.sources {
            store = match source {
                SourceSettings::Defaults { values } => store.with_defaults(
                    values
                        .iter()
                        .map(|(name, value)| (name.as_str(), toml_to_config(value))),
                ),
                SourceSettings::Environment => store.with_environment(),
                #[cfg(feature = "aws")]
                SourceSettings::SecretStore { store_id, region } => {
                    store
                        .with_secret_store(store_id.clone(), region.as_deref())
                        .await
                }
                #[cfg(feature = "aws")]
                SourceSettings::LambdaKms {
                    function,
                    key_ref,
                    store_id,
                    keys,
                    region,
                } => {
                    store
                        .with_lambda_kms(
                            function.clone(),
                            key_ref.clone(),
                            store_id.clone(),
                            keys.iter().cloned(),
                            region.as_deref(),
                        )
                        .await
                }
                #[cfg(not(feature = "aws"))]
                remote => {
                    return Err(SettingsError::FeatureDisabled(remote.kind().to_string()).into());
                }
            };
        }

        Ok(Configurations::new(store).with_miss_threshold(self.miss_threshold))
    }
}

impl Default for Settings {
    /// The environment alone, with the default miss threshold.
    fn default() -> Self {
        Self {
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            sources: vec![SourceSettings::Environment],
        }
    }
}

fn invalid(reason: impl Into<String>) -> crate::error::Error {
    SettingsError::Invalid(reason.into()).into()
}

fn require(index: usize, source: &SourceSettings, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!(
            "sources[{}] ({}) requires a non-empty {}",
            index,
            source.kind(),
            field
        )));
    }
    Ok(())
}

/// Convert a TOML value. Datetimes with a date part become dates, arrays
/// and tables become objects.
fn toml_to_config(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Integer(i) => ConfigValue::from(*i),
        toml::Value::Float(f) => ConfigValue::Number(*f),
        toml::Value::Boolean(b) => ConfigValue::Boolean(*b),
        toml::Value::Datetime(dt) => {
            let text = dt.to_string();
            match parse_date(&text) {
                Some(date) => ConfigValue::Date(date),
                None => ConfigValue::String(text),
            }
        }
        toml::Value::Array(_) | toml::Value::Table(_) => ConfigValue::Object(toml_to_json(value)),
    }
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}
