//! Get command.
//!
//! Resolve one name through the configured sources and print it.

use std::path::Path;

use crate::cli::{output, Coercion};
use crate::core::settings::Settings;
use crate::core::value::ConfigValue;
use crate::error::{Error, Result};

/// Resolve `name` and print it with the requested interpretation.
pub async fn execute(
    settings: &Path,
    name: &str,
    default: Option<String>,
    coercion: Coercion,
) -> Result<()> {
    let config = Settings::load_or_default(settings)?.build().await?;

    let value = match default {
        Some(default) => config.get_or(name, default).await?,
        None => config
            .get(name)
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string()))?,
    };

    output::data(&render(name, &value, coercion)?);
    Ok(())
}

fn render(name: &str, value: &ConfigValue, coercion: Coercion) -> Result<String> {
    let rendered = match coercion {
        Coercion::String => value.to_string(),
        Coercion::Boolean => value.to_boolean().to_string(),
        Coercion::Number => ConfigValue::Number(value.to_number()).to_string(),
        Coercion::Object => value
            .to_object()
            .and_then(|object| serde_json::to_string_pretty(&object))
            .map_err(|e| Error::Coercion {
                name: name.to_string(),
                reason: e.to_string(),
            })?,
    };
    Ok(rendered)
}
