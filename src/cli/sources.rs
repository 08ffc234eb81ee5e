//! Sources command.
//!
//! List the configured sources in the order they are consulted.

use std::path::Path;

use crate::cli::output;
use crate::core::settings::Settings;
use crate::error::Result;

/// Print the sources in resolution order.
pub async fn execute(settings: &Path, json: bool) -> Result<()> {
    let config = Settings::load_or_default(settings)?.build().await?;
    let names = config.store().names();

    if json {
        let result = serde_json::json!({
            "sources": names,
            "miss_threshold": config.miss_threshold(),
        });
        output::data(&result.to_string());
    } else if names.is_empty() {
        output::dimmed("no sources configured");
    } else {
        output::header("Sources");
        output::rule();
        for (position, name) in names.iter().enumerate() {
            output::kv(&(position + 1).to_string(), name);
        }
        output::blank();
        output::kv("miss threshold", config.miss_threshold());
    }

    Ok(())
}
