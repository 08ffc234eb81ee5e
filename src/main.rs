//! Configurations - resolve configuration values across layered sources.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use configurations::cli::output;
use configurations::cli::{execute, Cli};
use configurations::core::constants::LOG_ENV;
use configurations::error::{Error, SettingsError, SourceError};
use configurations::ProviderErrorKind;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("configurations=debug")
        } else {
            EnvFilter::new("configurations=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::error(&format!("failed to start runtime: {}", e));
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(execute(cli.command, cli.settings)) {
        // Format error with suggestion if available
        let suggestion = match &e {
            Error::NotFound(_) => Some("pass --default to supply a fallback"),
            Error::Settings(SettingsError::Read { .. }) => {
                Some("create configurations.toml or pass --settings")
            }
            Error::Settings(SettingsError::FeatureDisabled(_)) => {
                Some("rebuild with: cargo install configurations --features aws")
            }
            Error::Source(SourceError::Provider(p))
                if p.kind == ProviderErrorKind::ResourceNotFound =>
            {
                Some("check the store_id in your settings")
            }
            Error::Source(SourceError::EmptyBundle(_)) => {
                Some("the secret exists but holds no value")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
