//! Configurations - layered configuration and secret lookups.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/                  # Command-line interface
//! │   ├── get               # Resolve and print one value
//! │   ├── sources           # List sources in resolution order
//! │   └── output            # Terminal output helpers
//! └── core/                 # Core library components
//!     ├── configurations    # Resolution engine and miss tracking
//!     ├── store             # Ordered source registry
//!     ├── source/           # Source backends
//!     │   ├── mod           # Source trait
//!     │   ├── environment   # Process environment
//!     │   ├── defaults      # Fixed values
//!     │   ├── secret_store  # Lazily loaded secret bundles
//!     │   ├── invoke        # Invoke-and-decrypt with single-flight loads
//!     │   └── aws           # AWS adapters (feature `aws`)
//!     ├── cache             # age-encrypted in-memory cache
//!     ├── value             # Tagged configuration values
//!     ├── settings          # configurations.toml handling
//!     └── constants         # Shared names and tuning values
//! ```
//!
//! # Features
//!
//! - First-match resolution across ordered sources
//! - Automatic refresh of every source after repeated misses
//! - Values held as ciphertext while cached
//! - Remote secret stores loaded once and shared by concurrent callers
//! - Tolerant boolean, number, string and object accessors

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::cache::SecureCache;
pub use crate::core::configurations::Configurations;
pub use crate::core::settings::{Settings, SourceSettings};
pub use crate::core::source::{
    DefaultsSource, EnvironmentSource, FunctionInvoker, InvokeDecryptSource, KeyDecryptor,
    SecretFetcher, SecretStoreSource, Source,
};
pub use crate::core::store::Store;
pub use crate::core::value::{ConfigValue, ValueKind};
pub use crate::error::{
    Error, ProviderError, ProviderErrorKind, Result, SettingsError, SourceError, SourceResult,
};
