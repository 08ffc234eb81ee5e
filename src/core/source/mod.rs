//! Configuration sources.
//!
//! A source answers lookups by name and can be asked to reload whatever
//! backs it. Sources are consulted in the order a
//! [`Store`](crate::core::store::Store) registered them.
//!
//! ## Adding a New Source
//!
//! 1. Implement the `Source` trait
//! 2. Keep any cached values in an owned `SecureCache`
//! 3. Register it with `Store::with_custom`
//!
//! ## Example
//!
//! ```ignore
//! struct Vault { cache: SecureCache }
//!
//! #[async_trait]
//! impl Source for Vault {
//!     fn name(&self) -> &str {
//!         "vault"
//!     }
//!     async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>> {
//!         Ok(self.cache.get(name))
//!     }
//!     async fn refresh(&self) -> SourceResult<()> {
//!         // Reload from the vault
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::core::value::ConfigValue;
use crate::error::SourceResult;

mod defaults;
mod environment;
mod invoke;
mod secret_store;

#[cfg(feature = "aws")]
pub mod aws;

pub use defaults::DefaultsSource;
pub use environment::EnvironmentSource;
pub use invoke::{FunctionInvoker, InvokeDecryptSource, InvokeOutput, InvokeRequest, KeyDecryptor};
pub use secret_store::{is_date_like, parse_date, SecretFetcher, SecretStoreSource};

/// A pluggable backend of configuration values.
#[async_trait]
pub trait Source: Send + Sync {
    /// Name used in diagnostics and listings.
    fn name(&self) -> &str;

    /// Look up `name`.
    ///
    /// Absence is `Ok(None)`. Errors are reserved for failures the caller
    /// must see, such as a misconfigured remote store.
    async fn get(&self, name: &str) -> SourceResult<Option<ConfigValue>>;

    /// Reload from the backing store. Sources without one do nothing.
    async fn refresh(&self) -> SourceResult<()>;
}
