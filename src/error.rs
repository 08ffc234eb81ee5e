//! Error types.
//!
//! Absence of a value is never an error. Provider failures are classified
//! by the adapter that observed them, so callers match on
//! [`ProviderErrorKind`] instead of inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

/// Classification of a failure reported by a backing provider.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    #[error("decryption failure")]
    DecryptionFailure,

    #[error("internal service error")]
    InternalServiceError,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("invalid request")]
    InvalidRequest,

    #[error("resource not found")]
    ResourceNotFound,

    #[error("provider unreachable")]
    Unreachable,

    #[error("unknown provider error")]
    Unknown,
}

impl ProviderErrorKind {
    /// Transient failures are recovered locally by retrying on a later call.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DecryptionFailure | Self::InternalServiceError | Self::Unreachable
        )
    }
}

/// A failure reported by a provider while serving a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} for store {store}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub store: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, store: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            store: store.into(),
            message: message.into(),
        }
    }

    /// Attribute the failure to `store`.
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = store.into();
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Errors raised by a [`Source`](crate::core::source::Source).
///
/// Cloneable so a single failed load can be handed to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("there is no secret string in the secret store named {0}")]
    EmptyBundle(String),

    #[error("secret store {store} returned a malformed bundle: {reason}")]
    MalformedBundle { store: String, reason: String },

    #[error("invalid payload while loading store {store}: {reason}")]
    InvalidPayload { store: String, reason: String },
}

impl SourceError {
    /// Identifier of the store that failed.
    pub fn store(&self) -> &str {
        match self {
            Self::Provider(e) => &e.store,
            Self::EmptyBundle(store) => store,
            Self::MalformedBundle { store, .. } => store,
            Self::InvalidPayload { store, .. } => store,
        }
    }
}

/// Errors loading or interpreting `configurations.toml`.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("source kind `{0}` requires the `aws` feature")]
    FeatureDisabled(String),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot read {name} as an object: {reason}")]
    Coercion { name: String, reason: String },

    #[error("no value found for {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
