//! Encrypted in-memory cache.
//!
//! Every entry is stored as age ciphertext sealed to an x25519 identity
//! generated when the cache is created. The identity never leaves the
//! instance, so entries become unrecoverable once the cache is dropped.
//!
//! Logging is deliberately absent from this module so that neither names
//! nor values leak through diagnostics.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::{PoisonError, RwLock};

use age::x25519;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::core::value::ConfigValue;

/// Serialized form of a cached value: `{"kind": ..., "value": ...}`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum Record {
    String(String),
    Boolean(bool),
    Number(f64),
    /// Epoch milliseconds
    Date(i64),
    Object(Value),
}

impl Record {
    fn from_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::String(s) => Some(Self::String(s)),
            ConfigValue::Boolean(b) => Some(Self::Boolean(b)),
            ConfigValue::Number(n) if n.is_finite() => Some(Self::Number(n)),
            ConfigValue::Number(_) => None,
            ConfigValue::Date(d) => Some(Self::Date(d.timestamp_millis())),
            ConfigValue::Object(v) => Some(Self::Object(v)),
        }
    }

    fn into_value(self) -> Option<ConfigValue> {
        match self {
            Self::String(s) => Some(ConfigValue::String(s)),
            Self::Boolean(b) => Some(ConfigValue::Boolean(b)),
            Self::Number(n) => Some(ConfigValue::Number(n)),
            Self::Date(ms) => Utc.timestamp_millis_opt(ms).single().map(ConfigValue::Date),
            Self::Object(v) => Some(ConfigValue::Object(v)),
        }
    }
}

/// Process-local, type-preserving, encrypted key/value store.
pub struct SecureCache {
    identity: x25519::Identity,
    recipient: x25519::Recipient,
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl SecureCache {
    pub fn new() -> Self {
        let identity = x25519::Identity::generate();
        let recipient = identity.to_public();
        Self {
            identity,
            recipient,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Store `value` under `name`.
    ///
    /// `None` clears the key, as does a non-finite number (it has no
    /// serialized form). Never fails.
    pub fn set(&self, name: &str, value: impl Into<Option<ConfigValue>>) {
        let sealed = value
            .into()
            .and_then(Record::from_value)
            .and_then(|record| self.seal(&record));

        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        match sealed {
            Some(ciphertext) => {
                values.insert(name.to_string(), ciphertext);
            }
            None => {
                values.remove(name);
            }
        }
    }

    /// Read the value stored under `name`, reconstructing its kind.
    pub fn get(&self, name: &str) -> Option<ConfigValue> {
        let ciphertext = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        self.open(&ciphertext)
    }

    pub fn remove(&self, name: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn seal(&self, record: &Record) -> Option<Vec<u8>> {
        let mut plaintext = serde_json::to_vec(record).ok()?;
        let sealed = encrypt(&self.recipient, &plaintext);
        plaintext.zeroize();
        sealed
    }

    fn open(&self, ciphertext: &[u8]) -> Option<ConfigValue> {
        let mut plaintext = decrypt(&self.identity, ciphertext)?;
        let record = serde_json::from_slice::<Record>(&plaintext).ok();
        plaintext.zeroize();
        record?.into_value()
    }

    #[cfg(test)]
    fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl Default for SecureCache {
    fn default() -> Self {
        Self::new()
    }
}

// Never print key material or ciphertext
impl fmt::Debug for SecureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCache")
            .field("entries", &self.len())
            .finish()
    }
}

fn encrypt(recipient: &x25519::Recipient, plaintext: &[u8]) -> Option<Vec<u8>> {
    let encryptor =
        age::Encryptor::with_recipients(std::iter::once(recipient as &dyn age::Recipient)).ok()?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor.wrap_output(&mut encrypted).ok()?;
    writer.write_all(plaintext).ok()?;
    writer.finish().ok()?;

    Some(encrypted)
}

fn decrypt(identity: &x25519::Identity, ciphertext: &[u8]) -> Option<Vec<u8>> {
    let decryptor = age::Decryptor::new(ciphertext).ok()?;

    let mut decrypted = Vec::new();
    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .ok()?;
    reader.read_to_end(&mut decrypted).ok()?;

    Some(decrypted)
}
