// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service and storage port for Echo UI tools.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Storage port for raw config blobs, keyed by logical name.
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// Key is empty or contains characters a store cannot map to a name.
    #[error("invalid config key: {0:?}")]
    InvalidKey(String),
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Checks that `key` is a plain name: ASCII alphanumerics, `-`, `_` and `.`,
/// not starting with `.`.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey(key.to_owned()))
    }
}

/// Serializes config values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the inner store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value for `key`. Returns `Ok(None)` if missing
    /// or empty.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                debug!(key, bytes = bytes.len(), "config loaded");
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`ConfigService::load`], falling back to `T::default()` when the
    /// key is missing or unreadable. Failures are logged, not returned.
    pub fn load_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(err) => {
                warn!(key, error = %err, "config unreadable, using defaults");
                T::default()
            }
        }
    }

    /// Serialize and persist the value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        validate_key(key)?;
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)?;
        debug!(key, bytes = data.len(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_and_empty_blobs_load_as_none() {
        let svc = ConfigService::new(MemStore::default());
        assert!(svc.load::<u32>("absent").unwrap().is_none());
        svc.store().save_raw("empty", b"").unwrap();
        assert!(svc.load::<u32>("empty").unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let svc = ConfigService::new(MemStore::default());
        svc.save("answer", &42u32).unwrap();
        assert_eq!(svc.load::<u32>("answer").unwrap(), Some(42));
    }

    #[test]
    fn garbage_is_a_serde_error_but_defaults_on_request() {
        let svc = ConfigService::new(MemStore::default());
        svc.store().save_raw("bad", b"{not json").unwrap();
        assert!(matches!(svc.load::<u32>("bad"), Err(ConfigError::Serde(_))));
        assert_eq!(svc.load_or_default::<u32>("bad"), 0);
    }

    #[test]
    fn keys_must_be_plain_names() {
        for key in ["registry", "ui.registry", "a-b_c"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
        for key in ["", ".hidden", "../escape", "a/b", "a b"] {
            assert!(
                matches!(validate_key(key), Err(ConfigError::InvalidKey(_))),
                "{key}"
            );
        }
        let svc = ConfigService::new(MemStore::default());
        assert!(matches!(
            svc.save("../x", &1u8),
            Err(ConfigError::InvalidKey(_))
        ));
    }
}
