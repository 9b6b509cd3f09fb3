//! Password storage outside the config file
//!
//! `KeyringStore` keeps every source password in a SINGLE keychain entry as
//! a JSON map, so macOS asks for keychain access once rather than once per
//! source.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{ConfigError, Result};

/// Service name used for the keychain entry
const SERVICE_NAME: &str = "dev.psql-transporter.sources";

/// Account name for the single keychain entry holding all passwords
const ACCOUNT_NAME: &str = "passwords";

/// Passwords keyed by source name
pub trait SecretStore: Send + Sync {
    fn get(&self, source: &str) -> Result<Option<String>>;
    fn set(&self, source: &str, password: &str) -> Result<()>;
    fn delete(&self, source: &str) -> Result<()>;
}

/// Secret store backed by the system keychain
///
/// The keychain is read lazily on first access and cached afterwards. Read
/// failures degrade to an empty map with a warning.
pub struct KeyringStore {
    cache: RwLock<Option<HashMap<String, String>>>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(None),
        }
    }

    fn key(source: &str) -> String {
        format!("password:{}", source)
    }

    fn entry() -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, ACCOUNT_NAME)
            .map_err(|e| ConfigError::Secret(format!("Failed to create keyring entry: {}", e)))
    }

    fn load_from_keychain() -> HashMap<String, String> {
        let entry = match Self::entry() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("{}, using empty credentials", e);
                return HashMap::new();
            }
        };

        match entry.get_password() {
            Ok(json) => {
                let passwords: HashMap<String, String> =
                    serde_json::from_str(&json).unwrap_or_else(|e| {
                        tracing::warn!("Failed to parse stored passwords, starting fresh: {}", e);
                        HashMap::new()
                    });
                tracing::debug!(count = passwords.len(), "loaded passwords from keychain");
                passwords
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("no passwords found in keychain");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!("Failed to access keychain: {}, using empty credentials", e);
                HashMap::new()
            }
        }
    }

    fn save_to_keychain(passwords: &HashMap<String, String>) -> Result<()> {
        let entry = Self::entry()?;

        if passwords.is_empty() {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    return Err(ConfigError::Secret(format!(
                        "Failed to delete keychain entry: {}",
                        e
                    )));
                }
            }
            tracing::debug!("removed empty password map from keychain");
            return Ok(());
        }

        let json = serde_json::to_string(passwords)
            .map_err(|e| ConfigError::Secret(format!("Failed to serialize passwords: {}", e)))?;
        entry.set_password(&json).map_err(|e| {
            ConfigError::Secret(format!("Failed to store passwords in keychain: {}", e))
        })?;

        tracing::debug!(count = passwords.len(), "saved passwords to keychain");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<()> {
        let mut cache = self.cache.write();
        if cache.is_none() {
            *cache = Some(Self::load_from_keychain());
        }
        let passwords = cache.get_or_insert_with(HashMap::new);
        if apply(passwords) {
            Self::save_to_keychain(passwords)?;
        }
        Ok(())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, source: &str) -> Result<Option<String>> {
        if let Some(passwords) = self.cache.read().as_ref() {
            return Ok(passwords.get(&Self::key(source)).cloned());
        }

        let mut cache = self.cache.write();
        let passwords = cache.get_or_insert_with(Self::load_from_keychain);
        Ok(passwords.get(&Self::key(source)).cloned())
    }

    fn set(&self, source: &str, password: &str) -> Result<()> {
        self.update(|passwords| {
            passwords.insert(Self::key(source), password.to_string());
            true
        })?;
        tracing::debug!(source = %source, "stored password");
        Ok(())
    }

    fn delete(&self, source: &str) -> Result<()> {
        self.update(|passwords| passwords.remove(&Self::key(source)).is_some())?;
        tracing::debug!(source = %source, "deleted password");
        Ok(())
    }
}

/// In-memory secret store with no persistence
#[derive(Default)]
pub struct MemoryStore {
    passwords: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(self, source: &str, password: &str) -> Self {
        self.passwords
            .write()
            .insert(source.to_string(), password.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.passwords.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.read().is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, source: &str) -> Result<Option<String>> {
        Ok(self.passwords.read().get(source).cloned())
    }

    fn set(&self, source: &str, password: &str) -> Result<()> {
        self.passwords
            .write()
            .insert(source.to_string(), password.to_string());
        Ok(())
    }

    fn delete(&self, source: &str) -> Result<()> {
        self.passwords.write().remove(source);
        Ok(())
    }
}
