use keyring::Entry;

use super::storage::{SessionStorage, StorageError};

const SERVICE_NAME: &str = "fridge-tracker";

/// Session storage backed by the OS keychain, one entry per key.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_visible_to_a_new_instance() {
        let service = format!("{}-test-{}", SERVICE_NAME, std::process::id());
        let writer = KeyringStorage::with_service(service.clone());
        if let Err(err) = writer.set("username", "alice") {
            // CI containers often have no keychain or keyctl access
            eprintln!("skipping, OS keychain unavailable: {err}");
            return;
        }

        let reader = KeyringStorage::with_service(service);
        let value = reader.get("username");
        reader.remove("username").unwrap();

        assert_eq!(value.unwrap().as_deref(), Some("alice"));
        assert_eq!(reader.get("username").unwrap(), None);
        // Removing twice is fine
        reader.remove("username").unwrap();
    }
}
