use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

/// Lower-layer outcome of a keyring round-trip, before SecureStore classifies
/// it into the closed [`crate::error::SecureStoreErrorCode`] taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyringCapabilityError {
    ModuleAbsent,
    NotFound,
    Locked,
    Denied,
    Timeout,
    Other(String),
}

/// Opaque capability interface over whatever native keyring module is
/// available on this platform. Loaded lazily and may be entirely absent
/// (headless CI, a container with no secret service running, a build with
/// the OS backend compiled out).
#[async_trait]
pub trait KeyringCapability: Send + Sync {
    async fn get_password(&self, service: &str, account: &str) -> Result<String, KeyringCapabilityError>;
    async fn set_password(&self, service: &str, account: &str, value: &str) -> Result<(), KeyringCapabilityError>;
    async fn delete_password(&self, service: &str, account: &str) -> Result<(), KeyringCapabilityError>;

    /// Enumerates stored accounts for `service`. Returns `Ok(None)` when the
    /// backend has no enumeration capability at all (the common case for the
    /// real OS keyring); callers fall back to whatever else they can see.
    async fn find_credentials(&self, service: &str) -> Result<Option<Vec<String>>, KeyringCapabilityError> {
        let _ = service;
        Ok(None)
    }
}

fn classify_keyring_error(error: keyring::Error) -> KeyringCapabilityError {
    match error {
        keyring::Error::NoEntry => KeyringCapabilityError::NotFound,
        keyring::Error::NoStorageAccess(_) => KeyringCapabilityError::ModuleAbsent,
        keyring::Error::PlatformFailure(inner) => {
            let text = inner.to_string().to_lowercase();
            if text.contains("lock") || text.contains("interaction is not allowed") {
                KeyringCapabilityError::Locked
            } else if text.contains("denied") || text.contains("permission") {
                KeyringCapabilityError::Denied
            } else {
                KeyringCapabilityError::Other(inner.to_string())
            }
        }
        other => KeyringCapabilityError::Other(other.to_string()),
    }
}

/// Adapter over the platform-native `keyring` crate. Every call is blocking
/// at the OS level, so each is dispatched through `spawn_blocking` to keep
/// the async runtime's task queue from stalling.
pub struct OsKeyringCapability;

#[async_trait]
impl KeyringCapability for OsKeyringCapability {
    async fn get_password(&self, service: &str, account: &str) -> Result<String, KeyringCapabilityError> {
        let service = service.to_string();
        let account = account.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account).map_err(classify_keyring_error)?;
            entry.get_password().map_err(classify_keyring_error)
        })
        .await
        .unwrap_or_else(|_| Err(KeyringCapabilityError::Other("keyring task panicked".to_string())))
    }

    async fn set_password(&self, service: &str, account: &str, value: &str) -> Result<(), KeyringCapabilityError> {
        let service = service.to_string();
        let account = account.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account).map_err(classify_keyring_error)?;
            entry.set_password(&value).map_err(classify_keyring_error)
        })
        .await
        .unwrap_or_else(|_| Err(KeyringCapabilityError::Other("keyring task panicked".to_string())))
    }

    async fn delete_password(&self, service: &str, account: &str) -> Result<(), KeyringCapabilityError> {
        let service = service.to_string();
        let account = account.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account).map_err(classify_keyring_error)?;
            entry.delete_password().map_err(classify_keyring_error)
        })
        .await
        .unwrap_or_else(|_| Err(KeyringCapabilityError::Other("keyring task panicked".to_string())))
    }
}

/// Resolves the default keyring capability. Returns `None` when the native
/// backend feature is compiled out, mirroring the "module absent" outcome a
/// dynamically-loaded backend would report in a script-language runtime.
#[cfg(feature = "os-keyring")]
pub fn load_default_keyring_capability() -> Option<Arc<dyn KeyringCapability>> {
    Some(Arc::new(OsKeyringCapability))
}

#[cfg(not(feature = "os-keyring"))]
pub fn load_default_keyring_capability() -> Option<Arc<dyn KeyringCapability>> {
    None
}

/// In-memory stand-in for tests, avoiding any dependency on a real OS
/// keyring (or lack of one) in CI.
#[derive(Default)]
pub struct InMemoryKeyringCapability {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl InMemoryKeyringCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<dyn KeyringCapability> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyringCapability for InMemoryKeyringCapability {
    async fn get_password(&self, service: &str, account: &str) -> Result<String, KeyringCapabilityError> {
        let entries = self.entries.lock().expect("lock poisoned");
        entries
            .get(&(service.to_string(), account.to_string()))
            .cloned()
            .ok_or(KeyringCapabilityError::NotFound)
    }

    async fn set_password(&self, service: &str, account: &str, value: &str) -> Result<(), KeyringCapabilityError> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert((service.to_string(), account.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_password(&self, service: &str, account: &str) -> Result<(), KeyringCapabilityError> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        match entries.remove(&(service.to_string(), account.to_string())) {
            Some(_) => Ok(()),
            None => Err(KeyringCapabilityError::NotFound),
        }
    }

    async fn find_credentials(&self, service: &str) -> Result<Option<Vec<String>>, KeyringCapabilityError> {
        let entries = self.entries.lock().expect("lock poisoned");
        let accounts = entries
            .keys()
            .filter(|(entry_service, _)| entry_service == service)
            .map(|(_, account)| account.clone())
            .collect();
        Ok(Some(accounts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_in_memory_capability_round_trips() {
        let capability = InMemoryKeyringCapability::new();
        capability.set_password("svc", "acct", "value").await.unwrap();
        assert_eq!(capability.get_password("svc", "acct").await.unwrap(), "value");
        capability.delete_password("svc", "acct").await.unwrap();
        assert_eq!(
            capability.get_password("svc", "acct").await.unwrap_err(),
            KeyringCapabilityError::NotFound
        );
    }

    #[tokio::test]
    async fn unit_in_memory_capability_enumerates_only_matching_service() {
        let capability = InMemoryKeyringCapability::new();
        capability.set_password("svc-a", "one", "x").await.unwrap();
        capability.set_password("svc-b", "two", "y").await.unwrap();
        let mut accounts = capability.find_credentials("svc-a").await.unwrap().unwrap();
        accounts.sort();
        assert_eq!(accounts, vec!["one".to_string()]);
    }
}
