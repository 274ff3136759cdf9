use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{SecureStoreError, SecureStoreErrorCode};
use crate::fallback_store::{validate_key, FallbackStore};
use crate::keyring_capability::{load_default_keyring_capability, KeyringCapability, KeyringCapabilityError};
use crate::observability::{emit, OperationKind, Route};
use crate::prober::AvailabilityProber;

/// Two-state configuration controlling what happens when the keyring is
/// unavailable. There is no third state and no per-operation override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    Allow,
    Deny,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::Allow
    }
}

fn classify_capability_error(error: KeyringCapabilityError) -> SecureStoreError {
    match error {
        KeyringCapabilityError::ModuleAbsent => {
            SecureStoreError::new(SecureStoreErrorCode::Unavailable, "native keyring backend is unavailable")
        }
        KeyringCapabilityError::NotFound => {
            SecureStoreError::new(SecureStoreErrorCode::NotFound, "no value is stored for this key")
        }
        KeyringCapabilityError::Locked => {
            SecureStoreError::new(SecureStoreErrorCode::Locked, "the system keychain is locked")
        }
        KeyringCapabilityError::Denied => {
            SecureStoreError::new(SecureStoreErrorCode::Denied, "the keyring refused access to this entry")
        }
        KeyringCapabilityError::Timeout => {
            SecureStoreError::new(SecureStoreErrorCode::Timeout, "the keyring operation timed out")
        }
        KeyringCapabilityError::Other(message) => {
            SecureStoreError::new(SecureStoreErrorCode::Unavailable, "keyring backend reported an unrecognized failure")
                .with_cause(anyhow::anyhow!(message))
        }
    }
}

/// Composes the keyring capability and the encrypted fallback store: routes
/// CRUD between them, enforces the fallback policy, classifies errors into
/// the closed taxonomy, and emits structured observability records.
pub struct SecureStore {
    service_name: String,
    capability: Option<Arc<dyn KeyringCapability>>,
    fallback: FallbackStore,
    fallback_policy: FallbackPolicy,
    prober: AvailabilityProber,
}

impl SecureStore {
    pub fn new(
        service_name: impl Into<String>,
        fallback_dir: impl Into<PathBuf>,
        fallback_policy: FallbackPolicy,
    ) -> Self {
        Self::with_capability(service_name, fallback_dir, fallback_policy, load_default_keyring_capability())
    }

    /// Constructs a store around an explicit capability, bypassing the
    /// default loader. Used by consumers that need a test double (`None` to
    /// simulate an absent backend, `InMemoryKeyringCapability` otherwise).
    pub fn with_capability(
        service_name: impl Into<String>,
        fallback_dir: impl Into<PathBuf>,
        fallback_policy: FallbackPolicy,
        capability: Option<Arc<dyn KeyringCapability>>,
    ) -> Self {
        let service_name = service_name.into();
        let prober = AvailabilityProber::new(service_name.clone(), capability.clone());
        Self {
            service_name,
            capability,
            fallback: FallbackStore::new(fallback_dir),
            fallback_policy,
            prober,
        }
    }

    pub fn fallback_dir(&self) -> &Path {
        self.fallback.dir()
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        let start = Instant::now();
        let keyring_available = self.prober.is_available().await;

        if keyring_available {
            if let Some(capability) = &self.capability {
                match capability.set_password(&self.service_name, key, value).await {
                    Ok(()) => {
                        emit(OperationKind::Set, Some(key), Some(Route::Keyring), "success", start.elapsed(), false);
                        return Ok(());
                    }
                    Err(error) => {
                        let classified = classify_capability_error(error);
                        if classified.code.is_transient() {
                            self.prober.invalidate().await;
                        } else {
                            emit(
                                OperationKind::Set,
                                Some(key),
                                Some(Route::Keyring),
                                classified.code.as_str(),
                                start.elapsed(),
                                false,
                            );
                            return Err(classified);
                        }
                    }
                }
            }
        }

        if self.fallback_policy == FallbackPolicy::Deny {
            let error = SecureStoreError::new(
                SecureStoreErrorCode::Unavailable,
                "keyring is unavailable and the fallback policy denies on-disk storage",
            );
            emit(OperationKind::Set, Some(key), None, error.code.as_str(), start.elapsed(), false);
            return Err(error);
        }

        let result = self.fallback.set(key, value).await;
        let outcome = match &result {
            Ok(()) => "success",
            Err(error) => error.code.as_str(),
        };
        emit(OperationKind::Set, Some(key), Some(Route::Fallback), outcome, start.elapsed(), true);
        result
    }

    /// Keyring wins when both stores hold a value: this is enforced simply
    /// by the read order below, not by a separate precedence check.
    pub async fn get(&self, key: &str) -> Result<Option<String>, SecureStoreError> {
        validate_key(key)?;
        let start = Instant::now();
        let keyring_available = self.prober.is_available().await;
        let mut attempted_keyring = false;

        if keyring_available {
            if let Some(capability) = &self.capability {
                attempted_keyring = true;
                match capability.get_password(&self.service_name, key).await {
                    Ok(value) => {
                        emit(OperationKind::Get, Some(key), Some(Route::Keyring), "success", start.elapsed(), false);
                        return Ok(Some(value));
                    }
                    Err(KeyringCapabilityError::NotFound) => {
                        // Fall through: this key simply isn't in the keyring.
                    }
                    Err(error) => {
                        let classified = classify_capability_error(error);
                        if classified.code.is_transient() {
                            self.prober.invalidate().await;
                        } else {
                            emit(
                                OperationKind::Get,
                                Some(key),
                                Some(Route::Keyring),
                                classified.code.as_str(),
                                start.elapsed(),
                                false,
                            );
                            return Err(classified);
                        }
                    }
                }
            }
        }

        let result = self.fallback.get(key).await;
        let outcome = match &result {
            Ok(Some(_)) => "success",
            Ok(None) => "not_found",
            Err(error) => error.code.as_str(),
        };
        emit(OperationKind::Get, Some(key), Some(Route::Fallback), outcome, start.elapsed(), attempted_keyring);
        result
    }

    /// Returns `false` iff both stores are NOT_FOUND; any other classified
    /// error propagates.
    pub async fn has(&self, key: &str) -> Result<bool, SecureStoreError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Deletes from both backends; returns `true` iff at least one
    /// deletion actually removed something. NOT_FOUND in either store is
    /// not an error; any other failure propagates.
    pub async fn delete(&self, key: &str) -> Result<bool, SecureStoreError> {
        validate_key(key)?;
        let start = Instant::now();
        let mut removed_anything = false;

        if let Some(capability) = &self.capability {
            match capability.delete_password(&self.service_name, key).await {
                Ok(()) => removed_anything = true,
                Err(KeyringCapabilityError::NotFound) => {}
                Err(error) => {
                    let classified = classify_capability_error(error);
                    emit(
                        OperationKind::Delete,
                        Some(key),
                        Some(Route::Keyring),
                        classified.code.as_str(),
                        start.elapsed(),
                        false,
                    );
                    return Err(classified);
                }
            }
        }

        let fallback_removed = self.fallback.delete(key).await?;
        removed_anything = removed_anything || fallback_removed;

        emit(
            OperationKind::Delete,
            Some(key),
            None,
            if removed_anything { "success" } else { "not_found" },
            start.elapsed(),
            false,
        );
        Ok(removed_anything)
    }

    /// Enumerates the union of keyring accounts (when the capability
    /// supports enumeration) and fallback `.enc` files, sorted. Transient
    /// failures in either source do not abort the other.
    pub async fn list(&self) -> Result<Vec<String>, SecureStoreError> {
        let start = Instant::now();
        let mut keys = std::collections::BTreeSet::new();

        if let Some(capability) = &self.capability {
            match capability.find_credentials(&self.service_name).await {
                Ok(Some(accounts)) => keys.extend(accounts),
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(error = ?error, "keyring enumeration failed, continuing with fallback listing only");
                }
            }
        }

        let fallback_keys = self.fallback.list().await?;
        keys.extend(fallback_keys);

        let result: Vec<String> = keys.into_iter().collect();
        emit(OperationKind::List, None, None, "success", start.elapsed(), false);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring_capability::InMemoryKeyringCapability;

    fn store_with_memory_keyring(dir: &Path) -> SecureStore {
        SecureStore::with_capability(
            "llxprt-test-service",
            dir,
            FallbackPolicy::Allow,
            Some(InMemoryKeyringCapability::arc()),
        )
    }

    fn store_with_no_keyring(dir: &Path, policy: FallbackPolicy) -> SecureStore {
        SecureStore::with_capability("llxprt-test-service", dir, policy, None)
    }

    #[tokio::test]
    async fn scenario_keyring_absent_allow_policy_round_trips_through_fallback() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_no_keyring(tempdir.path(), FallbackPolicy::Allow);
        store.set("anthropic", "sk-a1b2").await.expect("set");

        let enc_path = tempdir.path().join("anthropic.enc");
        assert!(enc_path.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&enc_path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        assert_eq!(store.get("anthropic").await.unwrap().as_deref(), Some("sk-a1b2"));
    }

    #[tokio::test]
    async fn scenario_keyring_absent_deny_policy_refuses_without_writing_a_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_no_keyring(tempdir.path(), FallbackPolicy::Deny);
        let error = store.set("anthropic", "sk-a1b2").await.expect_err("should refuse");
        assert_eq!(error.code, SecureStoreErrorCode::Unavailable);
        assert!(!error.remediation().is_empty());
        assert!(!tempdir.path().join("anthropic.enc").exists());
    }

    #[tokio::test]
    async fn unit_keyring_wins_when_both_stores_hold_a_value() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_memory_keyring(tempdir.path());
        store.fallback.set("k", "fallback-value").await.expect("seed fallback");
        store
            .capability
            .as_ref()
            .unwrap()
            .set_password("llxprt-test-service", "k", "keyring-value")
            .await
            .expect("seed keyring");

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("keyring-value"));
    }

    #[tokio::test]
    async fn unit_delete_returns_true_only_when_something_was_removed() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_memory_keyring(tempdir.path());
        store.set("k", "v").await.expect("set");
        assert!(store.delete("k").await.expect("delete"));
        assert!(!store.delete("k").await.expect("delete"));
    }

    #[tokio::test]
    async fn unit_has_is_false_only_when_both_stores_miss() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_memory_keyring(tempdir.path());
        assert!(!store.has("missing").await.unwrap());
        store.set("present", "v").await.unwrap();
        assert!(store.has("present").await.unwrap());
    }

    #[tokio::test]
    async fn scenario_list_union_of_keyring_and_fallback_keys_sorted() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = store_with_memory_keyring(tempdir.path());
        store
            .capability
            .as_ref()
            .unwrap()
            .set_password("llxprt-test-service", "a", "v")
            .await
            .unwrap();
        store
            .capability
            .as_ref()
            .unwrap()
            .set_password("llxprt-test-service", "b", "v")
            .await
            .unwrap();
        store.fallback.set("b", "v").await.unwrap();
        store.fallback.set("c", "v").await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }
}
