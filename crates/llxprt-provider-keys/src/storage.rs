use std::path::PathBuf;
use std::sync::Arc;

use llxprt_securestore::{FallbackPolicy, KeyringCapability, SecureStore, SecureStoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;

const PROVIDER_KEYS_SERVICE: &str = "llxprt-code-provider-keys";
const NAME_MAX_LEN: usize = 64;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("name pattern is a valid regex"));

/// Returned when a name or API key fails validation before ever reaching
/// [`SecureStore`]. Kept distinct from [`SecureStoreError`] because these are
/// caller mistakes, not storage-backend failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderKeyValidationError {
    #[error("Key name '{0}' is invalid. Use only letters, numbers, dashes, underscores, and dots (1-64 chars).")]
    InvalidName(String),
    #[error("API key value cannot be empty.")]
    EmptyApiKey,
}

/// Either a validation failure or a classified [`SecureStoreError`] from the
/// underlying store.
#[derive(Debug, thiserror::Error)]
pub enum ProviderKeyError {
    #[error(transparent)]
    Validation(#[from] ProviderKeyValidationError),
    #[error(transparent)]
    Store(#[from] SecureStoreError),
}

impl ProviderKeyError {
    /// A short, user-facing message suitable for the command surface: never
    /// a raw stack trace, always the remediation string when this wraps a
    /// classified store error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::Store(error) => format!("{error} ({})", error.remediation()),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ProviderKeyValidationError> {
    if name.len() > NAME_MAX_LEN || !NAME_PATTERN.is_match(name) {
        return Err(ProviderKeyValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Strips trailing `\r`/`\n` and surrounding whitespace from a raw API key,
/// the normalization every `saveKey` call applies before storage.
fn normalize_api_key(raw: &str) -> Result<String, ProviderKeyValidationError> {
    let normalized = raw.trim_end_matches(['\r', '\n']).trim().to_string();
    if normalized.is_empty() {
        return Err(ProviderKeyValidationError::EmptyApiKey);
    }
    Ok(normalized)
}

/// Thin validating layer over [`SecureStore`] in the dedicated
/// `llxprt-code-provider-keys` service namespace. Name casing is preserved;
/// case-folding performed by a keyring backend underneath is a documented,
/// platform-level limitation, not something this layer corrects.
pub struct ProviderKeyStorage {
    store: SecureStore,
}

impl ProviderKeyStorage {
    /// Builds the default instance: OS keyring first, encrypted fallback
    /// under `~/.llxprt/provider-keys` when unavailable.
    pub fn new() -> Self {
        Self::with_fallback_dir(default_fallback_dir())
    }

    pub fn with_fallback_dir(fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: SecureStore::new(PROVIDER_KEYS_SERVICE, fallback_dir, FallbackPolicy::Allow),
        }
    }

    /// Builds an instance around an explicit keyring capability (or `None`
    /// to simulate an absent backend), bypassing the default OS loader.
    /// Used by tests that need deterministic keyring-present/absent
    /// behavior regardless of the host running them.
    pub fn with_capability(
        fallback_dir: impl Into<PathBuf>,
        fallback_policy: FallbackPolicy,
        capability: Option<Arc<dyn KeyringCapability>>,
    ) -> Self {
        Self {
            store: SecureStore::with_capability(PROVIDER_KEYS_SERVICE, fallback_dir, fallback_policy, capability),
        }
    }

    pub async fn save_key(&self, name: &str, api_key: &str) -> Result<(), ProviderKeyError> {
        validate_name(name)?;
        let normalized = normalize_api_key(api_key)?;
        self.store.set(name, &normalized).await?;
        Ok(())
    }

    pub async fn get_key(&self, name: &str) -> Result<Option<String>, ProviderKeyError> {
        validate_name(name)?;
        Ok(self.store.get(name).await?)
    }

    pub async fn delete_key(&self, name: &str) -> Result<bool, ProviderKeyError> {
        validate_name(name)?;
        Ok(self.store.delete(name).await?)
    }

    pub async fn has_key(&self, name: &str) -> Result<bool, ProviderKeyError> {
        validate_name(name)?;
        Ok(self.store.has(name).await?)
    }

    pub async fn list_keys(&self) -> Result<Vec<String>, ProviderKeyError> {
        let mut keys = self.store.list().await?;
        keys.sort();
        Ok(keys)
    }
}

impl Default for ProviderKeyStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn default_fallback_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".llxprt")
        .join("provider-keys")
}

/// Process-wide instance, analogous to a hypothetical `ToolKeyStorage`
/// constructed the same way against `llxprt-code-tool-keys` — SecureStore's
/// constructor is generic over service namespace and fallback directory,
/// so every credential subsystem in the agent is a thin wrapper like this one.
static SINGLETON: Lazy<Mutex<Option<Arc<ProviderKeyStorage>>>> = Lazy::new(|| Mutex::new(None));

/// Returns the process-wide [`ProviderKeyStorage`], constructing it on first
/// use.
pub async fn provider_key_storage() -> Arc<ProviderKeyStorage> {
    let mut guard = SINGLETON.lock().await;
    if let Some(existing) = guard.as_ref() {
        return Arc::clone(existing);
    }
    let created = Arc::new(ProviderKeyStorage::new());
    *guard = Some(Arc::clone(&created));
    created
}

/// Clears the process-wide instance so the next call to
/// [`provider_key_storage`] builds a fresh one. Test isolation only.
pub async fn reset_provider_key_storage_for_tests() {
    let mut guard = SINGLETON.lock().await;
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &std::path::Path) -> ProviderKeyStorage {
        ProviderKeyStorage::with_fallback_dir(dir)
    }

    #[tokio::test]
    async fn unit_save_then_get_round_trips() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(tempdir.path());
        storage.save_key("anthropic", "sk-a1b2").await.expect("save");
        assert_eq!(storage.get_key("anthropic").await.unwrap().as_deref(), Some("sk-a1b2"));
    }

    #[tokio::test]
    async fn unit_save_key_normalizes_trailing_newline_and_whitespace() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(tempdir.path());
        storage.save_key("anthropic", "  sk-a1b2\r\n").await.expect("save");
        assert_eq!(storage.get_key("anthropic").await.unwrap().as_deref(), Some("sk-a1b2"));
    }

    #[tokio::test]
    async fn regression_save_key_rejects_empty_after_normalization() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(tempdir.path());
        let error = storage.save_key("anthropic", "   \r\n").await.expect_err("should reject");
        assert!(matches!(
            error,
            ProviderKeyError::Validation(ProviderKeyValidationError::EmptyApiKey)
        ));
    }

    #[test]
    fn property_name_validation_p6() {
        assert!(validate_name("anthropic").is_ok());
        assert!(validate_name("work-key_1.prod").is_ok());
        assert!(validate_name(&"a".repeat(64)).is_ok());
        assert!(validate_name(&"a".repeat(65)).is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("has/slash").is_err());
    }

    #[test]
    fn regression_invalid_name_message_includes_offending_name() {
        let error = validate_name("bad name!").expect_err("should fail");
        let message = error.to_string();
        assert!(message.contains("bad name!"));
        assert!(message.contains("1-64 chars"));
    }

    #[tokio::test]
    async fn unit_delete_key_reports_whether_something_was_removed() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(tempdir.path());
        storage.save_key("k", "v").await.unwrap();
        assert!(storage.delete_key("k").await.unwrap());
        assert!(!storage.delete_key("k").await.unwrap());
    }

    #[tokio::test]
    async fn unit_list_keys_sorted_alphabetically() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(tempdir.path());
        storage.save_key("zebra", "v").await.unwrap();
        storage.save_key("anthropic", "v").await.unwrap();
        assert_eq!(storage.list_keys().await.unwrap(), vec!["anthropic".to_string(), "zebra".to_string()]);
    }

    #[tokio::test]
    async fn functional_singleton_accessor_returns_same_instance_until_reset() {
        reset_provider_key_storage_for_tests().await;
        let first = provider_key_storage().await;
        let second = provider_key_storage().await;
        assert!(Arc::ptr_eq(&first, &second));
        reset_provider_key_storage_for_tests().await;
        let third = provider_key_storage().await;
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
