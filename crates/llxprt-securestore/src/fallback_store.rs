use std::path::{Path, PathBuf};

use llxprt_core::{ensure_dir_with_mode, write_bytes_atomic};

use crate::envelope::{self, Envelope};
use crate::error::{SecureStoreError, SecureStoreErrorCode};

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;
const FILE_SUFFIX: &str = ".enc";

/// Validates a `key` string against the path-safety rules every SecureStore
/// operation enforces before touching either backend.
pub fn validate_key(key: &str) -> Result<(), SecureStoreError> {
    if key.is_empty() {
        return Err(SecureStoreError::new(SecureStoreErrorCode::Corrupt, "key must not be empty"));
    }
    if key.contains('\0') {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            "key must not contain NUL bytes",
        ));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            format!("key '{key}' must not contain path separators"),
        ));
    }
    if key == "." || key == ".." {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            format!("key '{key}' must not be '.' or '..'"),
        ));
    }
    Ok(())
}

/// One-file-per-key on-disk store backing SecureStore when the keyring is
/// unavailable or denied.
pub struct FallbackStore {
    dir: PathBuf,
}

impl FallbackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{FILE_SUFFIX}"))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        let envelope = envelope::encode(value.as_bytes()).await?;
        let path = self.path_for(key);
        let dir = self.dir.clone();
        let serialized = serde_json::to_vec_pretty(&envelope).map_err(|error| {
            SecureStoreError::new(SecureStoreErrorCode::Corrupt, "failed to serialize envelope")
                .with_cause(anyhow::anyhow!(error))
        })?;

        tokio::task::spawn_blocking(move || -> Result<(), SecureStoreError> {
            ensure_dir_with_mode(&dir, DIR_MODE).map_err(|error| {
                SecureStoreError::new(SecureStoreErrorCode::Denied, "failed to create fallback directory")
                    .with_cause(error)
            })?;
            write_bytes_atomic(&path, &serialized, Some(FILE_MODE)).map_err(|error| {
                classify_io_error(&error, "failed to write fallback entry")
            })
        })
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "fallback write task panicked",
            ))
        })
    }

    /// Returns `Ok(None)` when no entry exists; a classified error otherwise.
    pub async fn get(&self, key: &str) -> Result<Option<String>, SecureStoreError> {
        validate_key(key)?;
        let path = self.path_for(key);

        let raw = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, SecureStoreError> {
            match std::fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(error) => Err(classify_io_error(&anyhow::anyhow!(error), "failed to read fallback entry")),
            }
        })
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "fallback read task panicked",
            ))
        })?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let parsed: Envelope = serde_json::from_slice(&raw).map_err(|error| {
            SecureStoreError::new(SecureStoreErrorCode::Corrupt, "fallback entry is not valid JSON")
                .with_cause(anyhow::anyhow!(error))
        })?;

        let plaintext = envelope::decode(parsed).await?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|error| {
                SecureStoreError::new(SecureStoreErrorCode::Corrupt, "decrypted fallback entry is not valid UTF-8")
                    .with_cause(anyhow::anyhow!(error))
            })
    }

    /// Returns `true` iff a file was actually removed.
    pub async fn delete(&self, key: &str) -> Result<bool, SecureStoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(classify_io_error(&anyhow::anyhow!(error), "failed to delete fallback entry")),
        })
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "fallback delete task panicked",
            ))
        })
    }

    /// Enumerates stored keys by normalizing `*.enc` filenames. Malformed
    /// filenames are skipped silently (see `list` in the SecureStore layer
    /// for the debug log around this).
    pub async fn list(&self) -> Result<Vec<String>, SecureStoreError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, SecureStoreError> {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(error) => {
                    return Err(classify_io_error(&anyhow::anyhow!(error), "failed to list fallback directory"))
                }
            };

            let mut keys = Vec::new();
            for entry in entries.flatten() {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let Some(key) = name.strip_suffix(FILE_SUFFIX) else {
                    continue;
                };
                if validate_key(key).is_ok() {
                    keys.push(key.to_string());
                }
            }
            Ok(keys)
        })
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "fallback list task panicked",
            ))
        })
    }
}

fn classify_io_error(error: &anyhow::Error, message: &str) -> SecureStoreError {
    let text = error.to_string().to_lowercase();
    let code = if text.contains("permission denied") {
        SecureStoreErrorCode::Denied
    } else {
        SecureStoreErrorCode::Corrupt
    };
    SecureStoreError::new(code, message.to_string()).with_cause(anyhow::anyhow!(error.to_string()))
}
