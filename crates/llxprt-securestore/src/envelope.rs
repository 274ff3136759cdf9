use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use scrypt::Params as ScryptParams;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SecureStoreError, SecureStoreErrorCode};

pub const ENVELOPE_VERSION: u32 = 1;
const SCRYPT_LOG_N: u8 = 14; // N = 16384
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const MACHINE_KEY_CONTEXT: &str = "llxprt-securestore-machine-kek-v1";

/// Crypto parameters as they appear bit-exact in the on-disk envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoParams {
    pub alg: String,
    pub kdf: String,
    #[serde(rename = "N")]
    pub n: u32,
    pub r: u32,
    pub p: u32,
    #[serde(rename = "saltLen")]
    pub salt_len: usize,
}

impl Default for CryptoParams {
    fn default() -> Self {
        Self {
            alg: "aes-256-gcm".to_string(),
            kdf: "scrypt".to_string(),
            n: 1u32 << SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: SCRYPT_P,
            salt_len: SALT_LEN,
        }
    }
}

/// Versioned on-disk envelope. `data` is the base64 of
/// `salt || iv || authTag || ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub v: u32,
    pub crypto: CryptoParams,
    pub data: String,
}

/// Best-effort machine identity string mixed into the derived key so
/// fallback files are not portable across hosts by design.
fn machine_secret_material() -> Vec<u8> {
    let hostname = hostname::get()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());
    let home = dirs::home_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let machine_id = read_machine_id().unwrap_or_default();
    format!(
        "os={}|host={}|user={}|home={}|machine_id={}",
        std::env::consts::OS,
        hostname,
        username,
        home,
        machine_id
    )
    .into_bytes()
}

fn read_machine_id() -> Option<String> {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id", "/etc/hostid"] {
        if let Ok(value) = std::fs::read_to_string(path) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn derive_key(salt: &[u8; SALT_LEN]) -> Result<[u8; KEY_LEN], SecureStoreError> {
    let mut material = machine_secret_material();
    material.extend_from_slice(salt);

    let mut hasher = Sha256::new();
    hasher.update(MACHINE_KEY_CONTEXT.as_bytes());
    hasher.update(&material);
    let seed = hasher.finalize();

    let params = ScryptParams::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|error| {
        SecureStoreError::new(SecureStoreErrorCode::Corrupt, "invalid scrypt parameters")
            .with_cause(anyhow::anyhow!(error))
    })?;
    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(&seed, salt, &params, &mut key).map_err(|error| {
        SecureStoreError::new(SecureStoreErrorCode::Corrupt, "key derivation failed")
            .with_cause(anyhow::anyhow!(error.to_string()))
    })?;
    Ok(key)
}

fn encrypt_blocking(plaintext: &[u8]) -> Result<Envelope, SecureStoreError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut iv_bytes = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv_bytes);

    let key_bytes = derive_key(&salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&iv_bytes);

    let combined = cipher.encrypt(nonce, plaintext).map_err(|error| {
        SecureStoreError::new(SecureStoreErrorCode::Corrupt, "encryption failed")
            .with_cause(anyhow::anyhow!(error.to_string()))
    })?;
    let split_at = combined.len().saturating_sub(TAG_LEN);
    let (ciphertext, tag) = combined.split_at(split_at);

    let mut data = Vec::with_capacity(SALT_LEN + IV_LEN + TAG_LEN + ciphertext.len());
    data.extend_from_slice(&salt);
    data.extend_from_slice(&iv_bytes);
    data.extend_from_slice(tag);
    data.extend_from_slice(ciphertext);

    Ok(Envelope {
        v: ENVELOPE_VERSION,
        crypto: CryptoParams::default(),
        data: BASE64.encode(data),
    })
}

fn decrypt_blocking(envelope: &Envelope) -> Result<Vec<u8>, SecureStoreError> {
    if envelope.v != ENVELOPE_VERSION {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            format!(
                "unrecognized envelope version {}; upgrade llxprt-securestore or recreate the entry",
                envelope.v
            ),
        ));
    }

    let raw = BASE64.decode(&envelope.data).map_err(|error| {
        SecureStoreError::new(SecureStoreErrorCode::Corrupt, "envelope data is not valid base64")
            .with_cause(anyhow::anyhow!(error))
    })?;

    let min_len = envelope.crypto.salt_len + IV_LEN + TAG_LEN;
    if raw.len() < min_len {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            "envelope data is shorter than the declared crypto layout",
        ));
    }

    let (salt_slice, rest) = raw.split_at(envelope.crypto.salt_len);
    let (iv_slice, rest) = rest.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut salt = [0u8; SALT_LEN];
    if salt_slice.len() != SALT_LEN {
        return Err(SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            "envelope salt length does not match the expected scrypt salt length",
        ));
    }
    salt.copy_from_slice(salt_slice);

    let key_bytes = derive_key(&salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(iv_slice);

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher.decrypt(nonce, combined.as_ref()).map_err(|_| {
        SecureStoreError::new(
            SecureStoreErrorCode::Corrupt,
            "authentication tag mismatch; the entry is corrupt or the machine binding changed",
        )
    })
}

/// Encrypts `plaintext` into a fresh envelope. Scrypt derivation and AES-GCM
/// encryption are both CPU-bound, so the whole operation runs on the
/// blocking thread pool rather than the async runtime's task queue.
pub async fn encode(plaintext: &[u8]) -> Result<Envelope, SecureStoreError> {
    let owned = plaintext.to_vec();
    tokio::task::spawn_blocking(move || encrypt_blocking(&owned))
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "envelope encryption task panicked",
            ))
        })
}

/// Decrypts an envelope back into plaintext bytes.
pub async fn decode(envelope: Envelope) -> Result<Vec<u8>, SecureStoreError> {
    tokio::task::spawn_blocking(move || decrypt_blocking(&envelope))
        .await
        .unwrap_or_else(|_| {
            Err(SecureStoreError::new(
                SecureStoreErrorCode::Corrupt,
                "envelope decryption task panicked",
            ))
        })
}
