//! SecureStore: the credential-storage core every other credential
//! subsystem in the agent is built on.
//!
//! Composes an OS-keyring capability with an encrypted on-disk fallback,
//! enforces a per-instance fallback policy, classifies lower-layer errors
//! into a closed taxonomy, and emits structured observability records that
//! never carry secret values.

pub mod envelope;
pub mod error;
pub mod fallback_store;
pub mod keyring_capability;
pub mod observability;
pub mod prober;
pub mod store;

pub use envelope::{CryptoParams, Envelope, ENVELOPE_VERSION};
pub use error::{SecureStoreError, SecureStoreErrorCode};
pub use fallback_store::{validate_key, FallbackStore};
pub use keyring_capability::{
    load_default_keyring_capability, InMemoryKeyringCapability, KeyringCapability, KeyringCapabilityError,
    OsKeyringCapability,
};
pub use observability::{OperationKind, Route, SecureStoreEvent};
pub use prober::AvailabilityProber;
pub use store::{FallbackPolicy, SecureStore};
