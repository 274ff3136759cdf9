//! Named provider API keys, built on `llxprt-securestore`.
//!
//! [`storage::ProviderKeyStorage`] is a thin validating wrapper over
//! `SecureStore` in the `llxprt-code-provider-keys` namespace. A
//! hypothetical `ToolKeyStorage` against `llxprt-code-tool-keys` would be
//! built the exact same way, which is the point: `SecureStore` is generic
//! over service namespace and fallback directory, and every credential
//! subsystem in the agent is a thin wrapper like this one.
//!
//! [`commands`] implements the `/key` command surface
//! (`save|load|show|list|delete` plus the legacy raw-key passthrough) on
//! top of [`storage`].

pub mod commands;
pub mod interactive;
pub mod storage;

pub use commands::{complete_key_names, execute_key_command, KeyCommandOutcome};
pub use interactive::{AlwaysConfirm, InteractivePrompt, NonInteractive};
pub use storage::{
    provider_key_storage, reset_provider_key_storage_for_tests, ProviderKeyError, ProviderKeyStorage,
    ProviderKeyValidationError,
};
