//! Foundational low-level utilities shared across the SecureStore crates.
//!
//! Provides atomic file-write helpers, time utilities, and the secret
//! masking/fingerprinting primitives every higher layer renders through
//! rather than handling raw secret bytes itself.

pub mod atomic_io;
pub mod masking;
pub mod time_utils;

pub use atomic_io::{ensure_dir_with_mode, write_bytes_atomic, write_text_atomic};
pub use masking::{mask_secret, short_digest};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, is_expired_unix};
