use std::fmt;

use thiserror::Error;

/// The closed taxonomy of error conditions SecureStore produces.
///
/// This is the only set of codes any operation surfaces; lower-layer errors
/// that do not match a recognizable pattern propagate unclassified instead
/// of being forced into one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecureStoreErrorCode {
    Unavailable,
    Locked,
    Denied,
    Corrupt,
    Timeout,
    NotFound,
}

impl SecureStoreErrorCode {
    /// Static, human-readable guidance keyed on the code.
    pub fn remediation(self) -> &'static str {
        match self {
            Self::Unavailable => {
                "Install or enable the native OS keyring backend, or configure the fallback policy to 'allow'."
            }
            Self::Locked => "Unlock the system keychain and retry.",
            Self::Denied => "Check OS-level file or keychain permissions and retry.",
            Self::Corrupt => "The stored entry could not be read; delete it and save the value again.",
            Self::Timeout => "The backend did not respond in time; retry the operation.",
            Self::NotFound => "No value is stored for this key.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "UNAVAILABLE",
            Self::Locked => "LOCKED",
            Self::Denied => "DENIED",
            Self::Corrupt => "CORRUPT",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Transient codes invalidate the availability probe cache immediately.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Display for SecureStoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified SecureStore failure: a taxonomy code, remediation guidance,
/// and the wrapped lower-layer cause (never the secret value itself).
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct SecureStoreError {
    pub code: SecureStoreErrorCode,
    pub message: String,
    pub cause: Option<anyhow::Error>,
}

impl SecureStoreError {
    pub fn new(code: SecureStoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn remediation(&self) -> &'static str {
        self.code.remediation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_every_code_has_nonempty_remediation() {
        let codes = [
            SecureStoreErrorCode::Unavailable,
            SecureStoreErrorCode::Locked,
            SecureStoreErrorCode::Denied,
            SecureStoreErrorCode::Corrupt,
            SecureStoreErrorCode::Timeout,
            SecureStoreErrorCode::NotFound,
        ];
        for code in codes {
            assert!(!code.remediation().is_empty());
        }
    }

    #[test]
    fn unit_only_timeout_is_transient() {
        assert!(SecureStoreErrorCode::Timeout.is_transient());
        assert!(!SecureStoreErrorCode::Unavailable.is_transient());
        assert!(!SecureStoreErrorCode::Locked.is_transient());
    }
}
