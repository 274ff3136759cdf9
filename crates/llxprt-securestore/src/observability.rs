use std::time::Duration;

use llxprt_core::short_digest;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Set,
    Get,
    Delete,
    List,
    Has,
    Probe,
}

impl OperationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Has => "has",
            Self::Probe => "probe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Keyring,
    Fallback,
}

impl Route {
    fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::Fallback => "fallback",
        }
    }
}

/// Structured record emitted for every top-level SecureStore operation. The
/// key itself is represented only as a short, non-reversible digest; the
/// value never appears here at all.
#[derive(Debug, Clone, Serialize)]
pub struct SecureStoreEvent {
    pub operation: &'static str,
    pub key_digest: Option<String>,
    pub route: Option<&'static str>,
    pub outcome: String,
    pub elapsed_ms: u128,
    pub fallback_triggered: bool,
}

pub fn emit(
    operation: OperationKind,
    key: Option<&str>,
    route: Option<Route>,
    outcome: &str,
    elapsed: Duration,
    fallback_triggered: bool,
) {
    let event = SecureStoreEvent {
        operation: operation.as_str(),
        key_digest: key.map(short_digest),
        route: route.map(Route::as_str),
        outcome: outcome.to_string(),
        elapsed_ms: elapsed.as_millis(),
        fallback_triggered,
    };
    tracing::debug!(
        operation = event.operation,
        key_digest = event.key_digest.as_deref().unwrap_or(""),
        route = event.route.unwrap_or(""),
        outcome = %event.outcome,
        elapsed_ms = event.elapsed_ms,
        fallback_triggered = event.fallback_triggered,
        "securestore_operation"
    );
}
