use std::fmt;
use std::path::PathBuf;

use llxprt_provider_keys::ProviderKeyStorage;

/// The six ranked source kinds, ordered by precedence highest-first. The
/// discriminant order matters: [`resolve_auth_source`] walks variants in
/// declaration order via [`AuthSourceKind::PRECEDENCE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSourceKind {
    RawCliKey,
    CliKeyName,
    ProfileKeyName,
    ProfileKeyfile,
    ProfileInlineKey,
    EnvVar,
}

impl AuthSourceKind {
    pub const PRECEDENCE: [Self; 6] = [
        Self::RawCliKey,
        Self::CliKeyName,
        Self::ProfileKeyName,
        Self::ProfileKeyfile,
        Self::ProfileInlineKey,
        Self::EnvVar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawCliKey => "RAW_CLI_KEY",
            Self::CliKeyName => "CLI_KEY_NAME",
            Self::ProfileKeyName => "PROFILE_KEY_NAME",
            Self::ProfileKeyfile => "PROFILE_KEYFILE",
            Self::ProfileInlineKey => "PROFILE_INLINE_KEY",
            Self::EnvVar => "ENV_VAR",
        }
    }

    fn is_named_key_reference(self) -> bool {
        matches!(self, Self::CliKeyName | Self::ProfileKeyName)
    }
}

impl fmt::Display for AuthSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every subset of these may be present; absent fields are simply skipped
/// by the precedence walk. Values only — never pre-resolved named-key
/// lookups, which [`resolve_auth_source`] alone performs.
#[derive(Debug, Clone, Default)]
pub struct AuthSourceInputs {
    pub raw_key_from_cli: Option<String>,
    pub key_name_from_cli: Option<String>,
    pub key_name_from_profile: Option<String>,
    pub keyfile_from_profile: Option<PathBuf>,
    pub inline_key_from_profile: Option<String>,
    pub env_var_value: Option<String>,
}

impl AuthSourceInputs {
    fn raw_value_for(&self, kind: AuthSourceKind) -> Option<&str> {
        match kind {
            AuthSourceKind::RawCliKey => self.raw_key_from_cli.as_deref(),
            AuthSourceKind::ProfileInlineKey => self.inline_key_from_profile.as_deref(),
            AuthSourceKind::EnvVar => self.env_var_value.as_deref(),
            AuthSourceKind::CliKeyName
            | AuthSourceKind::ProfileKeyName
            | AuthSourceKind::ProfileKeyfile => None,
        }
    }

    fn named_key_for(&self, kind: AuthSourceKind) -> Option<&str> {
        match kind {
            AuthSourceKind::CliKeyName => self.key_name_from_cli.as_deref(),
            AuthSourceKind::ProfileKeyName => self.key_name_from_profile.as_deref(),
            _ => None,
        }
    }

    /// Whether `kind` has a present value at all, independent of how it
    /// will ultimately be materialized (used for override diagnostics).
    fn is_present(&self, kind: AuthSourceKind) -> bool {
        match kind {
            AuthSourceKind::ProfileKeyfile => self.keyfile_from_profile.is_some(),
            AuthSourceKind::CliKeyName | AuthSourceKind::ProfileKeyName => {
                self.named_key_for(kind).is_some()
            }
            _ => self.raw_value_for(kind).is_some(),
        }
    }
}

/// Display metadata for the chosen source: which kind won, and a
/// non-secret identifier (a name or path) where applicable. The value
/// itself is never carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDisplay {
    pub kind: AuthSourceKind,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuthSource {
    pub api_key: String,
    pub source: SourceDisplay,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Named key '{0}' not found. Use '/key save {0} <key>' to store it.")]
    NamedKeyNotFound(String),
    #[error("failed to read keyfile {path}: {cause}")]
    KeyfileUnreadable { path: PathBuf, cause: String },
    #[error("keyfile {0} is empty after trimming whitespace")]
    KeyfileEmpty(PathBuf),
    #[error("looking up named key '{name}' failed: {source}")]
    StoreError {
        name: String,
        #[source]
        source: llxprt_provider_keys::ProviderKeyError,
    },
    #[error("no API key source is configured (checked CLI flags, profile fields, and the environment)")]
    NoSourcePresent,
}

/// Resolves the active session API key from ranked sources. Walks
/// [`AuthSourceKind::PRECEDENCE`] and returns the first present source.
///
/// When the winning source is `CLI_KEY_NAME` or `PROFILE_KEY_NAME`, the
/// referenced name is looked up in `storage`; if absent this returns
/// [`ResolverError::NamedKeyNotFound`] immediately and does **not** fall
/// through to lower-precedence sources — a named-key miss is a
/// configuration error, not an invitation to try something else.
pub async fn resolve_auth_source(
    inputs: &AuthSourceInputs,
    storage: &ProviderKeyStorage,
) -> Result<ResolvedAuthSource, ResolverError> {
    for kind in AuthSourceKind::PRECEDENCE {
        if !inputs.is_present(kind) {
            continue;
        }

        let resolved = if kind.is_named_key_reference() {
            let name = inputs.named_key_for(kind).expect("is_present checked presence").to_string();
            match storage.get_key(&name).await {
                Ok(Some(value)) => ResolvedAuthSource {
                    api_key: value,
                    source: SourceDisplay { kind, identifier: Some(name) },
                },
                Ok(None) => {
                    tracing::debug!(source = %kind, name = %name, "named key reference not found, no fallthrough");
                    return Err(ResolverError::NamedKeyNotFound(name));
                }
                Err(error) => {
                    tracing::debug!(source = %kind, name = %name, error = %error, "named key lookup failed");
                    return Err(ResolverError::StoreError { name, source: error });
                }
            }
        } else if kind == AuthSourceKind::ProfileKeyfile {
            let path = inputs.keyfile_from_profile.clone().expect("is_present checked presence");
            let contents = tokio::fs::read_to_string(&path).await.map_err(|error| {
                ResolverError::KeyfileUnreadable { path: path.clone(), cause: error.to_string() }
            })?;
            let trimmed = contents.trim().to_string();
            if trimmed.is_empty() {
                return Err(ResolverError::KeyfileEmpty(path));
            }
            ResolvedAuthSource {
                api_key: trimmed,
                source: SourceDisplay { kind, identifier: Some(path.display().to_string()) },
            }
        } else {
            let value = inputs.raw_value_for(kind).expect("is_present checked presence").to_string();
            ResolvedAuthSource { api_key: value, source: SourceDisplay { kind, identifier: None } }
        };

        log_resolution_diagnostics(inputs, kind);
        return Ok(resolved);
    }

    Err(ResolverError::NoSourcePresent)
}

/// Emits one debug line identifying the chosen source, plus one line per
/// lower-precedence source that was present but overridden. Secret values
/// never appear in these lines, including at debug level (P9).
fn log_resolution_diagnostics(inputs: &AuthSourceInputs, chosen: AuthSourceKind) {
    tracing::debug!(source = %chosen, "auth source resolved");
    let chosen_index = AuthSourceKind::PRECEDENCE
        .iter()
        .position(|kind| *kind == chosen)
        .unwrap_or(0);
    for kind in AuthSourceKind::PRECEDENCE.into_iter().skip(chosen_index + 1) {
        if inputs.is_present(kind) {
            tracing::debug!(source = %kind, winner = %chosen, "auth source present but overridden by higher precedence");
        }
    }
}
