use std::path::PathBuf;

/// Ephemeral auth-related settings sourced from a loaded profile.
///
/// Profile bootstrap must not resolve named-key references itself; it only
/// carries them as metadata so the resolver remains the single place where
/// named-key resolution happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileAuthFields {
    pub auth_key_name: Option<String>,
    pub auth_keyfile: Option<PathBuf>,
    pub auth_key: Option<String>,
}
