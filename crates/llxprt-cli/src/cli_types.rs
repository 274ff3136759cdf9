use std::path::PathBuf;

use crate::cli_args::Cli;
use crate::profile_auth::ProfileAuthFields;

/// Plain-data snapshot of every ranked auth source the resolver may see,
/// assembled from CLI flags, a loaded profile, and the provider's
/// environment variable. Any subset of fields may be absent; the resolver
/// (in `llxprt-resolver`) is the only place that turns this into an
/// active session key.
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
    /// Assembles the resolver's input snapshot from parsed CLI flags, a
    /// loaded profile's ephemeral auth fields, and the active provider's
    /// environment variable value (resolved by the caller, since only the
    /// caller knows which provider is active).
    pub fn from_cli_and_profile(cli: &Cli, profile: &ProfileAuthFields, env_var_value: Option<String>) -> Self {
        Self {
            raw_key_from_cli: cli.key.clone(),
            key_name_from_cli: cli.key_name.clone(),
            key_name_from_profile: profile.auth_key_name.clone(),
            keyfile_from_profile: profile.auth_keyfile.clone(),
            inline_key_from_profile: profile.auth_key.clone(),
            env_var_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn unit_from_cli_and_profile_carries_every_field_through() {
        let cli = Cli::parse_from(["llxprt", "--key-name", "work"]);
        let profile = ProfileAuthFields {
            auth_key_name: None,
            auth_keyfile: Some(PathBuf::from("/etc/llxprt/key")),
            auth_key: Some("inline-value".to_string()),
        };
        let inputs = AuthSourceInputs::from_cli_and_profile(&cli, &profile, Some("env-value".to_string()));
        assert_eq!(inputs.key_name_from_cli.as_deref(), Some("work"));
        assert_eq!(inputs.keyfile_from_profile, Some(PathBuf::from("/etc/llxprt/key")));
        assert_eq!(inputs.inline_key_from_profile.as_deref(), Some("inline-value"));
        assert_eq!(inputs.env_var_value.as_deref(), Some("env-value"));
        assert!(inputs.raw_key_from_cli.is_none());
    }
}
