use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "llxprt",
    about = "Multi-provider LLM coding agent",
    version
)]
/// Top-level flags consumed by the auth-source resolver.
///
/// This is the narrow slice of the agent's full flag surface relevant to
/// credential resolution; other subsystems (model selection, session
/// management, tool policy) extend this struct with their own fields.
pub struct Cli {
    #[arg(
        long,
        env = "LLXPRT_KEY",
        hide_env_values = true,
        help = "Raw API key for the active session, highest precedence"
    )]
    pub key: Option<String>,

    #[arg(
        long = "key-name",
        env = "LLXPRT_KEY_NAME",
        help = "Name of a previously saved provider key (see '/key save')"
    )]
    pub key_name: Option<String>,

    #[arg(
        long,
        env = "LLXPRT_KEYFILE",
        help = "Path to a file whose trimmed contents are the session API key"
    )]
    pub keyfile: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cli_parses_key_flags() {
        let cli = Cli::parse_from([
            "llxprt",
            "--key",
            "sk-raw",
            "--key-name",
            "work",
            "--keyfile",
            "/tmp/key.txt",
        ]);
        assert_eq!(cli.key.as_deref(), Some("sk-raw"));
        assert_eq!(cli.key_name.as_deref(), Some("work"));
        assert_eq!(cli.keyfile, Some(PathBuf::from("/tmp/key.txt")));
    }

    #[test]
    fn unit_cli_defaults_to_no_key_flags() {
        let cli = Cli::parse_from(["llxprt"]);
        assert!(cli.key.is_none());
        assert!(cli.key_name.is_none());
        assert!(cli.keyfile.is_none());
    }
}
