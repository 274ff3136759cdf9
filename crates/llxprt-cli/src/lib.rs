//! CLI argument models and command-text parsing for the llxprt agent.
//!
//! Exposes the clap-backed flag surface the auth-source resolver consumes
//! plus the slash-command parsing helpers the `/key` surface builds on.

pub mod cli_args;
pub mod cli_types;
pub mod command_text;
pub mod profile_auth;

pub use cli_args::Cli;
pub use cli_types::AuthSourceInputs;
pub use command_text::{parse_command, suggest_subcommand, ParsedCommand};
pub use profile_auth::ProfileAuthFields;
