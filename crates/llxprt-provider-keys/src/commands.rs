use llxprt_core::mask_secret;

use crate::interactive::InteractivePrompt;
use crate::storage::{ProviderKeyError, ProviderKeyStorage};

/// The closed set of `/key` subcommands, compared case-sensitively against
/// the first whitespace-separated token so an uppercase raw key (e.g. a
/// legacy bearer token) is never hijacked as a subcommand.
const SUBCOMMANDS: [&str; 5] = ["save", "load", "show", "list", "delete"];

/// Result of dispatching one `/key` invocation. The caller applies
/// [`KeyCommandOutcome::SetEphemeralKey`] to the active provider session;
/// everything else is just text to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommandOutcome {
    Message(String),
    SetEphemeralKey(String),
    Error(String),
}

impl KeyCommandOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Message(text) | Self::Error(text) => text,
            Self::SetEphemeralKey(_) => "",
        }
    }
}

fn not_found_message(name: &str) -> String {
    format!("Key '{name}' not found. Use '/key list' to see saved keys.")
}

fn store_error_outcome(error: ProviderKeyError) -> KeyCommandOutcome {
    KeyCommandOutcome::Error(error.user_message())
}

/// Dispatches a trimmed `/key` argument string. Parsing splits on
/// whitespace and compares the first token case-sensitively against the
/// closed subcommand set; on no match (including empty input), legacy
/// behavior applies: empty input reports current-provider key status,
/// nonempty input is treated as a raw key to set for the session.
pub async fn execute_key_command(
    args: &str,
    storage: &ProviderKeyStorage,
    prompt: &dyn InteractivePrompt,
) -> KeyCommandOutcome {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return KeyCommandOutcome::Message(
            "No session API key is set. Use '/key save <name> <apikey>' to store one.".to_string(),
        );
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first_token = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    if !SUBCOMMANDS.contains(&first_token) {
        // Legacy passthrough: the whole argument string is a raw key.
        return KeyCommandOutcome::SetEphemeralKey(trimmed.to_string());
    }

    match first_token {
        "save" => execute_save(rest, storage, prompt).await,
        "load" => execute_load(rest, storage).await,
        "show" => execute_show(rest, storage).await,
        "list" => execute_list(storage).await,
        "delete" => execute_delete(rest, storage, prompt).await,
        _ => unreachable!("first_token was checked against SUBCOMMANDS above"),
    }
}

async fn execute_save(
    rest: &str,
    storage: &ProviderKeyStorage,
    prompt: &dyn InteractivePrompt,
) -> KeyCommandOutcome {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().trim();
    let apikey = parts.next().map(str::trim).unwrap_or_default();

    if apikey.is_empty() {
        return KeyCommandOutcome::Error("API key value cannot be empty.".to_string());
    }

    match storage.has_key(name).await {
        Ok(true) => {
            if !prompt.is_interactive() {
                return KeyCommandOutcome::Error(format!(
                    "Key '{name}' already exists. Re-run interactively to confirm overwrite."
                ));
            }
            if !prompt.confirm(&format!("Overwrite existing key '{name}'?")) {
                return KeyCommandOutcome::Message(format!("Kept existing key '{name}'."));
            }
        }
        Ok(false) => {}
        Err(error) => return store_error_outcome(error),
    }

    match storage.save_key(name, apikey).await {
        Ok(()) => KeyCommandOutcome::Message(format!("Saved key '{name}': {}", mask_secret(apikey))),
        Err(error) => store_error_outcome(error),
    }
}

async fn execute_load(name: &str, storage: &ProviderKeyStorage) -> KeyCommandOutcome {
    match storage.get_key(name).await {
        Ok(Some(value)) => KeyCommandOutcome::SetEphemeralKey(value),
        Ok(None) => KeyCommandOutcome::Error(not_found_message(name)),
        Err(error) => store_error_outcome(error),
    }
}

async fn execute_show(name: &str, storage: &ProviderKeyStorage) -> KeyCommandOutcome {
    match storage.get_key(name).await {
        Ok(Some(value)) => {
            KeyCommandOutcome::Message(format!("{name}: {} ({} chars)", mask_secret(&value), value.chars().count()))
        }
        Ok(None) => KeyCommandOutcome::Error(not_found_message(name)),
        Err(error) => store_error_outcome(error),
    }
}

async fn execute_list(storage: &ProviderKeyStorage) -> KeyCommandOutcome {
    match storage.list_keys().await {
        Ok(names) if names.is_empty() => {
            KeyCommandOutcome::Message("No provider keys saved yet.".to_string())
        }
        Ok(names) => {
            let mut lines = Vec::with_capacity(names.len());
            for name in &names {
                match storage.get_key(name).await {
                    Ok(Some(value)) => lines.push(format!("{name}: {}", mask_secret(&value))),
                    Ok(None) => lines.push(format!("{name}: <unavailable>")),
                    Err(error) => return store_error_outcome(error),
                }
            }
            KeyCommandOutcome::Message(lines.join("\n"))
        }
        Err(error) => store_error_outcome(error),
    }
}

async fn execute_delete(
    name: &str,
    storage: &ProviderKeyStorage,
    prompt: &dyn InteractivePrompt,
) -> KeyCommandOutcome {
    match storage.has_key(name).await {
        Ok(false) => return KeyCommandOutcome::Error(not_found_message(name)),
        Ok(true) => {}
        Err(error) => return store_error_outcome(error),
    }

    if !prompt.is_interactive() {
        return KeyCommandOutcome::Error(format!(
            "Deleting '{name}' requires an interactive session to confirm."
        ));
    }
    if !prompt.confirm(&format!("Delete key '{name}'?")) {
        return KeyCommandOutcome::Message(format!("Kept key '{name}'."));
    }

    match storage.delete_key(name).await {
        Ok(true) => KeyCommandOutcome::Message(format!("Deleted key '{name}'")),
        Ok(false) => KeyCommandOutcome::Error(not_found_message(name)),
        Err(error) => store_error_outcome(error),
    }
}

/// Autocomplete source for `load`/`show`/`delete`/`save`: always the
/// current saved names, `save` included so users see overwrite candidates.
/// Never returns an error — completion must not disrupt typing, so any
/// storage failure yields an empty completion set.
pub async fn complete_key_names(storage: &ProviderKeyStorage) -> Vec<String> {
    storage.list_keys().await.unwrap_or_default()
}
