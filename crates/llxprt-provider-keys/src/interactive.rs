/// Abstracts session interactivity so the `/key` command handlers are
/// unit-testable without a real TTY, mirroring how [`llxprt_securestore`]
/// abstracts the OS keyring behind a capability trait rather than calling
/// platform APIs directly from business logic.
pub trait InteractivePrompt: Send + Sync {
    /// Asks the user to confirm `prompt`. Only ever called when
    /// [`Self::is_interactive`] is `true`.
    fn confirm(&self, prompt: &str) -> bool;

    /// Whether there is a user present to answer [`Self::confirm`] at all.
    fn is_interactive(&self) -> bool;
}

/// Always-confirm prompt for interactive sessions where a UI layer has
/// already obtained consent (or always will, per policy) before calling in.
pub struct AlwaysConfirm;

impl InteractivePrompt for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// Headless/CI sessions: never interactive, so any confirmation-gated
/// operation refuses rather than guessing.
pub struct NonInteractive;

impl InteractivePrompt for NonInteractive {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Test double that scripts a fixed confirmation answer.
#[cfg(any(test, feature = "test-util"))]
pub struct ScriptedPrompt {
    pub interactive: bool,
    pub confirms: bool,
}

#[cfg(any(test, feature = "test-util"))]
impl InteractivePrompt for ScriptedPrompt {
    fn confirm(&self, _prompt: &str) -> bool {
        self.confirms
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}
