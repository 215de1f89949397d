use std::path::PathBuf;

use crate::cancel::CancelToken;

/// Options for driving one generation turn.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Maximum number of agentic turns the backend may take.
    pub max_turns: u32,
    /// Working directory inside the sandbox project tree.
    pub cwd: PathBuf,
    /// Override for the backend's system prompt. When `None`, backends
    /// derive one from the request via `render_system_prompt`.
    pub system_prompt: Option<String>,
    /// Set on continue/repair turns: the backend must not open a new plan,
    /// it picks up where the previous turn stopped.
    pub skip_plan: bool,
    /// Cancellation handle for this turn.
    pub cancel: CancelToken,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_turns: 50,
            cwd: PathBuf::from("/"),
            system_prompt: None,
            skip_plan: false,
            cancel: CancelToken::new(),
        }
    }
}
