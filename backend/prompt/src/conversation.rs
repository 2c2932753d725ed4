//! Conversation state: the append-only transcript carried between turns.
//!
//! History grows by one `User:`/`ChatBot:` block per committed turn and is
//! never rewritten. Nothing here counts tokens; once the transcript outgrows
//! the model's context window the backend will start failing or truncating on
//! its own. The state warns once when the transcript crosses a configured size
//! so operators can see it coming.

use tracing::{debug, warn};

use crate::bindings::{Bindings, HISTORY_VAR, USER_INPUT_VAR};

/// Prefix of a user line, both in history and on the console.
pub const USER_PREFIX: &str = "User: ";

/// Prefix of a bot line, both in history and on the console.
pub const BOT_PREFIX: &str = "ChatBot: ";

/// Hook run on the history buffer after every append.
///
/// This is where a truncation or summarization strategy plugs in.
pub trait HistoryPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, history: &mut String);
}

/// Keeps every turn.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnboundedHistory;

impl HistoryPolicy for UnboundedHistory {
    fn name(&self) -> &str {
        "unbounded"
    }

    fn apply(&self, _history: &mut String) {}
}

/// History plus the current turn's input and output.
pub struct ConversationState {
    history: String,
    last_user_input: String,
    last_completion: String,
    context_enabled: bool,
    turns_recorded: usize,
    policy: Box<dyn HistoryPolicy>,
    warn_threshold: Option<usize>,
    warned: bool,
}

impl ConversationState {
    pub fn new(context_enabled: bool) -> Self {
        Self {
            history: String::new(),
            last_user_input: String::new(),
            last_completion: String::new(),
            context_enabled,
            turns_recorded: 0,
            policy: Box::new(UnboundedHistory),
            warn_threshold: None,
            warned: false,
        }
    }

    /// Warn once when history grows past `chars` characters.
    pub fn with_warn_threshold(mut self, chars: usize) -> Self {
        self.warn_threshold = Some(chars);
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn HistoryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn record_input(&mut self, text: impl Into<String>) {
        self.last_user_input = text.into();
    }

    pub fn record_completion(&mut self, text: impl Into<String>) {
        self.last_completion = text.into();
    }

    /// Bindings for the next render: `history` and `userInput`.
    pub fn current_bindings(&self) -> Bindings {
        Bindings::new()
            .with(HISTORY_VAR, self.history.as_str())
            .with(USER_INPUT_VAR, self.last_user_input.as_str())
    }

    /// Commit the last input/completion pair to history.
    ///
    /// Returns `false` without touching history when context is disabled.
    pub fn append_turn_to_history(&mut self) -> bool {
        if !self.context_enabled {
            return false;
        }

        self.history.push_str(USER_PREFIX);
        self.history.push_str(&self.last_user_input);
        self.history.push('\n');
        self.history.push_str(BOT_PREFIX);
        self.history.push_str(&self.last_completion);
        self.history.push('\n');
        self.turns_recorded += 1;

        self.policy.apply(&mut self.history);
        let history_chars = self.history.chars().count();

        debug!(
            turns = self.turns_recorded,
            history_chars,
            policy = self.policy.name(),
            "Appended turn to history"
        );

        if let Some(limit) = self.warn_threshold {
            if !self.warned && history_chars > limit {
                self.warned = true;
                warn!(
                    history_chars,
                    limit,
                    "Conversation history is large; prompts may exceed the model context window"
                );
            }
        }

        true
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn last_user_input(&self) -> &str {
        &self.last_user_input
    }

    pub fn last_completion(&self) -> &str {
        &self.last_completion
    }

    pub fn context_enabled(&self) -> bool {
        self.context_enabled
    }

    pub fn turns_recorded(&self) -> usize {
        self.turns_recorded
    }

    /// Whether the size warning has fired.
    pub fn over_warn_threshold(&self) -> bool {
        self.warned
    }
}

impl std::fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationState")
            .field("history_len", &self.history.len())
            .field("context_enabled", &self.context_enabled)
            .field("turns_recorded", &self.turns_recorded)
            .field("policy", &self.policy.name())
            .finish()
    }
}
