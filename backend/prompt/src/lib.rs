//! `chatloom-prompt`: prompt rendering and conversation context.
//!
//! Provides:
//! - `PromptTemplate`: parse-once, render-per-turn `{{$name}}` templates
//! - `Bindings`: the variable map a template is rendered against
//! - `ConversationState`: the append-only history buffer fed back into prompts

pub mod bindings;
pub mod conversation;
pub mod template;

pub use bindings::{Bindings, HISTORY_VAR, USER_INPUT_VAR};
pub use conversation::{
    ConversationState, HistoryPolicy, UnboundedHistory, BOT_PREFIX, USER_PREFIX,
};
pub use template::{PromptTemplate, Segment, DEFAULT_CHAT_TEMPLATE};
