use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A text-completion service the chat session sends rendered prompts to.
///
/// Implementations are stateless from the session's point of view: every call
/// carries the full rendered prompt, no server-side memory is assumed.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Provider name (e.g., "openai", "azure-openai").
    fn name(&self) -> &str;

    /// Send a completion request and return the completion text.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Source of user input lines.
#[async_trait]
pub trait LineSource: Send {
    /// Read one line without its terminator. `None` means the input is exhausted.
    async fn read_line(&mut self) -> Result<Option<String>>;
}

/// Generation parameters, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.7,
            top_p: 0.5,
        }
    }
}

/// Request to a completion backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            params,
        }
    }
}

/// Response from a completion backend.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
