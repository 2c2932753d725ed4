use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use chatloom_core::{CompletionBackend, CompletionRequest, CompletionResponse};

use crate::chat_api;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat-completions backend.
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let body = chat_api::build_body(Some(&self.model), request);

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending request to OpenAI"
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let completion = chat_api::send(builder, "OpenAI").await?;

        Ok(CompletionResponse {
            content: completion.content,
            provider: "openai".to_string(),
            model: completion.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: completion.tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
