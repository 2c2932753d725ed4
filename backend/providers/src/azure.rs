use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use chatloom_core::{CompletionBackend, CompletionRequest, CompletionResponse};

use crate::chat_api;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Azure OpenAI chat-completions backend, addressed by deployment name.
pub struct AzureOpenAiBackend {
    client: Client,
    endpoint: String,
    deployment: String,
    api_key: String,
    api_version: String,
    timeout: Option<Duration>,
}

impl AzureOpenAiBackend {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            timeout: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl CompletionBackend for AzureOpenAiBackend {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        // The deployment in the URL selects the model.
        let body = chat_api::build_body(None, request);

        debug!(
            deployment = %self.deployment,
            prompt_len = request.prompt.len(),
            "Sending request to Azure OpenAI"
        );

        let mut builder = self
            .client
            .post(self.url())
            .header("api-key", &self.api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let completion = chat_api::send(builder, "Azure OpenAI").await?;

        Ok(CompletionResponse {
            content: completion.content,
            provider: "azure-openai".to_string(),
            model: completion.model.unwrap_or_else(|| self.deployment.clone()),
            tokens_used: completion.tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
