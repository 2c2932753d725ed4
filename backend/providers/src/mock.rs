use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use chatloom_core::{CompletionBackend, CompletionRequest, CompletionResponse};

use crate::error::ProviderError;

enum Outcome {
    Reply(String),
    Fail(String),
    Status(u16, String),
}

/// A backend that replays scripted outcomes and records every prompt it sees.
///
/// Once the script runs out it falls back to the fixed response, or echoes
/// the prompt when none is set.
pub struct MockBackend {
    name: String,
    fixed_response: Option<String>,
    script: Mutex<VecDeque<Outcome>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Queue a successful completion.
    pub fn then_reply(self, content: impl Into<String>) -> Self {
        self.push(Outcome::Reply(content.into()));
        self
    }

    /// Queue an untyped failure, which is never retried.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Outcome::Fail(message.into()));
        self
    }

    /// Queue an HTTP status failure, as the real backends report it.
    pub fn then_fail_status(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Outcome::Status(status, body.into()));
        self
    }

    fn push(&self, outcome: Outcome) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match scripted {
            Some(Outcome::Reply(content)) => content,
            Some(Outcome::Fail(message)) => return Err(anyhow!(message)),
            Some(Outcome::Status(status, body)) => {
                return Err(ProviderError::Status {
                    provider: self.name.clone(),
                    status,
                    body,
                }
                .into())
            }
            None => self
                .fixed_response
                .clone()
                .unwrap_or_else(|| request.prompt.clone()),
        };

        Ok(CompletionResponse {
            content,
            provider: self.name.clone(),
            model: "mock".to_string(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloom_core::GenerationParams;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest::new(prompt, GenerationParams::default())
    }

    #[tokio::test]
    async fn replays_script_then_falls_back() {
        let mock = MockBackend::new("mock")
            .with_response("fallback")
            .then_reply("first")
            .then_fail("quota exceeded");

        assert_eq!(mock.complete(&request("a")).await.unwrap().content, "first");
        let err = mock.complete(&request("b")).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(mock.complete(&request("c")).await.unwrap().content, "fallback");
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn status_failures_are_typed() {
        let mock = MockBackend::new("mock").then_fail_status(429, "slow down");
        let err = mock.complete(&request("a")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::Status { status: 429, .. })
        ));
        assert_eq!(err.to_string(), "mock returned 429: slow down");
    }

    #[tokio::test]
    async fn echoes_without_fixed_response() {
        let mock = MockBackend::new("echo");
        let resp = mock.complete(&request("ping")).await.unwrap();
        assert_eq!(resp.content, "ping");
        assert_eq!(resp.provider, "echo");
    }
}
