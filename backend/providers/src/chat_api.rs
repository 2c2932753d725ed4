//! Wire types for the chat-completions API shared by OpenAI and Azure OpenAI.
//!
//! The rendered prompt travels as a single `user` message; the model sees the
//! transcript as plain conversational text rather than structured turns.

use anyhow::{bail, Context, Result};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use chatloom_core::CompletionRequest;

use crate::error::ProviderError;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<RequestMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

/// Completion text extracted from a response.
#[derive(Debug)]
pub(crate) struct Completion {
    pub content: String,
    pub model: Option<String>,
    pub tokens_used: u64,
}

pub(crate) fn build_body<'a>(model: Option<&'a str>, request: &'a CompletionRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![RequestMessage {
            role: "user",
            content: &request.prompt,
        }],
        max_tokens: request.params.max_tokens,
        temperature: request.params.temperature,
        top_p: request.params.top_p,
    }
}

/// Send a prepared request and decode the first choice.
pub(crate) async fn send(builder: RequestBuilder, provider: &str) -> Result<Completion> {
    let response = builder
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        }
        .into());
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {provider} response"))?;

    extract_completion(chat_response, provider)
}

pub(crate) fn extract_completion(response: ChatResponse, provider: &str) -> Result<Completion> {
    let Some(choice) = response.choices.into_iter().next() else {
        bail!("{provider} response contained no choices");
    };

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        model: response.model,
        tokens_used: response.usage.and_then(|u| u.total_tokens).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloom_core::GenerationParams;

    #[test]
    fn body_carries_prompt_as_single_user_message() {
        let req = CompletionRequest::new("\nUser: hi\nChatBot:", GenerationParams::default());
        let body = serde_json::to_value(build_body(Some("gpt-4o-mini"), &req)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "\nUser: hi\nChatBot:");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn body_omits_model_when_absent() {
        let req = CompletionRequest::new("p", GenerationParams::default());
        let body = serde_json::to_value(build_body(None, &req)).unwrap();
        assert!(body.get("model").is_none());
    }

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
        }"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = extract_completion(resp, "openai").unwrap();
        assert_eq!(completion.content, "Hello!");
        assert_eq!(completion.tokens_used, 12);
        assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = extract_completion(resp, "azure-openai").unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn null_content_becomes_empty() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_completion(resp, "openai").unwrap().content, "");
    }
}
