//! chatloom configuration schema.
//!
//! Every field is optional so partial files (and the secrets overlay) can be
//! merged before defaults are applied.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Completion service selection and credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceConfig>,

    /// Conversation behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationConfig>,

    /// Generation parameters sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionConfig>,

    /// Retry behavior for failed completion calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// "AzureOpenAI" | "OpenAI"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_service: Option<String>,

    /// Model name (OpenAI) or deployment name (Azure OpenAI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model_name: Option<String>,

    #[serde(
        default,
        rename = "azureOpenAIEndpoint",
        alias = "azureOpenAiEndpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub azure_openai_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for OpenAI-compatible proxies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Feed the running transcript back into every prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_context: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    /// History size (characters) that triggers a context-window warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_warn_chars: Option<usize>,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts per completion, including the first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// "error" | "warn" | "info" | "debug" | "trace", or any EnvFilter directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for rolling NDJSON logs; unset disables file logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_appsettings_style_yaml() {
        let raw = r#"
service:
  aiService: AzureOpenAI
  chatModelName: gpt-35-turbo
  azureOpenAIEndpoint: https://contoso.openai.azure.com/
  apiKey: "${AZURE_OPENAI_API_KEY}"
application:
  useContext: false
completion:
  maxTokens: 500
  topP: 0.9
"#;
        let cfg: ChatConfig = serde_yaml::from_str(raw).unwrap();
        let service = cfg.service.unwrap();
        assert_eq!(service.ai_service.as_deref(), Some("AzureOpenAI"));
        assert_eq!(
            service.azure_openai_endpoint.as_deref(),
            Some("https://contoso.openai.azure.com/")
        );
        assert_eq!(cfg.application.unwrap().use_context, Some(false));
        let completion = cfg.completion.unwrap();
        assert_eq!(completion.max_tokens, Some(500));
        assert_eq!(completion.temperature, None);
    }

    #[test]
    fn json_syntax_is_accepted() {
        let raw = r#"{"service": {"aiService": "OpenAI", "chatModelName": "gpt-4o-mini"}}"#;
        let cfg: ChatConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(cfg.service.unwrap().chat_model_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn empty_sections_are_not_serialized() {
        let yaml = serde_yaml::to_string(&ChatConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
