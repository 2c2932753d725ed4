//! Resolve a validated config into the values a chat session is built from.

use std::time::Duration;

use chatloom_config::defaults::{DEFAULT_HISTORY_WARN_CHARS, DEFAULT_USE_CONTEXT};
use chatloom_config::{ChatConfig, ValidationReport};
use chatloom_core::{ChatError, GenerationParams};
use chatloom_prompt::PromptTemplate;
use chatloom_providers::{AiService, RetryPolicy, ServiceSettings};

/// Everything needed to start a chat session.
#[derive(Debug)]
pub struct ChatSettings {
    pub service: ServiceSettings,
    pub retry: RetryPolicy,
    pub params: GenerationParams,
    pub template: PromptTemplate,
    pub use_context: bool,
    pub history_warn_chars: usize,
}

impl ChatSettings {
    /// Fails with a configuration error if validation found any errors.
    pub fn from_config(config: &ChatConfig, report: &ValidationReport) -> Result<Self, ChatError> {
        if !report.is_valid() {
            return Err(ChatError::Configuration(report.error_summary()));
        }

        let service = config
            .service
            .as_ref()
            .ok_or_else(|| ChatError::Configuration("No AI service configured".to_string()))?;
        let ai_service: AiService = service.ai_service.as_deref().unwrap_or_default().parse()?;

        let application = config.application.clone().unwrap_or_default();
        let completion = config.completion.clone().unwrap_or_default();
        let retry = config.retry.clone().unwrap_or_default();
        let default_policy = RetryPolicy::default();
        let default_params = GenerationParams::default();

        Ok(Self {
            service: ServiceSettings {
                service: ai_service,
                model: service.chat_model_name.clone().unwrap_or_default(),
                api_key: service.api_key.clone().unwrap_or_default(),
                azure_endpoint: service.azure_openai_endpoint.clone(),
                azure_api_version: service.azure_api_version.clone(),
                base_url: service.base_url.clone(),
                timeout: service.timeout_secs.map(Duration::from_secs),
            },
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.unwrap_or(default_policy.max_attempts),
                base_delay_ms: retry.base_delay_ms.unwrap_or(default_policy.base_delay_ms),
                backoff_factor: retry.backoff_factor.unwrap_or(default_policy.backoff_factor),
                max_delay_ms: retry.max_delay_ms.unwrap_or(default_policy.max_delay_ms),
                jitter: retry.jitter.unwrap_or(default_policy.jitter),
            },
            params: GenerationParams {
                max_tokens: completion.max_tokens.unwrap_or(default_params.max_tokens),
                temperature: completion.temperature.unwrap_or(default_params.temperature),
                top_p: completion.top_p.unwrap_or(default_params.top_p),
            },
            template: application
                .prompt_template
                .map(PromptTemplate::parse)
                .unwrap_or_default(),
            use_context: application.use_context.unwrap_or(DEFAULT_USE_CONTEXT),
            history_warn_chars: application
                .history_warn_chars
                .unwrap_or(DEFAULT_HISTORY_WARN_CHARS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloom_config::{apply_all_defaults, validate, ServiceConfig};

    fn config(service: &str) -> ChatConfig {
        apply_all_defaults(ChatConfig {
            service: Some(ServiceConfig {
                ai_service: Some(service.into()),
                chat_model_name: Some("gpt-35-turbo".into()),
                azure_openai_endpoint: Some("https://contoso.openai.azure.com".into()),
                api_key: Some("key".into()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn resolves_defaults_into_session_values() {
        let cfg = config("AzureOpenAI");
        let settings = ChatSettings::from_config(&cfg, &validate(&cfg)).unwrap();
        assert_eq!(settings.service.service, AiService::AzureOpenAi);
        assert_eq!(settings.params, GenerationParams::default());
        assert!(settings.use_context);
        assert_eq!(settings.template.variables(), vec!["history", "userInput"]);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.template, PromptTemplate::default());
    }

    #[test]
    fn invalid_config_is_a_configuration_error() {
        let cfg = config("Bard");
        let err = ChatSettings::from_config(&cfg, &validate(&cfg)).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(err.to_string().contains("Bard"));
    }
}
