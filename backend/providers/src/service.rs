//! Provider selection: resolves the configured AI service into a backend once,
//! so the chat session never branches on provider identity.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use chatloom_core::{ChatError, CompletionBackend};

use crate::azure::AzureOpenAiBackend;
use crate::openai::OpenAiBackend;
use crate::retry::{RetryPolicy, RetryingBackend};

/// Supported completion services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiService {
    AzureOpenAi,
    OpenAi,
}

impl AiService {
    pub const NAMES: &'static [&'static str] = &["AzureOpenAI", "OpenAI"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiService::AzureOpenAi => "AzureOpenAI",
            AiService::OpenAi => "OpenAI",
        }
    }
}

impl FromStr for AiService {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("AzureOpenAI") => Ok(AiService::AzureOpenAi),
            v if v.eq_ignore_ascii_case("OpenAI") => Ok(AiService::OpenAi),
            other => Err(ChatError::Configuration(format!(
                "Invalid AI service '{other}'. Use one of: {}",
                AiService::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for AiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to construct a backend.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub service: AiService,
    /// Model name for OpenAI, deployment name for Azure OpenAI.
    pub model: String,
    pub api_key: String,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

/// Build the configured backend, wrapped in a retry layer when the policy
/// allows more than one attempt.
pub fn build_backend(
    settings: &ServiceSettings,
    retry: &RetryPolicy,
) -> Result<Arc<dyn CompletionBackend>, ChatError> {
    if settings.api_key.trim().is_empty() {
        return Err(ChatError::Configuration(format!(
            "{} requires an API key",
            settings.service
        )));
    }
    if settings.model.trim().is_empty() {
        return Err(ChatError::Configuration(format!(
            "{} requires a chat model name",
            settings.service
        )));
    }

    let backend: Arc<dyn CompletionBackend> = match settings.service {
        AiService::OpenAi => {
            let mut backend = OpenAiBackend::new(&settings.api_key, &settings.model);
            if let Some(url) = &settings.base_url {
                backend = backend.with_base_url(url);
            }
            if let Some(timeout) = settings.timeout {
                backend = backend.with_timeout(timeout);
            }
            Arc::new(backend)
        }
        AiService::AzureOpenAi => {
            let endpoint = settings
                .azure_endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| {
                    ChatError::Configuration("AzureOpenAI requires an endpoint".to_string())
                })?;
            let mut backend =
                AzureOpenAiBackend::new(endpoint, &settings.model, &settings.api_key);
            if let Some(version) = &settings.azure_api_version {
                backend = backend.with_api_version(version);
            }
            if let Some(timeout) = settings.timeout {
                backend = backend.with_timeout(timeout);
            }
            Arc::new(backend)
        }
    };

    info!(
        service = %settings.service,
        model = %settings.model,
        max_attempts = retry.max_attempts,
        "Completion backend ready"
    );

    if retry.max_attempts > 1 {
        Ok(Arc::new(RetryingBackend::new(backend, retry.clone())))
    } else {
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(service: AiService) -> ServiceSettings {
        ServiceSettings {
            service,
            model: "gpt-4o-mini".into(),
            api_key: "sk-test".into(),
            azure_endpoint: None,
            azure_api_version: None,
            base_url: None,
            timeout: None,
        }
    }

    #[test]
    fn parses_service_names_case_insensitively() {
        assert_eq!("AzureOpenAI".parse::<AiService>().unwrap(), AiService::AzureOpenAi);
        assert_eq!("openai".parse::<AiService>().unwrap(), AiService::OpenAi);
    }

    #[test]
    fn rejects_unknown_service() {
        let err = "Bard".parse::<AiService>().unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(err.to_string().contains("Bard"));
    }

    #[test]
    fn builds_openai() {
        let backend = build_backend(&settings(AiService::OpenAi), &RetryPolicy::none()).unwrap();
        assert_eq!(backend.name(), "openai");
    }

    #[test]
    fn azure_requires_endpoint() {
        let result = build_backend(&settings(AiService::AzureOpenAi), &RetryPolicy::none());
        assert!(matches!(result, Err(ChatError::Configuration(_))));

        let mut with_endpoint = settings(AiService::AzureOpenAi);
        with_endpoint.azure_endpoint = Some("https://contoso.openai.azure.com".into());
        let backend = build_backend(&with_endpoint, &RetryPolicy::default()).unwrap();
        assert_eq!(backend.name(), "azure-openai");
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let mut s = settings(AiService::OpenAi);
        s.api_key = String::new();
        assert!(matches!(
            build_backend(&s, &RetryPolicy::none()),
            Err(ChatError::Configuration(_))
        ));
    }
}
