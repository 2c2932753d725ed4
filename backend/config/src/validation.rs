//! Config validation: field-level checks with user-friendly messages.

use crate::schema::ChatConfig;
use chatloom_providers::AiService;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors joined into a single diagnostic line.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ChatConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_service(config, &mut report);
    validate_application(config, &mut report);
    validate_completion(config, &mut report);
    validate_retry(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}

/// The service block must name a supported provider and carry its credentials.
fn validate_service(config: &ChatConfig, report: &mut ValidationReport) {
    let Some(service) = &config.service else {
        report.error("service", "No AI service configured");
        return;
    };

    match service.ai_service.as_deref().map(str::trim) {
        None | Some("") => report.error("service.aiService", "AI service is required"),
        Some(name) => match name.parse::<AiService>() {
            Err(_) => report.error(
                "service.aiService",
                format!(
                    "Invalid AI service '{name}'. Use one of: {}",
                    AiService::NAMES.join(", ")
                ),
            ),
            Ok(AiService::AzureOpenAi) if is_blank(&service.azure_openai_endpoint) => {
                report.error(
                    "service.azureOpenAIEndpoint",
                    "Endpoint is required for AzureOpenAI",
                );
            }
            Ok(_) => {}
        },
    }

    if is_blank(&service.chat_model_name) {
        report.error("service.chatModelName", "Chat model name is required");
    }
    if is_blank(&service.api_key) {
        report.error("service.apiKey", "API key is required");
    }
    if service.timeout_secs == Some(0) {
        report.error("service.timeoutSecs", "timeoutSecs must be > 0");
    }
}

/// The template should reference the conversation variables it is fed.
fn validate_application(config: &ChatConfig, report: &mut ValidationReport) {
    let Some(app) = &config.application else { return };
    let Some(template) = &app.prompt_template else { return };

    if !template.contains("$userInput") {
        report.warn(
            "application.promptTemplate",
            "Template never references {{$userInput}}; user input will not reach the model",
        );
    }
    if app.use_context.unwrap_or(true) && !template.contains("$history") {
        report.warn(
            "application.promptTemplate",
            "useContext is on but the template never references {{$history}}",
        );
    }
    if app.history_warn_chars == Some(0) {
        report.warn(
            "application.historyWarnChars",
            "historyWarnChars is 0; the context-size warning fires on the first turn",
        );
    }
}

fn validate_completion(config: &ChatConfig, report: &mut ValidationReport) {
    let Some(completion) = &config.completion else { return };
    if completion.max_tokens == Some(0) {
        report.error("completion.maxTokens", "maxTokens must be >= 1");
    }
    if let Some(t) = completion.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("completion.temperature", format!("temperature {t} is outside [0, 2]"));
        }
    }
    if let Some(p) = completion.top_p {
        if !(p > 0.0 && p <= 1.0) {
            report.error("completion.topP", format!("topP {p} is outside (0, 1]"));
        }
    }
}

fn validate_retry(config: &ChatConfig, report: &mut ValidationReport) {
    let Some(retry) = &config.retry else { return };
    if retry.max_attempts == Some(0) {
        report.error("retry.maxAttempts", "maxAttempts must be >= 1");
    }
    if let Some(factor) = retry.backoff_factor {
        if factor < 1.0 {
            report.warn("retry.backoffFactor", "backoffFactor below 1 shrinks delays");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ApplicationConfig, CompletionConfig, ServiceConfig};

    fn openai() -> ServiceConfig {
        ServiceConfig {
            ai_service: Some("OpenAI".into()),
            chat_model_name: Some("gpt-4o-mini".into()),
            api_key: Some("sk-test".into()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_openai_config_is_valid() {
        let cfg = ChatConfig {
            service: Some(openai()),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn missing_service_is_error() {
        let report = validate(&ChatConfig::default());
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "service");
    }

    #[test]
    fn unknown_service_is_error() {
        let cfg = ChatConfig {
            service: Some(ServiceConfig {
                ai_service: Some("Bard".into()),
                ..openai()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.error_summary().contains("Invalid AI service 'Bard'"));
    }

    #[test]
    fn azure_needs_endpoint() {
        let cfg = ChatConfig {
            service: Some(ServiceConfig {
                ai_service: Some("AzureOpenAI".into()),
                ..openai()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "service.azureOpenAIEndpoint");
    }

    #[test]
    fn out_of_range_sampling_is_error() {
        let cfg = ChatConfig {
            service: Some(openai()),
            completion: Some(CompletionConfig {
                temperature: Some(3.5),
                top_p: Some(0.0),
                max_tokens: Some(0),
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert_eq!(report.errors.len(), 3, "errors: {:?}", report.errors);
    }

    #[test]
    fn template_without_history_warns_when_context_on() {
        let cfg = ChatConfig {
            service: Some(openai()),
            application: Some(ApplicationConfig {
                use_context: Some(true),
                prompt_template: Some("User: {{$userInput}}\nChatBot:".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("$history"));
    }
}
