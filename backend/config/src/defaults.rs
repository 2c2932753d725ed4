//! Config defaults: fills every unset field after the layers are merged.
//!
//! Generation, retry and template defaults come from the runtime types that
//! use them; only the settings with no runtime counterpart live here.

use chatloom_core::GenerationParams;
use chatloom_prompt::DEFAULT_CHAT_TEMPLATE;
use chatloom_providers::RetryPolicy;

use crate::schema::{
    ApplicationConfig, ChatConfig, CompletionConfig, LoggingConfig, RetryConfig,
};

pub const DEFAULT_USE_CONTEXT: bool = true;

/// Roughly 4k tokens of English text.
pub const DEFAULT_HISTORY_WARN_CHARS: usize = 16_000;

/// Interactive sessions keep the console quiet by default.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ChatConfig) -> ChatConfig {
    let config = apply_application_defaults(config);
    let config = apply_completion_defaults(config);
    let config = apply_retry_defaults(config);
    apply_logging_defaults(config)
}

fn apply_application_defaults(mut config: ChatConfig) -> ChatConfig {
    let app = config.application.get_or_insert_with(ApplicationConfig::default);
    app.use_context.get_or_insert(DEFAULT_USE_CONTEXT);
    app.prompt_template
        .get_or_insert_with(|| DEFAULT_CHAT_TEMPLATE.to_string());
    app.history_warn_chars.get_or_insert(DEFAULT_HISTORY_WARN_CHARS);
    config
}

fn apply_completion_defaults(mut config: ChatConfig) -> ChatConfig {
    let params = GenerationParams::default();
    let completion = config.completion.get_or_insert_with(CompletionConfig::default);
    completion.max_tokens.get_or_insert(params.max_tokens);
    completion.temperature.get_or_insert(params.temperature);
    completion.top_p.get_or_insert(params.top_p);
    config
}

fn apply_retry_defaults(mut config: ChatConfig) -> ChatConfig {
    let policy = RetryPolicy::default();
    let retry = config.retry.get_or_insert_with(RetryConfig::default);
    retry.max_attempts.get_or_insert(policy.max_attempts);
    retry.base_delay_ms.get_or_insert(policy.base_delay_ms);
    retry.backoff_factor.get_or_insert(policy.backoff_factor);
    retry.max_delay_ms.get_or_insert(policy.max_delay_ms);
    retry.jitter.get_or_insert(policy.jitter);
    config
}

fn apply_logging_defaults(mut config: ChatConfig) -> ChatConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}
