//! `chatloom-config`: configuration management.
//!
//! Provides:
//! - Typed config schema (service, application, completion, retry, logging)
//! - YAML read/write with a secrets overlay and backup rotation
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{
    config_dir, config_file_path, json_merge_patch, load_layers, secrets_file_path, write_config,
};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    ApplicationConfig, ChatConfig, CompletionConfig, LoggingConfig, RetryConfig, ServiceConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load both layers, substitute env vars, apply defaults, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged and returned; the caller decides whether they are fatal.
pub async fn load_and_prepare(config_dir: &Path) -> Result<(ChatConfig, ValidationReport)> {
    let value = load_layers(config_dir).await?;

    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: ChatConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepares_layered_config() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            config_file_path(dir.path()),
            "service:\n  aiService: OpenAI\n  chatModelName: gpt-4o-mini\napplication:\n  useContext: false\n",
        )
        .await
        .unwrap();
        tokio::fs::write(secrets_file_path(dir.path()), "service:\n  apiKey: sk-secret\n")
            .await
            .unwrap();

        let (config, report) = load_and_prepare(dir.path()).await.unwrap();

        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(config.application.as_ref().unwrap().use_context, Some(false));
        assert_eq!(config.completion.as_ref().unwrap().max_tokens, Some(2000));
        assert_eq!(config.service.unwrap().api_key.as_deref(), Some("sk-secret"));
    }

    #[tokio::test]
    async fn empty_directory_reports_missing_service() {
        let dir = tempfile::tempdir().unwrap();
        let (_, report) = load_and_prepare(dir.path()).await.unwrap();
        assert!(!report.is_valid());
    }
}
