//! CLI Config Command
//!
//! `config show` prints the effective config with secrets masked,
//! `config check` validates it and `config init` writes a starter file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use chatloom_config::{
    apply_all_defaults, collect_redacted_paths, collect_referenced_vars, config_file_path,
    load_and_prepare, load_layers, redact, write_config, ChatConfig, ServiceConfig,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn, render_findings};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Validate the config and report problems
    Check,
    /// Write a starter config file
    Init {
        /// Overwrite an existing config (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(config_dir: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(config_dir).await,
        ConfigAction::Check => check(config_dir).await,
        ConfigAction::Init { force } => init(config_dir, force).await,
    }
}

/// Env references stay unresolved so nothing from the environment is echoed.
async fn show(config_dir: &Path) -> Result<()> {
    let value = load_layers(config_dir).await?;
    let config: ChatConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let effective = serde_json::to_value(apply_all_defaults(config))?;

    let masked = collect_redacted_paths(&effective);
    let env_vars = collect_referenced_vars(&effective);
    print!("{}", serde_yaml::to_string(&redact(&effective))?);
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }
    if !env_vars.is_empty() {
        note_info(&format!("Read from the environment: {}", env_vars.join(", ")));
    }
    Ok(())
}

async fn check(config_dir: &Path) -> Result<()> {
    let (_, report) = load_and_prepare(config_dir).await?;

    if !report.warnings.is_empty() {
        note_warn(&format!("{} warning(s)", report.warnings.len()));
        eprint!("{}", render_findings(&findings(&report.warnings)));
    }
    if !report.is_valid() {
        note_error(&format!("{} error(s)", report.errors.len()));
        eprint!("{}", render_findings(&findings(&report.errors)));
        bail!("Config at {} is invalid", config_dir.display());
    }

    note_success("Config is valid");
    Ok(())
}

fn findings(items: &[chatloom_config::ConfigValidationError]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|e| (e.path.clone(), e.message.clone()))
        .collect()
}

async fn init(config_dir: &Path, force: bool) -> Result<()> {
    let path = config_file_path(config_dir);
    if !force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    write_config(&starter_config(), &path).await?;
    note_success(&format!("Wrote {}", path.display()));
    note_info("Export OPENAI_API_KEY, or put the key in secrets.yaml next to it");
    Ok(())
}

/// OpenAI with the key taken from the environment; everything else defaulted.
fn starter_config() -> ChatConfig {
    apply_all_defaults(ChatConfig {
        service: Some(ServiceConfig {
            ai_service: Some("OpenAI".into()),
            chat_model_name: Some("gpt-4o-mini".into()),
            api_key: Some("${OPENAI_API_KEY}".into()),
            ..Default::default()
        }),
        ..Default::default()
    })
}
