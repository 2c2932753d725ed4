//! CLI Chat Command
//!
//! Loads the config, wires a backend into a session and runs it over
//! stdin/stdout until the user submits an empty line or hits Ctrl-C.
//! Stdin is read on its own thread so an interrupt never waits for Enter.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use chatloom_config::defaults::DEFAULT_LOG_LEVEL;
use chatloom_logging::init_logger;
use chatloom_prompt::ConversationState;
use chatloom_providers::build_backend;
use chatloom_session::{ChatSession, ThreadedLines};

use crate::settings::ChatSettings;
use crate::terminal_output::note_warn;

pub async fn run(config_dir: &Path, log_level: Option<&str>, no_context: bool) -> Result<()> {
    let (config, report) = chatloom_config::load_and_prepare(config_dir).await?;

    let logging = config.logging.clone().unwrap_or_default();
    let level = log_level
        .or(logging.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    init_logger(logging.dir.as_deref().map(Path::new), level)?;

    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }

    let mut settings = ChatSettings::from_config(&config, &report)?;
    if no_context {
        settings.use_context = false;
    }

    let backend = build_backend(&settings.service, &settings.retry)?;
    let state = ConversationState::new(settings.use_context)
        .with_warn_threshold(settings.history_warn_chars);
    let mut session = ChatSession::new(backend, settings.template, settings.params, state)?;

    let mut lines = ThreadedLines::stdin()?;
    let mut stdout = std::io::stdout();

    let summary = session
        .run_until(&mut lines, &mut stdout, interrupted())
        .await?;
    info!(
        session_id = %session.id(),
        turns = summary.turns,
        backend_calls = summary.backend_calls,
        failed_calls = summary.failed_calls,
        "Chat session finished"
    );

    Ok(())
}

/// Resolves on Ctrl-C. If the handler can't be installed, never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}
