mod chat_cmd;
mod config_cmd;
mod settings;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use config_cmd::ConfigAction;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "chatloom")]
#[command(about = "Console chat with templated prompts and rolling context")]
#[command(version)]
struct Cli {
    /// Directory holding config.yaml and secrets.yaml (default: $CHATLOOM_CONFIG_DIR or ~/.chatloom)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log level or filter directive; overrides logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default)
    Chat {
        /// Send each input without the accumulated conversation history
        #[arg(long)]
        no_context: bool,
    },
    /// Inspect or create the config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_dir = cli.config_dir.unwrap_or_else(chatloom_config::config_dir);

    match cli.command.unwrap_or(Commands::Chat { no_context: false }) {
        Commands::Chat { no_context } => {
            chat_cmd::run(&config_dir, cli.log_level.as_deref(), no_context).await
        }
        Commands::Config { action } => config_cmd::run(&config_dir, action).await,
    }
}
