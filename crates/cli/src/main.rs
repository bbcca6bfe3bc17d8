//! promptseq CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Create the config file
//! - `run`: Execute a prompt sequence from a CSV or JSON file
//! - `gateway`: Start the HTTP API server
//! - `template`: Print the CSV template
//! - `config`: Show, locate or validate the configuration
//! - `models`: List models offered by the default provider

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use promptseq_core::message::Role;

mod commands;

#[derive(Parser)]
#[command(
    name = "promptseq",
    about = "promptseq: run ordered prompt sequences against chat-completion models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create ~/.promptseq/config.toml with defaults
    Onboard,

    /// Execute a prompt sequence
    Run(RunArgs),

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the CSV template
    Template,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List models offered by the default provider
    Models,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for problems
    Validate,
}

/// Arguments for `promptseq run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Prompt file: `.csv`, a JSON array of prompts, or a JSON request object
    pub file: PathBuf,

    /// Global context sent as a system message before every step
    #[arg(long, conflicts_with = "context_file")]
    pub context: Option<String>,

    /// Read the global context from a file
    #[arg(long)]
    pub context_file: Option<PathBuf>,

    /// Override the model of every prompt
    #[arg(long)]
    pub model: Option<String>,

    /// Override the temperature of every prompt
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Override the max tokens of every prompt
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Override the role of every prompt
    #[arg(long)]
    pub role: Option<Role>,

    /// Override useMemory on every prompt (true/false)
    #[arg(long)]
    pub use_memory: Option<bool>,

    /// Override predecessor on every prompt (true/false)
    #[arg(long)]
    pub predecessor: Option<bool>,

    /// Execute only the N-th prompt (1-based), on its own
    #[arg(long)]
    pub step: Option<usize>,

    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Template => commands::template::run(),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Models => commands::models::run().await?,
    }

    Ok(())
}
