mod commands;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skein_core::config::AppConfig;

#[derive(Parser)]
#[command(name = "skein", version, about = "Local LLM pipelines: chat race, gala assistant, email triage")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "skein.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Race a long completion against a CPU/RAM monitor
    Chat {
        /// Prompt to send instead of the built-in application brief
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Ask the gala assistant (the demo questions when none is given)
    Gala {
        /// A single question to ask
        #[arg(trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Classify an email as spam or legitimate and draft a reply
    Triage {
        /// JSON file with an array of {sender, subject, body} to triage concurrently
        #[arg(long)]
        batch: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skein=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "skein", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Chat { prompt } => commands::chat::run(&config, prompt).await?,
        Commands::Gala { question } => commands::gala::run(&config, question).await?,
        Commands::Triage { batch } => commands::triage::run(&config, batch).await?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
