use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rateme", version, about = "Rate-prompt launch tracking")]
struct Cli {
    /// Config file (defaults to ~/.config/rateme/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an application start
    Launch {
        /// Restored session; the start is not counted
        #[arg(long)]
        resumed: bool,
    },
    /// Decide whether the rate prompt is due (resets the cycle if it is)
    Check {
        /// Minimum days since install (defaults to config)
        #[arg(long)]
        min_days: Option<u32>,
        /// Minimum launches (defaults to config)
        #[arg(long)]
        min_launches: Option<u32>,
    },
    /// Show the persisted launch record
    Status,
    /// Never show the prompt again
    OptOut {
        /// Clear the opt-out flag instead
        #[arg(long)]
        undo: bool,
    },
    /// Record that the user rated the app
    Rated,
    /// Reset install date and launch count
    Clear,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Launch { resumed } => commands::prompt::launch(config_path, !resumed),
        Commands::Check {
            min_days,
            min_launches,
        } => commands::prompt::check(config_path, min_days, min_launches),
        Commands::Status => commands::prompt::status(config_path),
        Commands::OptOut { undo } => commands::prompt::opt_out(config_path, !undo),
        Commands::Rated => commands::prompt::rated(config_path),
        Commands::Clear => commands::prompt::clear(config_path),
        Commands::Config { action } => commands::config::run(config_path, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
