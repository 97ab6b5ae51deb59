use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use chingu::commands;
use chingu::config::Config;

#[derive(Parser)]
#[command(name = "chingu")]
#[command(version = "0.1.0")]
#[command(about = "Chat with a friendly Korean-speaking bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use this config file instead of ~/.chingu/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat window (default)
    Chat,
    /// Ask a single question and print the reply
    Ask { prompt: String },
    /// Save the API key to the config file
    SetKey { key: String },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn env_filter(verbose: u8, floor: &str) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }

    let level = match verbose {
        0 => floor,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::new(format!("chingu={}", level))
}

/// The chat screen owns the terminal, so its logs go to a file
fn init_file_logging(config: &Config, verbose: u8) -> Result<()> {
    fs::create_dir_all(&config.chingu_home)
        .with_context(|| format!("Failed to create {}", config.chingu_home.display()))?;
    let log_path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, "info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, "warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            init_file_logging(&config, cli.verbose)?;
            commands::chat(&config).await
        }
        Commands::Ask { prompt } => {
            init_stderr_logging(cli.verbose);
            commands::ask(&config, &prompt).await
        }
        Commands::SetKey { key } => {
            init_stderr_logging(cli.verbose);
            commands::set_key(&mut config, &key)
        }
    }
}
