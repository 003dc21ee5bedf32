use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use contact_book_config::AppConfig;

mod contact;
mod shell;

use shell::Shell;

/// A contact book with labelled undo/redo history.
#[derive(Parser, Debug)]
#[command(name = "contact-book", version, about)]
struct Cli {
    /// Config file to load (created with defaults if missing).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Contact data file, overriding the config.
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Maximum number of undo steps to keep.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Read commands from a file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting contact-book");

    let config_path = cli.config.unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_or_create(&config_path);
    if let Some(depth) = cli.max_depth {
        config.history.max_depth = Some(depth);
        config.sanitize();
    }
    let data_file = cli.data_file.unwrap_or_else(|| config.data_file_path());

    let mut shell = Shell::open(config, data_file)?;
    let mut out = std::io::stdout().lock();

    match cli.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open script: {}", path.display()))?;
            shell::run(&mut shell, BufReader::new(file), &mut out, false)?;
        }
        None => {
            let stdin = std::io::stdin();
            let interactive = stdin.is_terminal();
            shell::run(&mut shell, stdin.lock(), &mut out, interactive)?;
        }
    }

    tracing::info!(
        "Exiting with {} contacts ({} undo steps discarded)",
        shell.contacts().len(),
        shell.history().undo_depth()
    );
    Ok(())
}
