use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod app;
mod cli;
mod commands;
mod config;
mod dispatch;
mod integration;
mod integrations;
mod observability;
mod storage;
mod submission;

use cli::{Cli, Commands, OutputFormat};
use config::{Config, LogLevel};

fn setup_logging(log_level: LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formbridge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("formbridge.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.to_level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => commands::init::run(path, force),
        Commands::Integration { action } => commands::integration::run(action, &config),
        Commands::Form { action } => commands::form::run(action, &config),
        Commands::Settings { action } => commands::settings::run(action, &config),
        Commands::Submit {
            form_id,
            submission_id,
            payload,
            format,
        } => commands::submit::run(
            form_id.as_deref(),
            submission_id.as_deref(),
            payload.as_deref(),
            OutputFormat::resolve(format),
            &config,
        ),
        Commands::Log { action } => commands::log::run(action, &config),
        Commands::Status { format } => commands::status::run(OutputFormat::resolve(format), &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // --verbose raises the level to at least debug
    let log_level = if cli.verbose && config.log_level.to_level_filter() < log::LevelFilter::Debug {
        LogLevel::Debug
    } else {
        config.log_level
    };
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("Starting formbridge with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
