//! psql-transporter: refresh PostgreSQL databases through pg_dump and psql

mod cli;
mod logging;
mod terminal;

use anyhow::{Context, bail};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use transporter_config::{ConfigFile, DEFAULT_FILE_NAME, KeyringStore, SecretStore, ensure_file};
use transporter_core::{Orchestrator, TransferOutcome};

use crate::cli::{Cli, Command, SecretAction};
use crate::logging::LoggingConfig;
use crate::terminal::TerminalPresenter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::default()
        .with_filter(cli.log_level.clone())
        .with_log_dir(cli.log_directory());
    if let Err(e) = logging::init(logging) {
        eprintln!("FATAL: Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    match run(cli, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "psql-transporter failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C cancels the running transfer. The in-flight tool is terminated
/// and a pending prompt returns an error.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling transfer");
            eprintln!("\nInterrupted, stopping...");
            token.cancel();
        }
    });
}

async fn run(cli: Cli, token: CancellationToken) -> anyhow::Result<()> {
    let config_path = config_path(&cli)?;
    if ensure_file(&config_path)? {
        println!("Created default config at {}", config_path.display());
        println!("Edit it and re-run.");
        return Ok(());
    }

    let config = ConfigFile::load(&config_path)?;
    let secrets = KeyringStore::new();

    if let Some(Command::Secret { action }) = &cli.command {
        return manage_secret(&config, &secrets, action, std::io::stdin().lock());
    }

    let catalog = config.catalog(&secrets)?;
    let settings = cli.apply_overrides(config.transfer_settings());
    let tools = config.pg_tools(settings.poll_interval);
    let preset = cli.preset(&catalog)?;

    tracing::info!(
        config = %config_path.display(),
        sources = catalog.len(),
        dump_path = %settings.dump_path.display(),
        "configuration loaded"
    );

    let presenter = TerminalPresenter::new(token.clone());
    let mut orchestrator = Orchestrator::new(Arc::new(tools), settings);
    let outcome = orchestrator
        .execute(&catalog, preset, &presenter, token)
        .await
        .context("transfer did not complete")?;

    match outcome {
        TransferOutcome::Completed { artifact } => {
            tracing::info!(artifact = ?artifact, "transfer completed");
        }
        TransferOutcome::Aborted => tracing::info!("transfer aborted by operator"),
    }
    Ok(())
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => {
            let cwd = std::env::current_dir().context("cannot determine working directory")?;
            Ok(cwd.join(DEFAULT_FILE_NAME))
        }
    }
}

fn manage_secret(
    config: &ConfigFile,
    secrets: &dyn SecretStore,
    action: &SecretAction,
    input: impl BufRead,
) -> anyhow::Result<()> {
    match action {
        SecretAction::Set { name } => {
            require_source(config, name)?;
            eprintln!("Password for {:?} (read from stdin):", name);
            let password = read_password(input)?;
            secrets
                .set(name, &password)
                .with_context(|| format!("cannot store password for {:?}", name))?;
            println!("Stored password for {}", name);
        }
        SecretAction::Delete { name } => {
            secrets
                .delete(name)
                .with_context(|| format!("cannot delete password for {:?}", name))?;
            println!("Deleted password for {}", name);
        }
    }
    Ok(())
}

fn require_source(config: &ConfigFile, name: &str) -> anyhow::Result<()> {
    if config.source(name).is_none() {
        bail!("no source named {:?} in the config", name);
    }
    Ok(())
}

/// First line of `input` without its line ending. An empty password is an
/// error.
fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("cannot read password")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password.to_string())
}
