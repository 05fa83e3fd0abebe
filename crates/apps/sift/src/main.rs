//! sift - sweep unread Gmail
//!
//! Lists unread inbox mail, runs the configured action on messages from
//! allow-listed senders, then marks everything it listed as read.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use mail::{
    GmailAuth, GmailClient, GmailCredentials, Sweep, SweepConfig, TokenStore, action_from_config,
};
use std::path::Path;

mod cli;

use cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();

    match cli.resolved_command() {
        Command::Init => init_config(cli.config.as_deref()),
        Command::Run { dry_run } => {
            let sweep_config = load_sweep_config(cli.config.as_deref(), true)?;
            run_sweep(&cli, &sweep_config, dry_run)
        }
        Command::Login => {
            let sweep_config = load_sweep_config(cli.config.as_deref(), false)?;
            let auth = build_auth(&cli, &sweep_config)?;
            auth.login().context("Gmail authentication failed")?;
            info!("Token cached at {}", auth.token_store().path().display());
            Ok(())
        }
        Command::Logout => {
            let sweep_config = load_sweep_config(cli.config.as_deref(), false)?;
            let store = token_store(&sweep_config)?;
            store.clear()?;
            info!("Removed {}", store.path().display());
            Ok(())
        }
        Command::Status => {
            let sweep_config = load_sweep_config(cli.config.as_deref(), false)?;
            let auth = build_auth(&cli, &sweep_config)?;
            if auth.is_authenticated() {
                println!("Authenticated ({})", auth.token_store().path().display());
            } else {
                println!("Not authenticated; run `sift login`");
            }
            Ok(())
        }
        Command::Labels => {
            let sweep_config = load_sweep_config(cli.config.as_deref(), false)?;
            let client = GmailClient::connect(build_auth(&cli, &sweep_config)?, &sweep_config.user_id)?;
            for label in client.list_labels()? {
                println!(
                    "{:<24} {} ({})",
                    label.id,
                    label.name,
                    label.label_type.as_deref().unwrap_or("user")
                );
            }
            Ok(())
        }
    }
}

fn run_sweep(cli: &Cli, sweep_config: &SweepConfig, dry_run: bool) -> Result<()> {
    if sweep_config.senders.is_empty() {
        warn!("Allow-list is empty; every unread message will just be marked read");
    }

    let action = action_from_config(&sweep_config.action);
    let report = Sweep::new(sweep_config, action.as_ref())
        .dry_run(dry_run)
        .connect_and_run(|| {
            let auth = build_auth(cli, sweep_config)?;
            GmailClient::connect(auth, &sweep_config.user_id)
        })?;

    if dry_run {
        for record in &report.outcome.senders {
            let marker = if sweep_config.senders.contains(&record.sender) {
                "*"
            } else {
                " "
            };
            println!("{} {} {}", marker, record.message_id, record.sender);
        }
    }
    Ok(())
}

/// Load the sweep config; when not `required`, a missing default file yields defaults
fn load_sweep_config(path: Option<&Path>, required: bool) -> Result<SweepConfig> {
    let exists = match path {
        Some(p) => p.exists(),
        None => SweepConfig::default_path().is_some_and(|p| p.exists()),
    };

    if !exists && (required || path.is_some()) {
        let shown = path
            .map(Path::to_path_buf)
            .or_else(SweepConfig::default_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "sift.json".to_string());
        anyhow::bail!("No sweep config at {}; run `sift init` and edit it", shown);
    }

    if exists {
        SweepConfig::load(path)
    } else {
        Ok(SweepConfig::default())
    }
}

fn token_store(sweep_config: &SweepConfig) -> Result<TokenStore> {
    match &sweep_config.token_file {
        Some(path) => Ok(TokenStore::new(path)),
        None => TokenStore::default_location(),
    }
}

fn build_auth(cli: &Cli, sweep_config: &SweepConfig) -> Result<GmailAuth> {
    let credentials_path = cli
        .credentials
        .as_deref()
        .or(sweep_config.credentials_file.as_deref());

    let credentials = GmailCredentials::load(credentials_path).inspect_err(|_| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            warn!(
                "To configure Gmail access, either:\n\
                 1. Place your Google OAuth credentials at: {}\n\
                 2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                path.display()
            );
        }
    })?;

    Ok(GmailAuth::new(credentials, token_store(sweep_config)?))
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => SweepConfig::default_path().context("Could not determine config directory")?,
    };

    if target.exists() {
        anyhow::bail!("{} already exists; not overwriting", target.display());
    }

    config::save_json_file(&target, &SweepConfig::template())?;
    println!("Wrote template config to {}", target.display());
    Ok(())
}
