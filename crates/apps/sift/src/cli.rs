//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Act on unread Gmail from allow-listed senders, then mark the inbox read", long_about = None)]
pub struct Cli {
    /// Sweep config file (defaults to ~/.config/sift/sift.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// OAuth client secret JSON (overrides the config file)
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sweep the unread inbox (default)
    Run {
        /// List and filter only; don't run the action or mark anything read
        #[arg(long)]
        dry_run: bool,
    },

    /// Authenticate with Gmail and cache the token
    Login,

    /// Delete the cached token
    Logout,

    /// Report whether a usable token is cached
    Status,

    /// List label IDs, for configuring the add_label action
    Labels,

    /// Write a template sweep config
    Init,
}

impl Cli {
    /// The subcommand to run, `run` when none was given
    pub fn resolved_command(&self) -> Command {
        self.cmd.clone().unwrap_or(Command::Run { dry_run: false })
    }
}
