//! Configuration loading
//!
//! Two inputs are read at startup:
//! - OAuth client credentials (Google Cloud Console JSON, or env vars)
//! - The sweep config (`sift.json`): allow-list, labels and failure policies
//!
//! Both are built once and passed explicitly to the components that need them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::AllowList;

/// Credentials filename in the sift config directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Sweep config filename in the sift config directory
pub const SWEEP_CONFIG_FILE: &str = "sift.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. `path`, if given
    /// 2. ~/.config/sift/credentials.json
    /// 3. `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Desktop apps get "installed", web clients get "web"
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/sift/credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// What to do with a `From` header that has no `<address>` part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnbracketedSender {
    /// Use the raw header value as the sender
    #[default]
    PassThrough,
    /// Fail the run
    Reject,
}

/// What to do when marking one message read fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkReadFailure {
    /// Stop at the first failure; later messages stay unread
    #[default]
    Abort,
    /// Keep going and report every failure at the end
    Continue,
}

/// Which built-in action runs on matched messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Log the matched message IDs
    #[default]
    Log,
    /// Add a label to every matched message
    AddLabel { label_id: String },
}

/// Sweep configuration, built once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Gmail user ID; "me" is the authenticated user
    pub user_id: String,
    /// Allow-listed sender addresses
    pub senders: AllowList,
    /// Labels a message must carry to be swept
    pub labels: Vec<String>,
    /// Label removed to mark a message read
    pub unread_label: String,
    pub unbracketed_sender: UnbracketedSender,
    pub mark_read_failure: MarkReadFailure,
    /// Cap on messages listed per run; `None` lists every page
    pub max_messages: Option<usize>,
    pub action: ActionConfig,
    /// Client secret JSON; defaults to ~/.config/sift/credentials.json
    pub credentials_file: Option<PathBuf>,
    /// Token cache; defaults to ~/.config/sift/token.json
    pub token_file: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            user_id: "me".to_string(),
            senders: AllowList::default(),
            labels: vec!["INBOX".to_string(), "UNREAD".to_string()],
            unread_label: "UNREAD".to_string(),
            unbracketed_sender: UnbracketedSender::default(),
            mark_read_failure: MarkReadFailure::default(),
            max_messages: None,
            action: ActionConfig::default(),
            credentials_file: None,
            token_file: None,
        }
    }
}

impl SweepConfig {
    /// Load from `path`, or from ~/.config/sift/sift.json
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path().context("Could not determine config directory")?,
        };
        let config: Self = config::load_json_file(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse sweep config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        config::config_path(SWEEP_CONFIG_FILE)
    }

    /// A starter config for `sift init`
    pub fn template() -> Self {
        Self {
            senders: AllowList::new(["example-mail@gmail.com"]),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.user_id.is_empty(), "user_id must not be empty");
        anyhow::ensure!(!self.labels.is_empty(), "labels must name at least one label");
        anyhow::ensure!(!self.unread_label.is_empty(), "unread_label must not be empty");
        if let ActionConfig::AddLabel { label_id } = &self.action {
            anyhow::ensure!(!label_id.is_empty(), "add_label action needs a label_id");
        }
        Ok(())
    }
}
