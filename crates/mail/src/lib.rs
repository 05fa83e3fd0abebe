//! Mail crate - business logic for the unread-mail sweep
//!
//! This crate provides:
//! - Gmail OAuth authentication and token cache
//! - Gmail API client behind the [`MailService`] trait
//! - Sender resolution and allow-list filtering
//! - Pluggable matched-message actions and read marking
//! - The sweep control sequence tying them together
//!
//! Everything is synchronous and runs one request at a time.

pub mod actions;
pub mod config;
pub mod filter;
pub mod gmail;
pub mod models;
pub mod service;
pub mod sweep;

pub use actions::{AddLabel, Dispatcher, LogMatches, MarkReadError, MatchedAction, action_from_config};
pub use config::{ActionConfig, GmailCredentials, MarkReadFailure, SweepConfig, UnbracketedSender};
pub use filter::{FilterOutcome, SenderError, SenderFilter, resolve_sender};
pub use gmail::{ApiError, GmailAuth, GmailClient, StoredToken, TokenStore};
pub use models::{AllowList, MessageId, SenderRecord};
pub use service::{InMemoryMailbox, MailService};
pub use sweep::{Phase, RunReport, Sweep};
