//! Sender filter
//!
//! Resolves each listed message to a sender address and partitions the IDs
//! into everything seen and the allow-listed subset.

use anyhow::Result;
use log::{debug, info};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::{SweepConfig, UnbracketedSender};
use crate::gmail::api::{GmailMessage, MessageRef};
use crate::models::{AllowList, MessageId, SenderRecord};
use crate::service::MailService;

static BRACKETED_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(.*?)>").expect("bracketed address pattern is valid"));

/// Per-message failures while resolving a sender
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("Message {id} has no From header")]
    MissingFrom { id: MessageId },
    #[error("Message {id} has a From header without <address>: {header:?}")]
    Unbracketed { id: MessageId, header: String },
}

/// Result of filtering one listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Every message ID observed, in listing order
    pub all: Vec<MessageId>,
    /// IDs whose sender is allow-listed, in listing order
    pub matched: Vec<MessageId>,
    /// Resolved sender for each ID in `all`
    pub senders: Vec<SenderRecord>,
}

/// Extract the bare address from a `From` header value
///
/// `Name <addr@x.com>` yields `addr@x.com`. A value without a bracketed
/// part is returned unchanged under [`UnbracketedSender::PassThrough`] and
/// yields `None` under [`UnbracketedSender::Reject`].
pub fn resolve_sender(header: &str, policy: UnbracketedSender) -> Option<String> {
    match BRACKETED_ADDRESS.captures(header) {
        Some(caps) => Some(caps[1].to_string()),
        None => match policy {
            UnbracketedSender::PassThrough => Some(header.to_string()),
            UnbracketedSender::Reject => None,
        },
    }
}

/// Value of the `From` header; the last one wins if there are several
pub fn from_header(message: &GmailMessage) -> Option<&str> {
    message
        .payload
        .as_ref()?
        .headers
        .as_ref()?
        .iter()
        .rev()
        .find(|h| h.name.eq_ignore_ascii_case("From"))
        .map(|h| h.value.as_str())
}

/// Resolves senders against a fixed allow-list
pub struct SenderFilter<'a> {
    allow_list: &'a AllowList,
    policy: UnbracketedSender,
}

impl<'a> SenderFilter<'a> {
    pub fn new(allow_list: &'a AllowList, policy: UnbracketedSender) -> Self {
        Self { allow_list, policy }
    }

    pub fn from_config(config: &'a SweepConfig) -> Self {
        Self::new(&config.senders, config.unbracketed_sender)
    }

    /// Resolve a single message into a sender record
    pub fn sender_of(&self, message: &GmailMessage) -> Result<SenderRecord, SenderError> {
        let id = MessageId::new(&message.id);
        let header = from_header(message).ok_or_else(|| SenderError::MissingFrom { id: id.clone() })?;

        match resolve_sender(header, self.policy) {
            Some(sender) => Ok(SenderRecord::new(sender, id)),
            None => Err(SenderError::Unbracketed {
                id,
                header: header.to_string(),
            }),
        }
    }

    /// Fetch each listed message once and partition the IDs
    ///
    /// The first fetch or parse failure aborts the whole filter.
    pub fn filter(
        &self,
        service: &dyn MailService,
        summaries: &[MessageRef],
    ) -> Result<FilterOutcome> {
        let mut outcome = FilterOutcome::default();
        let mut seen = HashSet::new();

        for summary in summaries {
            let id = MessageId::new(&summary.id);
            if !seen.insert(id.clone()) {
                debug!("Skipping duplicate listing for {}", id);
                continue;
            }

            let message = service.get_message(&id)?;
            // The listing ID is authoritative even if the response echoes another
            let record = SenderRecord {
                message_id: id.clone(),
                ..self.sender_of(&message)?
            };

            if self.allow_list.contains(&record.sender) {
                debug!("Matched {} from {}", id, record.sender);
                outcome.matched.push(id.clone());
            }
            outcome.all.push(id);
            outcome.senders.push(record);
        }

        info!(
            "Filtered {} unread messages, {} from allow-listed senders",
            outcome.all.len(),
            outcome.matched.len()
        );
        Ok(outcome)
    }
}
