//! Action dispatch and read marking
//!
//! The matched action runs first (skipped when nothing matched), then every
//! swept message loses the unread label, one modify call each. Read marking
//! is not transactional: what happens after a failed modify depends on
//! [`MarkReadFailure`].

use anyhow::Result;
use log::{info, warn};

use super::MatchedAction;
use crate::config::{MarkReadFailure, SweepConfig};
use crate::gmail::api::ModifyMessageRequest;
use crate::models::MessageId;
use crate::service::MailService;

/// Messages that could not be marked read under [`MarkReadFailure::Continue`]
#[derive(Debug, thiserror::Error)]
#[error("Failed to mark {count} of {attempted} messages read: {ids}", count = .failed.len(), ids = join_ids(.failed))]
pub struct MarkReadError {
    pub failed: Vec<MessageId>,
    pub attempted: usize,
}

/// Runs the matched action and marks messages read
pub struct Dispatcher<'a> {
    unread_label: &'a str,
    on_failure: MarkReadFailure,
}

impl<'a> Dispatcher<'a> {
    pub fn new(unread_label: &'a str, on_failure: MarkReadFailure) -> Self {
        Self {
            unread_label,
            on_failure,
        }
    }

    pub fn from_config(config: &'a SweepConfig) -> Self {
        Self::new(&config.unread_label, config.mark_read_failure)
    }

    /// Run `action` on the matched IDs; returns `false` when skipped
    pub fn run_action(
        &self,
        service: &dyn MailService,
        action: &dyn MatchedAction,
        matched: &[MessageId],
    ) -> Result<bool> {
        if matched.is_empty() {
            info!("No new emails to process, marking all mail as read.");
            return Ok(false);
        }

        info!("Running '{}' on {} matched messages", action.name(), matched.len());
        action.run(service, matched)?;
        Ok(true)
    }

    /// Remove the unread label from each ID, in order
    ///
    /// Returns the IDs that were marked. Under [`MarkReadFailure::Abort`] the
    /// first failure is returned as-is and later IDs are left untouched.
    /// Under [`MarkReadFailure::Continue`] every ID is attempted and the
    /// failures come back together as a [`MarkReadError`].
    pub fn mark_read(&self, service: &dyn MailService, ids: &[MessageId]) -> Result<Vec<MessageId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        info!("Marking {} messages as read: {}", ids.len(), join_ids(ids));
        let change = ModifyMessageRequest::remove(self.unread_label);
        let mut marked = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();

        for id in ids {
            match service.modify_message(id, &change) {
                Ok(()) => marked.push(id.clone()),
                Err(e) => match self.on_failure {
                    MarkReadFailure::Abort => {
                        warn!(
                            "Stopping after {} of {} messages marked read",
                            marked.len(),
                            ids.len()
                        );
                        return Err(e.context(format!("Failed to mark message {} read", id)));
                    }
                    MarkReadFailure::Continue => {
                        warn!("Failed to mark message {} read: {:#}", id, e);
                        failed.push(id.clone());
                    }
                },
            }
        }

        if !failed.is_empty() {
            return Err(MarkReadError {
                failed,
                attempted: ids.len(),
            }
            .into());
        }

        Ok(marked)
    }
}

fn join_ids(ids: &[MessageId]) -> String {
    ids.iter().map(MessageId::as_str).collect::<Vec<_>>().join(", ")
}
