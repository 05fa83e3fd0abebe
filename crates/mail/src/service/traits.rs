//! Mail service trait definition

use anyhow::Result;

use crate::gmail::api::{GmailMessage, MessageRef, ModifyMessageRequest};
use crate::models::MessageId;

/// Remote mailbox operations used by the sweep
///
/// Every call is a single blocking round trip; implementations do not retry.
pub trait MailService: Send + Sync {
    /// List messages carrying every label in `label_ids`, newest first
    ///
    /// `max_messages` caps the total returned; `None` means all pages.
    fn list_unread(&self, label_ids: &[String], max_messages: Option<usize>)
    -> Result<Vec<MessageRef>>;

    /// Fetch a message with at least its `From` header
    fn get_message(&self, id: &MessageId) -> Result<GmailMessage>;

    /// Apply label changes to a single message
    fn modify_message(&self, id: &MessageId, changes: &ModifyMessageRequest) -> Result<()>;
}
