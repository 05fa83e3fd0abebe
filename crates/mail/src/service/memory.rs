//! In-memory mailbox
//!
//! Used by tests to drive the sweep without network access. Records every
//! `get` and `modify` call and can be told to fail specific messages.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use super::MailService;
use crate::gmail::api::{GmailMessage, Header, MessagePayload, MessageRef, ModifyMessageRequest};
use crate::models::MessageId;

struct StoredMessage {
    id: MessageId,
    headers: Vec<Header>,
    label_ids: Vec<String>,
}

/// In-memory implementation of [`MailService`]
///
/// Messages are listed in insertion order.
#[derive(Default)]
pub struct InMemoryMailbox {
    messages: RwLock<Vec<StoredMessage>>,
    get_calls: RwLock<Vec<MessageId>>,
    modify_calls: RwLock<Vec<(MessageId, ModifyMessageRequest)>>,
    failing_gets: RwLock<HashSet<MessageId>>,
    failing_modifies: RwLock<HashSet<MessageId>>,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message with the given `From` header (`None` for no header)
    pub fn add_message(&self, id: &str, from: Option<&str>, label_ids: &[&str]) {
        let headers = from
            .map(|value| Header {
                name: "From".to_string(),
                value: value.to_string(),
            })
            .into_iter()
            .collect();
        self.add_message_with_headers(id, headers, label_ids);
    }

    pub fn add_message_with_headers(&self, id: &str, headers: Vec<Header>, label_ids: &[&str]) {
        write(&self.messages).push(StoredMessage {
            id: MessageId::new(id),
            headers,
            label_ids: label_ids.iter().map(|l| l.to_string()).collect(),
        });
    }

    /// Add a message in INBOX with the UNREAD label
    pub fn add_unread(&self, id: &str, from: &str) {
        self.add_message(id, Some(from), &["INBOX", "UNREAD"]);
    }

    /// Make `get_message` fail for this ID
    pub fn fail_get(&self, id: &str) {
        write(&self.failing_gets).insert(MessageId::new(id));
    }

    /// Make `modify_message` fail for this ID
    pub fn fail_modify(&self, id: &str) {
        write(&self.failing_modifies).insert(MessageId::new(id));
    }

    /// IDs passed to `get_message`, in call order
    pub fn get_calls(&self) -> Vec<MessageId> {
        read(&self.get_calls).clone()
    }

    /// Successful `modify_message` calls, in call order
    pub fn modify_calls(&self) -> Vec<(MessageId, ModifyMessageRequest)> {
        read(&self.modify_calls).clone()
    }

    /// Current labels on a message, `None` if it doesn't exist
    pub fn labels_of(&self, id: &str) -> Option<Vec<String>> {
        read(&self.messages)
            .iter()
            .find(|m| m.id.as_str() == id)
            .map(|m| m.label_ids.clone())
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.labels_of(id)
            .is_some_and(|labels| labels.iter().any(|l| l == "UNREAD"))
    }
}

impl MailService for InMemoryMailbox {
    fn list_unread(
        &self,
        label_ids: &[String],
        max_messages: Option<usize>,
    ) -> Result<Vec<MessageRef>> {
        let refs = read(&self.messages)
            .iter()
            .filter(|m| label_ids.iter().all(|l| m.label_ids.contains(l)))
            .map(|m| MessageRef {
                id: m.id.as_str().to_string(),
                thread_id: m.id.as_str().to_string(),
            })
            .take(max_messages.unwrap_or(usize::MAX))
            .collect();
        Ok(refs)
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        write(&self.get_calls).push(id.clone());

        if read(&self.failing_gets).contains(id) {
            return Err(anyhow!("Simulated fetch failure for {}", id));
        }

        let messages = read(&self.messages);
        let msg = messages
            .iter()
            .find(|m| &m.id == id)
            .ok_or_else(|| anyhow!("Message not found: {}", id))?;

        Ok(GmailMessage {
            id: msg.id.as_str().to_string(),
            thread_id: msg.id.as_str().to_string(),
            label_ids: Some(msg.label_ids.clone()),
            payload: Some(MessagePayload {
                headers: Some(msg.headers.clone()),
                mime_type: Some("text/plain".to_string()),
            }),
        })
    }

    fn modify_message(&self, id: &MessageId, changes: &ModifyMessageRequest) -> Result<()> {
        if read(&self.failing_modifies).contains(id) {
            return Err(anyhow!("Simulated modify failure for {}", id));
        }

        {
            let mut messages = write(&self.messages);
            let msg = messages
                .iter_mut()
                .find(|m| &m.id == id)
                .ok_or_else(|| anyhow!("Message not found: {}", id))?;

            msg.label_ids.retain(|l| !changes.remove_label_ids.contains(l));
            for label in &changes.add_label_ids {
                if !msg.label_ids.contains(label) {
                    msg.label_ids.push(label.clone());
                }
            }
        }

        write(&self.modify_calls).push((id.clone(), changes.clone()));
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unread_labels() -> Vec<String> {
        vec!["INBOX".to_string(), "UNREAD".to_string()]
    }

    #[test]
    fn test_list_requires_all_labels() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "a@example.com");
        mailbox.add_message("m2", Some("b@example.com"), &["INBOX"]);
        mailbox.add_message("m3", Some("c@example.com"), &["UNREAD", "SPAM"]);

        let ids: Vec<String> = mailbox
            .list_unread(&unread_labels(), None)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["m1"]);
    }

    #[test]
    fn test_list_respects_max() {
        let mailbox = InMemoryMailbox::new();
        for i in 0..5 {
            mailbox.add_unread(&format!("m{}", i), "a@example.com");
        }
        assert_eq!(mailbox.list_unread(&unread_labels(), Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_modify_applies_label_changes() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "a@example.com");
        let id = MessageId::new("m1");

        mailbox
            .modify_message(&id, &ModifyMessageRequest::remove("UNREAD"))
            .unwrap();
        mailbox
            .modify_message(&id, &ModifyMessageRequest::add("Label_7"))
            .unwrap();

        assert_eq!(
            mailbox.labels_of("m1"),
            Some(vec!["INBOX".to_string(), "Label_7".to_string()])
        );
        assert!(!mailbox.is_unread("m1"));
        assert_eq!(mailbox.modify_calls().len(), 2);
    }

    #[test]
    fn test_failures_are_injected_and_not_recorded_as_modifies() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "a@example.com");
        mailbox.fail_get("m1");
        mailbox.fail_modify("m1");
        let id = MessageId::new("m1");

        assert!(mailbox.get_message(&id).is_err());
        assert!(
            mailbox
                .modify_message(&id, &ModifyMessageRequest::remove("UNREAD"))
                .is_err()
        );
        assert_eq!(mailbox.get_calls(), vec![id]);
        assert!(mailbox.modify_calls().is_empty());
        assert!(mailbox.is_unread("m1"));
    }
}
