//! Actions run on matched messages

use anyhow::{Context, Result};
use log::info;

use crate::config::ActionConfig;
use crate::gmail::api::ModifyMessageRequest;
use crate::models::MessageId;
use crate::service::MailService;

/// Side effect applied to the allow-listed messages of a run
///
/// Only called with a non-empty slice. An error aborts the run before any
/// message is marked read.
pub trait MatchedAction {
    /// Short name used in logs
    fn name(&self) -> &str {
        "custom"
    }

    fn run(&self, service: &dyn MailService, matched: &[MessageId]) -> Result<()>;
}

impl<F> MatchedAction for F
where
    F: Fn(&dyn MailService, &[MessageId]) -> Result<()>,
{
    fn run(&self, service: &dyn MailService, matched: &[MessageId]) -> Result<()> {
        self(service, matched)
    }
}

/// Logs the matched IDs and does nothing else
#[derive(Debug, Default)]
pub struct LogMatches;

impl MatchedAction for LogMatches {
    fn name(&self) -> &str {
        "log"
    }

    fn run(&self, _service: &dyn MailService, matched: &[MessageId]) -> Result<()> {
        let ids: Vec<&str> = matched.iter().map(MessageId::as_str).collect();
        info!("Messages to process: {}", ids.join(", "));
        Ok(())
    }
}

/// Adds one label to each matched message
#[derive(Debug)]
pub struct AddLabel {
    label_id: String,
}

impl AddLabel {
    pub fn new(label_id: impl Into<String>) -> Self {
        Self {
            label_id: label_id.into(),
        }
    }
}

impl MatchedAction for AddLabel {
    fn name(&self) -> &str {
        "add_label"
    }

    fn run(&self, service: &dyn MailService, matched: &[MessageId]) -> Result<()> {
        let change = ModifyMessageRequest::add(&self.label_id);
        for id in matched {
            service
                .modify_message(id, &change)
                .with_context(|| format!("Failed to label message {} with {}", id, self.label_id))?;
        }
        info!("Labelled {} messages with {}", matched.len(), self.label_id);
        Ok(())
    }
}

/// Build the configured built-in action
pub fn action_from_config(config: &ActionConfig) -> Box<dyn MatchedAction> {
    match config {
        ActionConfig::Log => Box::new(LogMatches),
        ActionConfig::AddLabel { label_id } => Box::new(AddLabel::new(label_id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryMailbox;
    use std::cell::RefCell;

    #[test]
    fn test_closure_is_an_action() {
        let mailbox = InMemoryMailbox::new();
        let seen = RefCell::new(Vec::new());
        let action = |_: &dyn MailService, ids: &[MessageId]| -> Result<()> {
            seen.borrow_mut().extend_from_slice(ids);
            Ok(())
        };

        action.run(&mailbox, &[MessageId::new("m1")]).unwrap();
        assert_eq!(action.name(), "custom");
        assert_eq!(seen.into_inner(), vec![MessageId::new("m1")]);
    }

    #[test]
    fn test_add_label_modifies_each_match() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "a@x.com");
        mailbox.add_unread("m2", "b@x.com");

        AddLabel::new("Label_9")
            .run(&mailbox, &[MessageId::new("m2")])
            .unwrap();

        assert_eq!(mailbox.modify_calls().len(), 1);
        assert!(mailbox.labels_of("m2").unwrap().contains(&"Label_9".to_string()));
        assert!(!mailbox.labels_of("m1").unwrap().contains(&"Label_9".to_string()));
    }

    #[test]
    fn test_action_from_config() {
        assert_eq!(action_from_config(&ActionConfig::Log).name(), "log");
        let labelled = action_from_config(&ActionConfig::AddLabel {
            label_id: "Label_1".to_string(),
        });
        assert_eq!(labelled.name(), "add_label");
    }
}
