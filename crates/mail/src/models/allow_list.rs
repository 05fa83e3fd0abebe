//! Allow-list of sender addresses

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fixed set of sender addresses whose messages trigger the matched action
///
/// Built once at startup and never mutated during a run. Membership is an
/// exact, case-sensitive comparison against the resolved sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(BTreeSet<String>);

impl AllowList {
    pub fn new<I, S>(senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(senders.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, sender: &str) -> bool {
        self.0.contains(sender)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
