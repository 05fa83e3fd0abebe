//! Matched-message actions and the read-marking dispatcher
//!
//! [`MatchedAction`] is the pluggable step run on allow-listed messages.
//! [`Dispatcher`] runs it (or skips it) and then marks every swept message read.

mod dispatch;
mod handler;

pub use dispatch::{Dispatcher, MarkReadError};
pub use handler::{AddLabel, LogMatches, MatchedAction, action_from_config};
