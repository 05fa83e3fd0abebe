//! Domain models for the sweep

mod allow_list;
mod message;

pub use allow_list::AllowList;
pub use message::{MessageId, SenderRecord};
