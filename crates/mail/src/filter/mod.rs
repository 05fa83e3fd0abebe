//! Sender resolution and allow-list filtering

mod sender;

pub use sender::{FilterOutcome, SenderError, SenderFilter, from_header, resolve_sender};
