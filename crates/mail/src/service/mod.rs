//! Mail service abstraction
//!
//! The sweep only needs three remote operations: list, get and modify.
//! [`MailService`] captures them so the orchestration can run against Gmail
//! or against the in-memory mailbox used in tests.

mod memory;
mod traits;

pub use memory::InMemoryMailbox;
pub use traits::MailService;
