//! Core data model types for mail bundles, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod mail;

pub use address::MailAddress;
pub use attachment::Attachment;
pub use mail::{HeaderSource, MailBundle};
