//! `emlexport` — serialize structured mail bundles into `.eml` files.
//!
//! This crate provides the core library for turning a [`model::MailBundle`]
//! (sender, recipients, subject, HTML body, attachments) into a
//! `multipart/related` RFC 822 message, and for deriving its export filename.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
