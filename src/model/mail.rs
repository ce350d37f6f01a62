//! The mail bundle: one message plus its attachments, as prepared by a loader.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::address::MailAddress;
use super::attachment::Attachment;
use crate::error::{ExportError, Result};

/// Structured representation of one email message plus attachments.
///
/// A bundle is built by the caller for a single export and is never modified
/// by the exporter. `subject`, `sender` and `sent_on` are required; they are
/// optional here so that an incomplete bundle can still be represented, and
/// the accessors report the missing field when it is first needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailBundle {
    /// Subject line, may be empty or contain non-ASCII text.
    pub subject: Option<String>,

    /// Sender of the message.
    pub sender: Option<MailAddress>,

    /// Primary recipients.
    pub to: Vec<MailAddress>,

    /// Carbon-copy recipients.
    pub cc: Vec<MailAddress>,

    /// Blind carbon-copy recipients.
    pub bcc: Vec<MailAddress>,

    /// Send time in milliseconds since the Unix epoch.
    pub sent_on: Option<i64>,

    /// HTML body.
    pub body: String,

    /// Raw header block (newline separated), if the server kept one.
    pub headers: Option<String>,

    /// Attachments in display order.
    pub attachments: Vec<Attachment>,
}

/// Where the header section of an exported message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSource<'a> {
    /// The original header block, filtered and passed through verbatim.
    Raw(&'a str),
    /// Headers synthesized from the bundle's envelope fields.
    Generated,
}

/// A bundle file holds either a single bundle or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum BundleFile {
    Many(Vec<MailBundle>),
    One(Box<MailBundle>),
}

impl MailBundle {
    /// Create a bundle with the required envelope fields set.
    pub fn new(sender: MailAddress, subject: impl Into<String>, sent_on: DateTime<Utc>) -> Self {
        Self {
            subject: Some(subject.into()),
            sender: Some(sender),
            sent_on: Some(sent_on.timestamp_millis()),
            ..Self::default()
        }
    }

    /// The subject line.
    pub fn subject(&self) -> Result<&str> {
        self.subject
            .as_deref()
            .ok_or_else(|| ExportError::missing("subject"))
    }

    /// The sender address.
    pub fn sender(&self) -> Result<&MailAddress> {
        self.sender
            .as_ref()
            .ok_or_else(|| ExportError::missing("sender"))
    }

    /// The send time as a UTC timestamp.
    ///
    /// Only four-digit years are accepted, since both the `Date` header and
    /// the sortable filename prefix print the year as exactly four digits.
    pub fn sent_on(&self) -> Result<DateTime<Utc>> {
        let millis = self.sent_on.ok_or_else(|| ExportError::missing("sentOn"))?;
        DateTime::from_timestamp_millis(millis)
            .filter(|date| (0..=9999).contains(&date.year()))
            .ok_or_else(|| {
                ExportError::InvalidBundle(format!("sentOn {millis} is out of range"))
            })
    }

    /// Decide whether headers are passed through or synthesized.
    ///
    /// An empty raw header block counts as absent.
    pub fn header_source(&self) -> HeaderSource<'_> {
        match self.headers.as_deref() {
            Some(raw) if !raw.is_empty() => HeaderSource::Raw(raw),
            _ => HeaderSource::Generated,
        }
    }

    /// Derive the export filename for this bundle with the given extension.
    pub fn export_file_name(&self, extension: &str) -> Result<String> {
        Ok(crate::export::filename::export_file_name(
            self.subject()?,
            self.sent_on()?,
            extension,
        ))
    }

    /// Load one or more bundles from JSON bytes.
    ///
    /// The input may be a single bundle object or an array of bundles.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Vec<MailBundle>> {
        let text = std::str::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))?;
        let file: BundleFile =
            serde_json::from_str(text).map_err(|e| ExportError::InvalidBundle(e.to_string()))?;
        Ok(match file {
            BundleFile::Many(bundles) => bundles,
            BundleFile::One(bundle) => vec![*bundle],
        })
    }
}
