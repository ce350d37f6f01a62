//! Read an `.eml` file back with `mail-parser` and summarize its structure.
//!
//! Used to check that exported files are readable by a standard MIME
//! parser: the HTML body and every attachment should come back intact.

use mail_parser::{MessageParser, MimeHeaders};
use serde::Serialize;

use crate::error::{ExportError, Result};

/// What a MIME reader sees in an EML message.
#[derive(Debug, Clone, Serialize)]
pub struct EmlSummary {
    /// Decoded subject, if present.
    pub subject: Option<String>,
    /// First sender address, if present.
    pub from: Option<String>,
    /// `Date` header as RFC 3339, if it parsed.
    pub date: Option<String>,
    /// Decoded HTML body.
    pub html: Option<String>,
    /// Attachment parts in message order.
    pub attachments: Vec<PartSummary>,
}

/// One attachment part as decoded by the parser.
#[derive(Debug, Clone, Serialize)]
pub struct PartSummary {
    pub name: String,
    pub content_type: String,
    pub size: usize,
    pub content_id: Option<String>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Parse raw EML bytes into an [`EmlSummary`].
pub fn inspect_eml(raw: &[u8]) -> Result<EmlSummary> {
    let parser = MessageParser::default();
    let msg = parser
        .parse(raw)
        .ok_or_else(|| ExportError::Parse("not a valid RFC 822 message".into()))?;

    let from = msg
        .from()
        .and_then(|addr| addr.as_list())
        .and_then(|list| list.first())
        .and_then(|addr| addr.address())
        .map(String::from);

    let attachments = msg
        .attachments()
        .enumerate()
        .map(|(idx, part)| {
            let content_type = part
                .content_type()
                .map(|ct: &mail_parser::ContentType| {
                    let main = ct.ctype();
                    match ct.subtype() {
                        Some(sub) => format!("{main}/{sub}"),
                        None => main.to_string(),
                    }
                })
                .unwrap_or_else(|| super::mime::DEFAULT_MIME_TYPE.to_string());
            PartSummary {
                name: part
                    .attachment_name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("attachment_{idx}")),
                content_type,
                size: part.contents().len(),
                content_id: part.content_id().map(String::from),
                data: part.contents().to_vec(),
            }
        })
        .collect();

    let summary = EmlSummary {
        subject: msg.subject().map(String::from),
        from,
        date: msg.date().map(|d| d.to_rfc3339()),
        html: msg.body_html(0).map(|s| s.into_owned()),
        attachments,
    };

    tracing::debug!(
        attachments = summary.attachments.len(),
        has_html = summary.html.is_some(),
        "Inspected EML message"
    );
    Ok(summary)
}
