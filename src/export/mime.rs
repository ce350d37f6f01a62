//! Low-level MIME helpers: encoded words, base64 line wrapping, MIME type
//! cleaning and SMTP dates.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};

/// Maximum length of a base64 content line.
pub const MAX_LINE_LENGTH: usize = 78;

/// Fallback content type for attachments with an unusable MIME type.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Encode a header value as an RFC 2047 encoded word: `=?UTF-8?B?...?=`.
pub fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Break a string into greedy fixed-width lines of at most
/// [`MAX_LINE_LENGTH`] characters. An empty string yields no lines.
pub fn break_into_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let split = rest
            .char_indices()
            .nth(MAX_LINE_LENGTH)
            .map_or(rest.len(), |(i, _)| i);
        let (line, tail) = rest.split_at(split);
        rest = tail;
        Some(line)
    })
}

/// Reduce a raw MIME type to a bare `type/subtype` token.
///
/// Parameters after `;`, quotes, whitespace, control characters and
/// RFC 2045 tspecials are removed. Anything that is not of the form
/// `type/subtype` afterwards becomes `application/octet-stream`.
pub fn cleaned_mime_type(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("");
    let cleaned: String = essence
        .chars()
        .filter(|&c| c == '/' || is_token_char(c))
        .collect();

    let well_formed = matches!(
        cleaned.split_once('/'),
        Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/')
    );
    if well_formed {
        cleaned
    } else {
        DEFAULT_MIME_TYPE.to_string()
    }
}

/// RFC 2045 `token` character: printable ASCII except space and tspecials.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c) && c != '\''
}

/// Format a timestamp as an RFC 5322 date, always in UTC:
/// `Fri, 5 Mar 2021 08:09:10 +0000`.
pub fn format_smtp_date_time(date: DateTime<Utc>) -> String {
    date.format("%a, %-d %b %Y %H:%M:%S +0000").to_string()
}
