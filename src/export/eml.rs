//! Serialize a [`MailBundle`] into a `multipart/related` `.eml` message.
//!
//! Layout of the output:
//!
//! ```text
//! <headers, raw or synthesized>
//! Content-Type: multipart/related; boundary="<BOUNDARY>"
//!
//! --<BOUNDARY>
//! Content-Type: text/html; charset=UTF-8
//! <base64 body>
//!
//! --<BOUNDARY>
//! Content-Type: <attachment type>; ...
//! <base64 attachment>
//!
//! --<BOUNDARY>--
//! ```
//!
//! Every line is separated by CRLF; the final delimiter has no terminator.

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::mime::{
    break_into_lines, cleaned_mime_type, encoded_word, format_smtp_date_time, MAX_LINE_LENGTH,
};
use crate::error::{ExportError, Result};
use crate::model::address::{format_recipients, MailAddress};
use crate::model::attachment::Attachment;
use crate::model::mail::{HeaderSource, MailBundle};

/// Multipart boundary shared by every part of every exported message.
pub const BOUNDARY: &str = "------------79Bu5A16qPEYcVIZL@tutanota";

/// MIME type of an exported `.eml` file.
pub const EML_MIME_TYPE: &str = "message/rfc822";

/// Input bytes encoded per step when streaming base64 content.
///
/// 117 bytes encode to exactly two 78-character lines, so each chunk ends on
/// a line boundary and chunked output matches whole-buffer output.
const STREAM_CHUNK: usize = 117 * 64;

const _: () = assert!((STREAM_CHUNK / 3 * 4) % MAX_LINE_LENGTH == 0);

/// A named, typed blob ready to be handed to a file writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Encode a bundle into a complete `.eml` file with its derived filename.
pub fn mail_to_eml_file(mail: &MailBundle) -> Result<DataFile> {
    let data = mail_to_eml(mail)?;
    let name = mail.export_file_name("eml")?;
    Ok(DataFile {
        name,
        mime_type: EML_MIME_TYPE.to_string(),
        data,
    })
}

/// Encode a bundle into EML bytes.
///
/// Either the complete message is returned or an error; there is no
/// partial output.
pub fn mail_to_eml(mail: &MailBundle) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(estimated_size(mail));
    write_eml(mail, &mut out)?;
    Ok(out)
}

/// Stream the EML encoding of a bundle into `out`.
///
/// Attachment content is encoded in bounded chunks, so peak memory does not
/// grow with attachment size beyond the input itself. The header section is
/// built before anything is written: a bundle missing a required field fails
/// without touching `out`.
pub fn write_eml<W: Write>(mail: &MailBundle, out: &mut W) -> Result<()> {
    let headers = header_lines(mail)?;
    for cid in mail.attachments.iter().filter_map(Attachment::content_id) {
        single_line("cid", cid)?;
    }

    let mut lines = CrlfLines::new(out);
    for header in &headers {
        lines.line(header)?;
    }
    lines.line(&format!(
        "Content-Type: multipart/related; boundary=\"{BOUNDARY}\""
    ))?;
    lines.line("")?;

    lines.line(&format!("--{BOUNDARY}"))?;
    lines.line("Content-Type: text/html; charset=UTF-8")?;
    lines.line("Content-transfer-encoding: base64")?;
    lines.line("")?;
    write_base64(&mut lines, mail.body.as_bytes())?;
    lines.line("")?;

    for attachment in &mail.attachments {
        write_attachment(&mut lines, attachment)?;
    }

    lines.line(&format!("--{BOUNDARY}--"))?;
    out.flush()?;

    tracing::debug!(
        headers = header_kind(mail),
        attachments = mail.attachments.len(),
        "Encoded EML message"
    );
    Ok(())
}

/// Produce the header lines that precede the `Content-Type` header.
pub fn header_lines(mail: &MailBundle) -> Result<Vec<String>> {
    match mail.header_source() {
        HeaderSource::Raw(raw) => Ok(filter_raw_headers(raw)),
        HeaderSource::Generated => generated_headers(mail),
    }
}

/// Keep the raw header lines except `Content-Type:` lines, `boundary=`
/// continuations and empty lines, in their original order.
pub fn filter_raw_headers(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !is_multipart_header(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `true` for lines that would clash with the generated `Content-Type`.
fn is_multipart_header(line: &str) -> bool {
    let line = line.trim_start();
    starts_with_ignore_case(line, "content-type:") || starts_with_ignore_case(line, "boundary=")
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// Reject a value that would end its header line early.
fn single_line<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(ExportError::LineBreakInHeader { field });
    }
    Ok(value)
}

/// Synthesize the envelope headers from the bundle fields.
fn generated_headers(mail: &MailBundle) -> Result<Vec<String>> {
    let mut headers = vec![
        format!("From: {}", single_line("sender", &mail.sender()?.address)?),
        "MIME-Version: 1.0".to_string(),
    ];

    let recipients: [(&str, &'static str, &[MailAddress]); 3] = [
        ("To", "to", mail.to.as_slice()),
        ("CC", "cc", mail.cc.as_slice()),
        ("BCC", "bcc", mail.bcc.as_slice()),
    ];
    for (key, field, list) in recipients {
        for recipient in list {
            single_line(field, &recipient.name)?;
            single_line(field, &recipient.address)?;
        }
        if !list.is_empty() {
            headers.push(format!("{key}: {}", format_recipients(list)));
        }
    }

    let subject = mail.subject()?;
    let subject = if subject.trim().is_empty() {
        String::new()
    } else {
        encoded_word(subject)
    };
    headers.push(format!("Subject: {subject}"));
    headers.push(format!("Date: {}", format_smtp_date_time(mail.sent_on()?)));

    Ok(headers)
}

fn write_attachment<W: Write>(
    lines: &mut CrlfLines<'_, W>,
    attachment: &Attachment,
) -> Result<()> {
    let filename = encoded_word(&attachment.name);

    lines.line(&format!("--{BOUNDARY}"))?;
    lines.line(&format!(
        "Content-Type: {};",
        cleaned_mime_type(&attachment.mime_type)
    ))?;
    lines.line(&format!(" name={filename}"))?;
    lines.line("Content-Transfer-Encoding: base64")?;
    lines.line("Content-Disposition: attachment;")?;
    lines.line(&format!(" filename={filename}"))?;
    if let Some(cid) = attachment.content_id() {
        lines.line(&format!("Content-Id: <{cid}>"))?;
    }
    lines.line("")?;
    write_base64(lines, &attachment.data)?;
    lines.line("")?;
    Ok(())
}

/// Write `data` as base64, wrapped at [`MAX_LINE_LENGTH`] characters.
fn write_base64<W: Write>(lines: &mut CrlfLines<'_, W>, data: &[u8]) -> Result<()> {
    for chunk in data.chunks(STREAM_CHUNK) {
        let encoded = STANDARD.encode(chunk);
        for line in break_into_lines(&encoded) {
            lines.line(line)?;
        }
    }
    Ok(())
}

fn header_kind(mail: &MailBundle) -> &'static str {
    match mail.header_source() {
        HeaderSource::Raw(_) => "raw",
        HeaderSource::Generated => "generated",
    }
}

/// Rough output size: base64 grows content by 4/3 plus CRLF per line.
fn estimated_size(mail: &MailBundle) -> usize {
    let attachments: usize = mail.attachments.iter().map(|a| a.data.len()).sum();
    let payload = mail.body.len() + attachments;
    payload / 3 * 4 * (MAX_LINE_LENGTH + 2) / MAX_LINE_LENGTH + 1024
}

/// Writes lines separated by CRLF, with no terminator after the last one.
struct CrlfLines<'w, W: Write> {
    out: &'w mut W,
    started: bool,
}

impl<'w, W: Write> CrlfLines<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self {
            out,
            started: false,
        }
    }

    fn line(&mut self, line: &str) -> std::io::Result<()> {
        if self.started {
            self.out.write_all(b"\r\n")?;
        }
        self.started = true;
        self.out.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bundle() -> MailBundle {
        let mut mail = MailBundle::new(
            MailAddress::new("a@x.com", "Alice"),
            "Hi",
            Utc.with_ymd_and_hms(2021, 3, 5, 8, 9, 10).unwrap(),
        );
        mail.to = vec![MailAddress::new("b@y.com", "Bob")];
        mail.body = "<p>hi</p>".to_string();
        mail
    }

    fn text(mail: &MailBundle) -> String {
        String::from_utf8(mail_to_eml(mail).unwrap()).unwrap()
    }

    #[test]
    fn test_generated_header_order() {
        let mut mail = bundle();
        mail.cc = vec![MailAddress::new("c@z.com", "")];
        mail.bcc = vec![MailAddress::new("d@z.com", "Dee")];
        let headers = header_lines(&mail).unwrap();
        assert_eq!(
            headers,
            vec![
                "From: a@x.com",
                "MIME-Version: 1.0",
                "To: <Bob> b@y.com",
                "CC: c@z.com",
                "BCC: <Dee> d@z.com",
                "Subject: =?UTF-8?B?SGk=?=",
                "Date: Fri, 5 Mar 2021 08:09:10 +0000",
            ]
        );
    }

    #[test]
    fn test_empty_recipient_lists_omitted() {
        let mut mail = bundle();
        mail.to.clear();
        let headers = header_lines(&mail).unwrap();
        assert!(!headers.iter().any(|h| h.starts_with("To:")));
        assert!(!headers.iter().any(|h| h.starts_with("CC:")));
        assert!(!headers.iter().any(|h| h.starts_with("BCC:")));
    }

    #[test]
    fn test_whitespace_subject_is_empty() {
        let mut mail = bundle();
        mail.subject = Some("   ".to_string());
        let headers = header_lines(&mail).unwrap();
        assert!(headers.contains(&"Subject: ".to_string()));
    }

    #[test]
    fn test_non_ascii_subject() {
        let mut mail = bundle();
        mail.subject = Some("Café".to_string());
        let headers = header_lines(&mail).unwrap();
        assert!(headers.contains(&"Subject: =?UTF-8?B?Q2Fmw6k=?=".to_string()));
    }

    #[test]
    fn test_filter_raw_headers() {
        let raw = "From: x@y.z\nContent-Type: text/plain\n boundary=xyz\nSubject: s\n\nX-Custom: 1\n";
        assert_eq!(
            filter_raw_headers(raw),
            vec!["From: x@y.z", "Subject: s", "X-Custom: 1"]
        );
    }

    #[test]
    fn test_filter_raw_headers_case_insensitive_and_crlf() {
        let raw = "Received: by mx\r\n\tfrom relay\r\ncontent-type: multipart/mixed;\r\n\tBOUNDARY=\"abc\"\r\nTo: q@r.s\r\n";
        assert_eq!(
            filter_raw_headers(raw),
            vec!["Received: by mx", "\tfrom relay", "To: q@r.s"]
        );
    }

    #[test]
    fn test_raw_headers_replace_envelope() {
        let mut mail = bundle();
        mail.headers = Some("From: raw@x.com\nContent-Type: text/plain".to_string());
        let eml = text(&mail);
        assert!(eml.starts_with(&format!(
            "From: raw@x.com\r\nContent-Type: multipart/related; boundary=\"{BOUNDARY}\"\r\n\r\n"
        )));
        assert!(!eml.contains("To: <Bob>"));
        assert!(!eml.contains("MIME-Version"));
    }

    #[test]
    fn test_raw_headers_do_not_need_sender() {
        let mail = MailBundle {
            headers: Some("From: raw@x.com".to_string()),
            ..MailBundle::default()
        };
        assert!(mail_to_eml(&mail).is_ok());
    }

    #[test]
    fn test_missing_sender_fails_without_output() {
        let mut mail = bundle();
        mail.sender = None;
        let mut out = Vec::new();
        let err = write_eml(&mail, &mut out).unwrap_err();
        assert!(matches!(err, ExportError::InvalidInput { field: "sender" }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_full_layout() {
        let mut mail = bundle();
        mail.attachments = vec![
            Attachment::new("f.txt", "text/plain", b"hello".to_vec()).with_cid("c1"),
        ];
        let expected = [
            "From: a@x.com",
            "MIME-Version: 1.0",
            "To: <Bob> b@y.com",
            "Subject: =?UTF-8?B?SGk=?=",
            "Date: Fri, 5 Mar 2021 08:09:10 +0000",
            "Content-Type: multipart/related; boundary=\"------------79Bu5A16qPEYcVIZL@tutanota\"",
            "",
            "--------------79Bu5A16qPEYcVIZL@tutanota",
            "Content-Type: text/html; charset=UTF-8",
            "Content-transfer-encoding: base64",
            "",
            "PHA+aGk8L3A+",
            "",
            "--------------79Bu5A16qPEYcVIZL@tutanota",
            "Content-Type: text/plain;",
            " name==?UTF-8?B?Zi50eHQ=?=",
            "Content-Transfer-Encoding: base64",
            "Content-Disposition: attachment;",
            " filename==?UTF-8?B?Zi50eHQ=?=",
            "Content-Id: <c1>",
            "",
            "aGVsbG8=",
            "",
            "--------------79Bu5A16qPEYcVIZL@tutanota--",
        ]
        .join("\r\n");
        assert_eq!(text(&mail), expected);
    }

    #[test]
    fn test_empty_body_has_no_content_lines() {
        let mut mail = bundle();
        mail.body.clear();
        let eml = text(&mail);
        assert!(eml.contains("Content-transfer-encoding: base64\r\n\r\n\r\n--"));
    }

    #[test]
    fn test_no_bare_newlines_and_no_trailing_crlf() {
        let mut mail = bundle();
        mail.attachments = vec![Attachment::new("big.bin", "", vec![7u8; 1000])];
        let eml = mail_to_eml(&mail).unwrap();
        for (i, &b) in eml.iter().enumerate() {
            if b == b'\n' {
                assert_eq!(eml[i - 1], b'\r', "bare LF at {i}");
            }
        }
        assert!(eml.ends_with(format!("--{BOUNDARY}--").as_bytes()));
        assert!(String::from_utf8(eml)
            .unwrap()
            .contains("Content-Type: application/octet-stream;"));
    }

    #[test]
    fn test_line_break_in_recipient_is_rejected() {
        let mut mail = bundle();
        mail.to = vec![MailAddress::new("b@y.com", "Bob\nBcc: evil@z.com")];
        let mut out = Vec::new();
        let err = write_eml(&mail, &mut out).unwrap_err();
        assert!(matches!(err, ExportError::LineBreakInHeader { field: "to" }));
        assert!(out.is_empty());

        mail.to = vec![MailAddress::new("b@y.com\r", "Bob")];
        let err = mail_to_eml(&mail).unwrap_err();
        assert!(matches!(err, ExportError::LineBreakInHeader { field: "to" }));
    }

    #[test]
    fn test_line_break_in_sender_or_cid_is_rejected() {
        let mut mail = bundle();
        mail.sender = Some(MailAddress::new("a@x.com\nX-Injected: 1", ""));
        let err = mail_to_eml(&mail).unwrap_err();
        assert!(matches!(err, ExportError::LineBreakInHeader { field: "sender" }));

        let mut mail = bundle();
        mail.attachments = vec![
            Attachment::new("f.txt", "text/plain", b"hello".to_vec()).with_cid("c\nX-Injected: 1"),
        ];
        let mut out = Vec::new();
        let err = write_eml(&mail, &mut out).unwrap_err();
        assert!(matches!(err, ExportError::LineBreakInHeader { field: "cid" }));
        assert!(out.is_empty(), "nothing is written before validation");
    }

    #[test]
    fn test_line_break_in_cid_rejected_with_raw_headers() {
        let mail = MailBundle {
            headers: Some("From: raw@x.com".to_string()),
            attachments: vec![Attachment::new("a.png", "image/png", vec![1]).with_cid("x\ry")],
            ..MailBundle::default()
        };
        assert!(matches!(
            mail_to_eml(&mail),
            Err(ExportError::LineBreakInHeader { field: "cid" })
        ));
    }

    #[test]
    fn test_chunked_base64_matches_whole_buffer() {
        let data: Vec<u8> = (0..STREAM_CHUNK * 3 + 41).map(|i| (i * 31 % 251) as u8).collect();
        let mut out = Vec::new();
        {
            let mut lines = CrlfLines::new(&mut out);
            write_base64(&mut lines, &data).unwrap();
        }
        let encoded = STANDARD.encode(&data);
        let expected = break_into_lines(&encoded).collect::<Vec<_>>().join("\r\n");
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_mail_to_eml_file() {
        let file = mail_to_eml_file(&bundle()).unwrap();
        assert_eq!(file.name, "2021-03-05-08.09.10-Hi.eml");
        assert_eq!(file.mime_type, "message/rfc822");
        assert_eq!(file.data, mail_to_eml(&bundle()).unwrap());
    }
}
