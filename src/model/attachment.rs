//! Attachments carried inside a mail bundle.
//!
//! Unlike an index entry, a bundled attachment holds its full decoded
//! content; the exporter base64-encodes it on the way out.

/// A file attached to a bundled mail.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Filename as shown to the user. Always emitted as an encoded word.
    pub name: String,

    /// Raw MIME type as stored by the mail server (cleaned before use).
    #[serde(default)]
    pub mime_type: String,

    /// Decoded binary content. Standard base64 in the JSON representation.
    #[serde(with = "base64_data", default)]
    pub data: Vec<u8>,

    /// Content-ID for inline attachments referenced from the HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
            cid: None,
        }
    }

    /// Attach a Content-ID, marking the attachment as inline.
    pub fn with_cid(mut self, cid: impl Into<String>) -> Self {
        self.cid = Some(cid.into());
        self
    }

    /// The Content-ID, if one is set and non-empty.
    pub fn content_id(&self) -> Option<&str> {
        self.cid.as_deref().filter(|cid| !cid.is_empty())
    }
}

/// Serde adapter storing binary payloads as standard base64 strings.
mod base64_data {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
