//! Mail addresses as supplied by the mail bundler.

/// A sender or recipient of a bundled mail.
///
/// # Examples
/// - `{address: "a@b.com", name: "Al"}` formats as `"<Al> a@b.com"`
/// - `{address: "a@b.com", name: ""}` formats as `"a@b.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct MailAddress {
    /// The bare email address (`user@domain`).
    pub address: String,
    /// Human-readable display name (may be empty).
    #[serde(default)]
    pub name: String,
}

impl MailAddress {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Format as a recipient entry: `"<Name> address"` or just `"address"`.
    ///
    /// The display name is wrapped in angle brackets and the address is left
    /// bare, which is the layout the exporter has always produced.
    pub fn recipient(&self) -> String {
        if self.name.is_empty() {
            self.address.clone()
        } else {
            format!("<{}> {}", self.name, self.address)
        }
    }
}

/// Join a list of recipients with `,` (no space).
pub fn format_recipients(recipients: &[MailAddress]) -> String {
    recipients
        .iter()
        .map(MailAddress::recipient)
        .collect::<Vec<_>>()
        .join(",")
}

impl std::fmt::Display for MailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.recipient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_with_name() {
        let addr = MailAddress::new("a@b.com", "Al");
        assert_eq!(addr.recipient(), "<Al> a@b.com");
    }

    #[test]
    fn test_recipient_without_name() {
        let addr = MailAddress::new("a@b.com", "");
        assert_eq!(addr.recipient(), "a@b.com");
    }

    #[test]
    fn test_format_recipients_joins_without_space() {
        let list = vec![
            MailAddress::new("a@b.com", "Al"),
            MailAddress::new("c@d.com", ""),
            MailAddress::new("e@f.com", "Eve"),
        ];
        assert_eq!(
            format_recipients(&list),
            "<Al> a@b.com,c@d.com,<Eve> e@f.com"
        );
    }

    #[test]
    fn test_format_recipients_empty() {
        assert_eq!(format_recipients(&[]), "");
    }

    #[test]
    fn test_deserialize_missing_name() {
        let addr: MailAddress = serde_json::from_str(r#"{"address":"x@y.z"}"#).unwrap();
        assert_eq!(addr.name, "");
        assert_eq!(addr.to_string(), "x@y.z");
    }
}
