//! Export filenames derived from subject and send time.

use chrono::{DateTime, Utc};

/// Names longer than this many characters are truncated.
const MAX_NAME_LENGTH: usize = 96;

/// Format a timestamp as `YYYY-MM-DD HH.MM.SS` (UTC), which sorts
/// lexicographically in chronological order.
pub fn format_sortable_date_time(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H.%M.%S").to_string()
}

/// Build the export filename `<date>-<time>-<subject>.<extension>`.
///
/// Long names are cut to 95 characters plus `_` so the full path stays well
/// below the Windows `MAX_PATH` limit.
pub fn export_file_name(subject: &str, sent_on: DateTime<Utc>, extension: &str) -> String {
    let sortable = format_sortable_date_time(sent_on);
    let name = sortable
        .split(' ')
        .chain(std::iter::once(subject))
        .collect::<Vec<_>>()
        .join("-");
    finalize_file_name(&name, extension)
}

/// Trim, fall back to `unnamed`, truncate, and append the extension.
pub fn finalize_file_name(name: &str, extension: &str) -> String {
    let name = name.trim();
    let base = if name.is_empty() {
        "unnamed".to_string()
    } else if name.chars().count() > MAX_NAME_LENGTH {
        let mut truncated: String = name.chars().take(MAX_NAME_LENGTH - 1).collect();
        truncated.push('_');
        truncated
    } else {
        name.to_string()
    };
    format!("{base}.{extension}")
}

/// Replace characters that are not allowed in file names on common
/// platforms (path separators, Windows reserved characters, controls).
pub fn legalize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let reserved = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
            if reserved || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 5, 8, 9, 10).unwrap()
    }

    #[test]
    fn test_sortable_date_time() {
        assert_eq!(format_sortable_date_time(date()), "2021-03-05 08.09.10");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("Hello", date(), "eml"),
            "2021-03-05-08.09.10-Hello.eml"
        );
    }

    #[test]
    fn test_export_file_name_msg_extension() {
        assert_eq!(
            export_file_name("Hello", date(), "msg"),
            "2021-03-05-08.09.10-Hello.msg"
        );
    }

    #[test]
    fn test_empty_subject_keeps_date_prefix() {
        assert_eq!(export_file_name("", date(), "eml"), "2021-03-05-08.09.10-.eml");
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(
            export_file_name("Hi   ", date(), "eml"),
            "2021-03-05-08.09.10-Hi.eml"
        );
    }

    #[test]
    fn test_unnamed() {
        assert_eq!(finalize_file_name("", "eml"), "unnamed.eml");
        assert_eq!(finalize_file_name("  \t ", "eml"), "unnamed.eml");
    }

    #[test]
    fn test_long_subject_truncated() {
        let subject = "x".repeat(200);
        let name = export_file_name(&subject, date(), "eml");
        let base = name.strip_suffix(".eml").unwrap();
        assert_eq!(base.chars().count(), 96);
        assert!(base.ends_with('_'));
        assert!(base.starts_with("2021-03-05-08.09.10-xxx"));
    }

    #[test]
    fn test_exactly_96_not_truncated() {
        let name = "y".repeat(96);
        assert_eq!(finalize_file_name(&name, "eml"), format!("{name}.eml"));
    }

    #[test]
    fn test_legalize_file_name() {
        assert_eq!(
            legalize_file_name("2021-03-05-08.09.10-Re: a/b <c>?.eml"),
            "2021-03-05-08.09.10-Re_ a_b _c__.eml"
        );
        assert_eq!(legalize_file_name("Café.eml"), "Café.eml");
    }

    #[test]
    fn test_truncation_counts_characters() {
        let name = "é".repeat(100);
        let result = finalize_file_name(&name, "eml");
        let base = result.strip_suffix(".eml").unwrap();
        assert_eq!(base.chars().count(), 96);
        assert_eq!(base.chars().filter(|&c| c == 'é').count(), 95);
    }
}
