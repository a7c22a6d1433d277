use std::error::Error;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const EMAIL_PATTERN: &str = r"[A-Za-z0-9_.+-]+@[A-Za-z0-9_.-]+\.[A-Za-z]+";

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern should compile"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParseError {
    pub header: String,
}

impl fmt::Display for HeaderParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no email address found in header '{}'", self.header)
    }
}

impl Error for HeaderParseError {}

/// Lowercased addresses in first-seen order, without repeats.
pub fn extract_emails(header: &str) -> Result<Vec<String>, HeaderParseError> {
    let mut out: Vec<String> = Vec::new();
    for found in email_regex().find_iter(header) {
        let email = found.as_str().to_ascii_lowercase();
        if !out.contains(&email) {
            out.push(email);
        }
    }
    if out.is_empty() {
        return Err(HeaderParseError {
            header: header.to_string(),
        });
    }
    Ok(out)
}

/// Accepts a bare address only; returns it lowercased and trimmed.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let found = email_regex().find(trimmed)?;
    if found.start() != 0 || found.end() != trimmed.len() {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

pub fn local_part(value: &str) -> &str {
    value.split('@').next().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::{extract_emails, local_part, normalize_email};

    #[test]
    fn extracts_display_name_headers() {
        let emails = extract_emails("\"Peter Pan\" <Peter@Example.com>, wendy@example.org")
            .expect("header should parse");
        assert_eq!(emails, vec!["peter@example.com", "wendy@example.org"]);
    }

    #[test]
    fn deduplicates_case_insensitively() {
        let emails = extract_emails("a@x.io, A@X.io, b@x.io").expect("header should parse");
        assert_eq!(emails, vec!["a@x.io", "b@x.io"]);
    }

    #[test]
    fn header_without_address_is_an_error() {
        let err = extract_emails("undisclosed-recipients:;").unwrap_err();
        assert!(err.to_string().contains("undisclosed-recipients"));
    }

    #[test]
    fn normalize_requires_a_whole_address() {
        assert_eq!(normalize_email(" Ada@Example.COM "), Some("ada@example.com".to_string()));
        assert!(normalize_email("Ada <ada@example.com>").is_none());
        assert!(normalize_email("not-an-email").is_none());
    }

    #[test]
    fn local_part_splits_on_at() {
        assert_eq!(local_part("ada@example.com"), "ada");
        assert_eq!(local_part("Ada Lovelace"), "Ada Lovelace");
    }
}
