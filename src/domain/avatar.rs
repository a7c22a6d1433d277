use sha2::{Digest, Sha256};

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

/// Contacts without an email hash their id so the generated image stays stable.
pub fn avatar_url(contact_id: i64, first_email: Option<&str>, size: u32) -> String {
    let identity = match first_email.map(str::trim) {
        Some(email) if !email.is_empty() => email.to_ascii_lowercase(),
        _ => contact_id.to_string(),
    };
    let digest = Sha256::digest(identity.as_bytes());
    let mut url = String::with_capacity(GRAVATAR_BASE.len() + 64 + 24);
    url.push_str(GRAVATAR_BASE);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(url, "{:02x}", byte);
    }
    url.push_str(&format!("?d=robohash&s={size}"));
    url
}

#[cfg(test)]
mod tests {
    use super::avatar_url;

    #[test]
    fn hashes_lowercased_email() {
        let upper = avatar_url(1, Some(" Peter@Example.com "), 50);
        let lower = avatar_url(2, Some("peter@example.com"), 50);
        assert_eq!(upper, lower);
        assert!(upper.starts_with("https://www.gravatar.com/avatar/"));
        assert!(upper.ends_with("?d=robohash&s=50"));
    }

    #[test]
    fn falls_back_to_contact_id() {
        assert_eq!(avatar_url(42, None, 80), avatar_url(42, Some(""), 80));
        assert_ne!(avatar_url(42, None, 80), avatar_url(43, None, 80));
    }
}
