use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::domain::email::{extract_emails, HeaderParseError};
use crate::domain::timestamp::format_timestamp;

use super::errors::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailDirection {
    Incoming,
    Outgoing,
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: GmailPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailPayload {
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

impl GmailMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    /// A missing or blank `To` header means no recipients.
    pub fn to_emails(&self) -> Result<Vec<String>, HeaderParseError> {
        match self.header("To") {
            Some(value) if !value.trim().is_empty() => extract_emails(value),
            _ => Ok(Vec::new()),
        }
    }

    pub fn from_email(&self) -> Result<String, HeaderParseError> {
        let value = self.header("From").unwrap_or_default();
        let mut emails = extract_emails(value)?;
        if emails.len() != 1 {
            warn!(message_id = %self.id, from = value, "from header holds several addresses");
        }
        Ok(emails.swap_remove(0))
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject").filter(|value| !value.trim().is_empty())
    }

    pub fn snippet(&self) -> Option<&str> {
        self.snippet.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn direction(&self, user_emails: &[String]) -> Result<EmailDirection, HeaderParseError> {
        let from = self.from_email()?;
        let to = self.to_emails()?;
        let is_from_user = user_emails.iter().any(|email| *email == from);
        let is_to_user = user_emails.iter().any(|email| to.contains(email));
        Ok(match (is_from_user, is_to_user) {
            // mail to self
            (true, true) => EmailDirection::Unknown,
            (true, false) => EmailDirection::Outgoing,
            (false, true) => EmailDirection::Incoming,
            (false, false) => EmailDirection::Unknown,
        })
    }

    /// `internalDate` is milliseconds since the epoch.
    pub fn was_at(&self) -> Result<String, SyncError> {
        let raw = self
            .internal_date
            .as_deref()
            .ok_or_else(|| SyncError::Parse(format!("message {} has no internalDate", self.id)))?;
        let millis: i128 = raw.trim().parse().map_err(|_| {
            SyncError::Parse(format!("message {} has invalid internalDate '{}'", self.id, raw))
        })?;
        let at = OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).map_err(|_| {
            SyncError::Parse(format!("message {} internalDate out of range", self.id))
        })?;
        Ok(format_timestamp(at))
    }
}
