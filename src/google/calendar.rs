use serde::Deserialize;

use crate::domain::timestamp::{format_timestamp, parse_date_utc, parse_timestamp};

use super::errors::SyncError;

pub const CONFIRMED_STATUS: &str = "confirmed";
pub const ACCEPTED_RESPONSE: &str = "accepted";
pub const UNTITLED: &str = "-";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub end: Option<EventTime>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "self")]
    pub is_self: bool,
    #[serde(default)]
    pub response_status: Option<String>,
}

impl Attendee {
    fn accepted(&self) -> bool {
        self.response_status.as_deref() == Some(ACCEPTED_RESPONSE)
    }
}

impl CalendarEvent {
    pub fn is_confirmed(&self) -> bool {
        self.status.as_deref() == Some(CONFIRMED_STATUS)
    }

    /// Whether the calendar owner accepted the invitation.
    pub fn user_attended(&self) -> bool {
        self.attendees
            .iter()
            .any(|attendee| attendee.is_self && attendee.accepted())
    }

    /// Lowercased addresses of the other attendees who accepted.
    pub fn accepted_guests(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for attendee in &self.attendees {
            if attendee.is_self || !attendee.accepted() {
                continue;
            }
            let Some(email) = attendee.email.as_deref() else {
                continue;
            };
            let email = email.trim().to_ascii_lowercase();
            if !email.is_empty() && !out.contains(&email) {
                out.push(email);
            }
        }
        out
    }

    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|summary| !summary.trim().is_empty())
            .unwrap_or(UNTITLED)
    }

    /// End of the event; all-day events end at midnight UTC of their `date`.
    pub fn ended_at(&self) -> Result<String, SyncError> {
        let end = self
            .end
            .as_ref()
            .ok_or_else(|| SyncError::Parse(format!("event {} has no end", self.id)))?;
        let parsed = match (end.date_time.as_deref(), end.date.as_deref()) {
            (Some(date_time), _) => parse_timestamp(date_time),
            (None, Some(date)) => parse_date_utc(date),
            (None, None) => None,
        };
        parsed
            .map(format_timestamp)
            .ok_or_else(|| SyncError::Parse(format!("event {} has an invalid end", self.id)))
    }
}
