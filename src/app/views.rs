use serde::{Deserialize, Deserializer, Serialize};
use time::{Duration, OffsetDateTime};

use crate::db::{ContactRecord, EmailRecord, InteractionRecord, PhoneRecord, UserRecord};
use crate::domain::status::{ContactStatus, NEVER_CONTACTED_DAYS};
use crate::domain::timestamp::{format_timestamp, parse_timestamp};
use crate::duplicates::DuplicateRecord;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub frequency_in_days: Option<i64>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub last_interaction_at: Option<String>,
    #[serde(skip)]
    pub last_past_interaction_at: Option<String>,
    pub urgency: Option<i64>,
    pub status: ContactStatus,
    pub status_code: i64,
    pub next_due_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactView {
    pub fn from_record(record: ContactRecord, now: OffsetDateTime) -> Self {
        let last = record.last_interaction_at.as_deref().and_then(parse_timestamp);
        let (status, urgency) = ContactStatus::classify(now, last, record.frequency_in_days);
        let next_due_at = record.frequency_in_days.map(|frequency| {
            let base = last.unwrap_or(now - Duration::days(NEVER_CONTACTED_DAYS));
            format_timestamp(base + Duration::days(frequency))
        });
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            frequency_in_days: record.frequency_in_days,
            linkedin_url: record.linkedin_url,
            twitter_url: record.twitter_url,
            last_interaction_at: record.last_interaction_at,
            last_past_interaction_at: record.last_past_interaction_at,
            urgency,
            status,
            status_code: status.code(),
            next_due_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.frequency_in_days.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ContactCounts {
    pub selected: u64,
    pub out_of_touch: u64,
    pub in_touch: u64,
    pub hidden: u64,
}

impl ContactCounts {
    pub fn tally(contacts: &[ContactView]) -> Self {
        let mut counts = Self::default();
        for contact in contacts {
            if contact.is_selected() {
                counts.selected += 1;
            }
            match contact.status {
                ContactStatus::OutOfTouch => counts.out_of_touch += 1,
                ContactStatus::InTouch => counts.in_touch += 1,
                ContactStatus::Hidden => counts.hidden += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactList {
    pub status: Option<ContactStatus>,
    pub counts: ContactCounts,
    pub contacts: Vec<ContactView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailView {
    pub id: i64,
    pub contact_id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PhoneView {
    pub id: i64,
    pub contact_id: i64,
    pub number: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionView {
    pub id: i64,
    #[serde(rename = "type")]
    pub type_key: Option<String>,
    pub title: String,
    pub description: String,
    pub was_at: String,
    pub url: Option<String>,
    pub contacts: Vec<ContactRef>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: ContactView,
    pub avatar_url: String,
    pub last_interaction_since: Option<String>,
    pub due_in: Option<String>,
    pub emails: Vec<EmailView>,
    pub phones: Vec<PhoneView>,
    pub interactions: Vec<InteractionView>,
    pub duplicates: Vec<DuplicateRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FrequentContact {
    #[serde(flatten)]
    pub contact: ContactView,
    pub interaction_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardView {
    pub counts: ContactCounts,
    pub due: Vec<ContactView>,
    pub frequent: Vec<FrequentContact>,
    pub recent: Vec<ContactView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency_in_days: Option<i64>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

/// `None` leaves a field alone; for the nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub frequency_in_days: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub twitter_url: Option<Option<String>>,
}

impl ContactPatch {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.frequency_in_days.is_some()
            || self.linkedin_url.is_some()
            || self.twitter_url.is_some()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInteraction {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub was_at: Option<String>,
    #[serde(default)]
    pub contact_ids: Vec<i64>,
    #[serde(default, rename = "type")]
    pub type_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionTypeView {
    pub key: String,
    pub label: String,
}

impl From<UserRecord> for UserView {
    fn from(value: UserRecord) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

impl From<EmailRecord> for EmailView {
    fn from(value: EmailRecord) -> Self {
        Self {
            id: value.id,
            contact_id: value.contact_id,
            email: value.email,
        }
    }
}

impl From<PhoneRecord> for PhoneView {
    fn from(value: PhoneRecord) -> Self {
        Self {
            id: value.id,
            contact_id: value.contact_id,
            number: value.number,
            label: value.label,
        }
    }
}

impl InteractionView {
    pub fn new(record: InteractionRecord, url: Option<String>, contacts: Vec<(i64, String)>) -> Self {
        Self {
            id: record.id,
            type_key: record.type_key,
            title: record.title,
            description: record.description,
            was_at: record.was_at,
            url,
            contacts: contacts
                .into_iter()
                .map(|(id, name)| ContactRef { id, name })
                .collect(),
        }
    }
}
