use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

/// Contacts with no interaction at all are treated as last seen this long ago.
pub const NEVER_CONTACTED_DAYS: i64 = 365;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days rounded down, so a scheduled interaction hours ahead is day -1.
pub fn days_since(now: OffsetDateTime, last_interaction_at: Option<OffsetDateTime>) -> i64 {
    let last = last_interaction_at.unwrap_or(now - Duration::days(NEVER_CONTACTED_DAYS));
    (now - last).whole_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Days overdue for outreach. Positive means overdue, zero or negative means in touch.
pub fn urgency(
    now: OffsetDateTime,
    last_interaction_at: Option<OffsetDateTime>,
    frequency_in_days: i64,
) -> i64 {
    days_since(now, last_interaction_at) - frequency_in_days
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    InTouch,
    OutOfTouch,
    Hidden,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 3] = [
        ContactStatus::InTouch,
        ContactStatus::OutOfTouch,
        ContactStatus::Hidden,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::InTouch => "in_touch",
            ContactStatus::OutOfTouch => "out_of_touch",
            ContactStatus::Hidden => "hidden",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ContactStatus::InTouch => 0,
            ContactStatus::OutOfTouch => 1,
            ContactStatus::Hidden => 2,
        }
    }

    pub fn classify(
        now: OffsetDateTime,
        last_interaction_at: Option<OffsetDateTime>,
        frequency_in_days: Option<i64>,
    ) -> (Self, Option<i64>) {
        match frequency_in_days {
            None => (ContactStatus::Hidden, None),
            Some(frequency) => {
                let value = urgency(now, last_interaction_at, frequency);
                let status = if value > 0 {
                    ContactStatus::OutOfTouch
                } else {
                    ContactStatus::InTouch
                };
                (status, Some(value))
            }
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = ParseContactStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let status = match normalized.as_str() {
            "0" | "in_touch" => ContactStatus::InTouch,
            "1" | "out_of_touch" | "overdue" => ContactStatus::OutOfTouch,
            "2" | "hidden" => ContactStatus::Hidden,
            _ => {
                return Err(ParseContactStatusError {
                    value: value.to_string(),
                });
            }
        };
        Ok(status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContactStatusError {
    value: String,
}

impl fmt::Display for ParseContactStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid contact status '{}': expected one of {}",
            self.value,
            ContactStatus::ALL
                .iter()
                .map(|status| format!("{} ({})", status.as_str(), status.code()))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseContactStatusError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyChange {
    MoreOften,
    LessOften,
    Hide,
}

impl FrequencyChange {
    /// A hidden contact that gets a cadence change comes back at `fallback` days.
    pub fn apply(self, current: Option<i64>, fallback: i64) -> Option<i64> {
        match (self, current) {
            (FrequencyChange::Hide, _) => None,
            (_, None) => Some(fallback.max(1)),
            (FrequencyChange::MoreOften, Some(days)) => Some((days / 2).max(1)),
            (FrequencyChange::LessOften, Some(days)) => Some(days.saturating_mul(2).max(1)),
        }
    }
}

impl FromStr for FrequencyChange {
    type Err = ParseFrequencyChangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "more-often" | "increase" => Ok(FrequencyChange::MoreOften),
            "less-often" | "decrease" => Ok(FrequencyChange::LessOften),
            "hide" => Ok(FrequencyChange::Hide),
            _ => Err(ParseFrequencyChangeError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFrequencyChangeError {
    value: String,
}

impl fmt::Display for ParseFrequencyChangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported frequency change '{}'; use more-often|less-often|hide",
            self.value
        )
    }
}

impl Error for ParseFrequencyChangeError {}

#[cfg(test)]
mod tests {
    use super::{days_since, urgency, ContactStatus, FrequencyChange};
    use std::str::FromStr;
    use time::{Duration, OffsetDateTime};

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_780_000_000).expect("valid epoch")
    }

    #[test]
    fn urgency_is_days_since_minus_frequency() {
        let last = now() - Duration::days(10) - Duration::hours(3);
        assert_eq!(days_since(now(), Some(last)), 10);
        assert_eq!(urgency(now(), Some(last), 7), 3);
        assert_eq!(urgency(now(), Some(last), 14), -4);
    }

    #[test]
    fn scheduled_interactions_round_down_to_negative_days() {
        assert_eq!(days_since(now(), Some(now() + Duration::hours(5))), -1);
        assert_eq!(days_since(now(), Some(now() + Duration::days(3))), -3);
        let (status, value) =
            ContactStatus::classify(now(), Some(now() + Duration::days(3)), Some(7));
        assert_eq!(status, ContactStatus::InTouch);
        assert_eq!(value, Some(-10));
    }

    #[test]
    fn never_contacted_counts_as_a_year_ago() {
        assert_eq!(days_since(now(), None), 365);
        assert_eq!(urgency(now(), None, 30), 335);
    }

    #[test]
    fn classify_hides_contacts_without_frequency() {
        let (status, value) = ContactStatus::classify(now(), None, None);
        assert_eq!(status, ContactStatus::Hidden);
        assert!(value.is_none());

        let recent = now() - Duration::days(2);
        let (status, value) = ContactStatus::classify(now(), Some(recent), Some(7));
        assert_eq!(status, ContactStatus::InTouch);
        assert_eq!(value, Some(-5));

        let (status, _) = ContactStatus::classify(now(), Some(now() - Duration::days(7)), Some(7));
        assert_eq!(status, ContactStatus::InTouch);

        let (status, _) = ContactStatus::classify(now(), Some(now() - Duration::days(8)), Some(7));
        assert_eq!(status, ContactStatus::OutOfTouch);
    }

    #[test]
    fn parses_status_codes_and_names() {
        assert_eq!(ContactStatus::from_str("1").unwrap(), ContactStatus::OutOfTouch);
        assert_eq!(
            ContactStatus::from_str("out-of-touch").unwrap(),
            ContactStatus::OutOfTouch
        );
        assert_eq!(ContactStatus::from_str("HIDDEN").unwrap(), ContactStatus::Hidden);
        let err = ContactStatus::from_str("7").unwrap_err();
        assert!(err.to_string().contains("in_touch (0)"));
    }

    #[test]
    fn frequency_changes_halve_double_and_hide() {
        assert_eq!(FrequencyChange::MoreOften.apply(Some(14), 7), Some(7));
        assert_eq!(FrequencyChange::MoreOften.apply(Some(1), 7), Some(1));
        assert_eq!(FrequencyChange::LessOften.apply(Some(14), 7), Some(28));
        assert_eq!(FrequencyChange::LessOften.apply(None, 7), Some(7));
        assert_eq!(FrequencyChange::MoreOften.apply(None, 7), Some(7));
        assert_eq!(FrequencyChange::Hide.apply(Some(14), 7), None);
        assert!(FrequencyChange::from_str("sideways").is_err());
        assert_eq!(
            FrequencyChange::from_str("less_often").unwrap(),
            FrequencyChange::LessOften
        );
    }
}
