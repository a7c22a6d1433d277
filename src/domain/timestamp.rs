use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

// Stored timestamps are fixed-width UTC so SQLite string ordering matches time ordering.
pub fn format_timestamp(value: OffsetDateTime) -> String {
    let utc = value.to_offset(UtcOffset::UTC);
    let utc = utc.replace_nanosecond(0).unwrap_or(utc);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
    ))
    .expect("fixed-width UTC formatting should never fail")
}

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn now_utc_rfc3339() -> String {
    format_timestamp(now_utc())
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

/// Accepts either an RFC3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp_or_date(raw: &str) -> Option<OffsetDateTime> {
    parse_timestamp(raw).or_else(|| parse_date_utc(raw))
}

pub fn parse_date_utc(raw: &str) -> Option<OffsetDateTime> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

pub fn normalize_timestamp(raw: Option<&str>) -> Option<String> {
    parse_timestamp_or_date(raw?).map(format_timestamp)
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, normalize_timestamp, parse_date_utc, parse_timestamp};
    use time::OffsetDateTime;

    #[test]
    fn formats_fixed_width_utc_without_fraction() {
        let ts = parse_timestamp("2026-03-01T12:30:15.987+02:00").expect("timestamp should parse");
        assert_eq!(format_timestamp(ts), "2026-03-01T10:30:15Z");
    }

    #[test]
    fn stored_format_orders_lexicographically() {
        let earlier = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid epoch");
        let later = earlier + time::Duration::milliseconds(1500);
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn parses_bare_dates_as_utc_midnight() {
        let ts = parse_date_utc("2026-02-03").expect("date should parse");
        assert_eq!(format_timestamp(ts), "2026-02-03T00:00:00Z");
        assert!(parse_date_utc("03/02/2026").is_none());
    }

    #[test]
    fn normalize_rejects_blank_and_garbage() {
        assert!(normalize_timestamp(Some("   ")).is_none());
        assert!(normalize_timestamp(Some("yesterday")).is_none());
        assert!(normalize_timestamp(None).is_none());
        assert_eq!(
            normalize_timestamp(Some("2026-02-03T04:05:06Z")).as_deref(),
            Some("2026-02-03T04:05:06Z")
        );
    }
}
