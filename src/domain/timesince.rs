use time::OffsetDateTime;

const CHUNKS: [(i64, &str, &str); 6] = [
    (60 * 60 * 24 * 365, "year", "years"),
    (60 * 60 * 24 * 30, "month", "months"),
    (60 * 60 * 24 * 7, "week", "weeks"),
    (60 * 60 * 24, "day", "days"),
    (60 * 60, "hour", "hours"),
    (60, "minute", "minutes"),
];

/// Largest whole unit elapsed between `from` and `to`, e.g. "3 weeks".
pub fn timesince_coarse(from: OffsetDateTime, to: OffsetDateTime) -> String {
    coarse((to - from).whole_seconds())
}

pub fn timeuntil_coarse(target: OffsetDateTime, now: OffsetDateTime) -> String {
    coarse((target - now).whole_seconds())
}

fn coarse(seconds: i64) -> String {
    if seconds <= 0 {
        return "0 minutes".to_string();
    }
    for (size, singular, plural) in CHUNKS {
        let count = seconds / size;
        if count > 0 {
            let unit = if count == 1 { singular } else { plural };
            return format!("{count} {unit}");
        }
    }
    "0 minutes".to_string()
}
