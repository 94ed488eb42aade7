use chrono::{DateTime, Duration, Utc};

/// UTC timestamp `days` days from now at the given hour, minutes and
/// seconds zeroed. Negative `days` reaches into the past.
pub fn days_from_now_at(days: i64, hour: u32) -> DateTime<Utc> {
    let base = Utc::now() + Duration::days(days);
    base.date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(base)
}

pub fn tomorrow_at(hour: u32) -> DateTime<Utc> {
    days_from_now_at(1, hour)
}

pub fn yesterday_at(hour: u32) -> DateTime<Utc> {
    days_from_now_at(-1, hour)
}

/// RFC 3339 rendering with a trailing Z, the format the API validates.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
