use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parses the date formats feeds and pages commonly carry.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Like [`parse_datetime`], falling back to `fallback` for missing or unparseable input.
pub fn parse_or(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    match raw.and_then(parse_datetime) {
        Some(dt) => dt,
        None => {
            if let Some(raw) = raw {
                tracing::debug!("Unparseable date {:?}, using fallback", raw);
            }
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_known_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-05T14:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T16:30:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("Tue, 05 Mar 2024 14:30:00 GMT"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_or_falls_back() {
        let now = Utc::now();
        assert_eq!(parse_or(Some("yesterday-ish"), now), now);
        assert_eq!(parse_or(None, now), now);
    }
}
