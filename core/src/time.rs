use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const LOCAL_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Convert a datetime picker value to an absolute UTC timestamp.
///
/// Accepts local wall-clock input (`2025-11-20T14:30`, seconds optional) or a
/// value that already carries an offset (RFC 3339). Output is
/// `YYYY-MM-DDTHH:MM:SS.sssZ`. Returns `None` for unparseable input and for
/// local times that do not exist (DST gaps).
pub fn local_input_to_utc(input: &str) -> Option<String> {
    to_utc_datetime(input).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn to_utc_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = LOCAL_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a server timestamp. The backend omits the offset for UTC values.
pub fn parse_server_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_input_is_normalized_to_utc() {
        assert_eq!(
            local_input_to_utc("2025-11-20T14:30:00+02:00").as_deref(),
            Some("2025-11-20T12:30:00.000Z")
        );
    }

    #[test]
    fn local_input_matches_local_timezone() {
        let naive = NaiveDateTime::parse_from_str("2025-11-20T14:30", "%Y-%m-%dT%H:%M").unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        assert_eq!(local_input_to_utc("2025-11-20T14:30"), Some(expected));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(local_input_to_utc("yesterday"), None);
        assert_eq!(local_input_to_utc("   "), None);
    }

    #[test]
    fn server_timestamps_without_offset_are_utc() {
        let dt = parse_server_timestamp("2025-11-20T10:00:00.250").unwrap();
        assert_eq!(dt.to_rfc3339_opts(SecondsFormat::Millis, true), "2025-11-20T10:00:00.250Z");
        assert!(parse_server_timestamp("2025-11-20T10:00:00Z").is_some());
    }
}
