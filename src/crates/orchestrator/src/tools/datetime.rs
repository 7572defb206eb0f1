//! Date/time parsing and query-window resolution shared by the domain tools.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

/// Hard cap on query windows, in days.
pub const MAX_QUERY_DAYS: i64 = 14;

/// Current process wall-clock time (naive local).
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a date/time argument.
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS`,
/// and the same with `/` separators. Date-only values resolve to midnight.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Some(date.and_hms_opt(0, 0, 0).expect("midnight exists"));
        }
    }

    None
}

/// Promote a date-only end bound to the end of that day.
fn to_end_of_day(dt: NaiveDateTime) -> NaiveDateTime {
    use chrono::Timelike;
    if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
        dt.date().and_hms_opt(23, 59, 59).expect("valid time")
    } else {
        dt
    }
}

/// A resolved query window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Resolve query-window arguments into concrete bounds.
///
/// Rules:
/// - `days` defaults to 14 and is clamped to `[0, 14]`
/// - no explicit dates: `[now - days, now]`
/// - only `end_date`: `[end - days, end]` (date-only ends cover the full day)
/// - only `start_date`: `[start, now]`
/// - both bounds given: used as-is
/// - the final window is clamped to at most 14 days, keeping the end fixed
///
/// Unparseable dates return an error string ready to hand to the model.
pub fn resolve_window(
    days: Option<i64>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<QueryWindow, String> {
    let days = days.unwrap_or(MAX_QUERY_DAYS).clamp(0, MAX_QUERY_DAYS);

    let parsed_start = match start_date {
        Some(raw) => Some(parse_datetime(raw).ok_or_else(|| {
            format!("error: start date '{raw}' is not valid; use YYYY-MM-DD (e.g. 2026-03-01)")
        })?),
        None => None,
    };
    let parsed_end = match end_date {
        Some(raw) => Some(to_end_of_day(parse_datetime(raw).ok_or_else(|| {
            format!("error: end date '{raw}' is not valid; use YYYY-MM-DD (e.g. 2026-03-07)")
        })?)),
        None => None,
    };

    let (start, end) = match (parsed_start, parsed_end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, now()),
        (None, Some(end)) => (end - Duration::days(days), end),
        (None, None) => {
            let end = now();
            (end - Duration::days(days), end)
        }
    };

    let start = if end - start > Duration::days(MAX_QUERY_DAYS) {
        end - Duration::days(MAX_QUERY_DAYS)
    } else {
        start
    };

    Ok(QueryWindow { start, end })
}

/// Render an event time the way tool replies show it.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        assert!(parse_datetime("2026-03-15").is_some());
        assert!(parse_datetime("2026-03-15 14:30").is_some());
        assert!(parse_datetime("2026-03-15 14:30:45").is_some());
        assert!(parse_datetime("2026/03/15").is_some());
        assert!(parse_datetime("2026/03/15 14:30").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("yesterday").is_none());
        assert!(parse_datetime("15-03-2026").is_none());
        assert!(parse_datetime("2026-13-40").is_none());
    }

    #[test]
    fn default_window_is_fourteen_days_ending_now() {
        let window = resolve_window(None, None, None).unwrap();
        assert_eq!(window.end - window.start, Duration::days(14));
    }

    #[test]
    fn days_beyond_cap_are_clamped() {
        let window = resolve_window(Some(50), None, None).unwrap();
        assert_eq!(window.end - window.start, Duration::days(14));
    }

    #[test]
    fn zero_days_is_an_empty_window() {
        let window = resolve_window(Some(0), None, None).unwrap();
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn end_only_anchors_window_at_end() {
        let window = resolve_window(Some(7), None, Some("2026-03-10")).unwrap();
        assert_eq!(
            window.end,
            parse_datetime("2026-03-10 23:59:59").unwrap()
        );
        assert_eq!(window.end - window.start, Duration::days(7));
    }

    #[test]
    fn start_only_runs_to_now() {
        let start = now() - Duration::days(3);
        let raw = start.format("%Y-%m-%d %H:%M").to_string();
        let window = resolve_window(None, Some(&raw), None).unwrap();
        assert!(window.end >= window.start);
        assert!(window.end - window.start <= Duration::days(14));
    }

    #[test]
    fn explicit_bounds_wider_than_cap_are_clamped_keeping_end() {
        let window =
            resolve_window(None, Some("2026-01-01"), Some("2026-03-01")).unwrap();
        assert_eq!(
            window.end,
            parse_datetime("2026-03-01 23:59:59").unwrap()
        );
        assert_eq!(window.end - window.start, Duration::days(14));
    }

    #[test]
    fn bad_dates_produce_error_strings() {
        let err = resolve_window(None, Some("soon"), None).unwrap_err();
        assert!(err.starts_with("error:"));
        let err = resolve_window(None, None, Some("later")).unwrap_err();
        assert!(err.starts_with("error:"));
    }
}
