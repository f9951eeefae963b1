//! HTTP date handling and clock skew checks.
//!
//! Signed requests carry an RFC 2822 / IMF-fixdate `date` header, for example
//! `Tue, 15 Nov 1994 08:12:31 GMT`. A request is fresh when the absolute
//! difference between that instant and the verifier's clock is within the
//! configured skew, in either direction.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AuthError;

/// `strftime` format for IMF-fixdate.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parse an HTTP `date` header value.
///
/// # Errors
///
/// Returns [`AuthError::StaleTimestamp`] if the value is not a valid date. An
/// unparsable date is treated the same as one outside the window.
pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AuthError::StaleTimestamp)
}

/// Format `instant` as an IMF-fixdate header value.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use signgate_auth::timestamp::format_http_date;
///
/// let instant = Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap();
/// assert_eq!(format_http_date(instant), "Tue, 15 Nov 1994 08:12:31 GMT");
/// ```
#[must_use]
pub fn format_http_date(instant: DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}

/// Check that `date` lies within `skew_millis` of `now`, in either direction.
///
/// # Errors
///
/// Returns [`AuthError::StaleTimestamp`] when the difference exceeds the window.
pub fn check_skew(date: DateTime<Utc>, now: DateTime<Utc>, skew_millis: u64) -> Result<(), AuthError> {
    let window = i64::try_from(skew_millis).map_or(TimeDelta::MAX, TimeDelta::milliseconds);
    if (now - date).abs() > window {
        return Err(AuthError::StaleTimestamp);
    }
    Ok(())
}

/// Parse a `date` header value and check it against `now`.
///
/// # Errors
///
/// Returns [`AuthError::StaleTimestamp`] if the value is unparsable or stale.
pub fn check_date_header(value: &str, now: DateTime<Utc>, skew_millis: u64) -> Result<(), AuthError> {
    check_skew(parse_http_date(value)?, now, skew_millis)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SKEW: u64 = 300_000;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_should_parse_imf_fixdate() {
        let parsed = parse_http_date("Fri, 01 Mar 2024 12:00:00 GMT").unwrap();
        assert_eq!(parsed, now());
    }

    #[test]
    fn test_should_parse_numeric_offset() {
        let parsed = parse_http_date("Fri, 01 Mar 2024 13:00:00 +0100").unwrap();
        assert_eq!(parsed, now());
    }

    #[test]
    fn test_should_round_trip_formatted_date() {
        assert_eq!(parse_http_date(&format_http_date(now())).unwrap(), now());
    }

    #[test]
    fn test_should_reject_unparsable_date() {
        assert_eq!(parse_http_date("yesterday"), Err(AuthError::StaleTimestamp));
        assert_eq!(parse_http_date(""), Err(AuthError::StaleTimestamp));
    }

    #[test]
    fn test_should_accept_date_at_window_edge() {
        let edge = TimeDelta::milliseconds(300_000);
        assert!(check_skew(now() - edge, now(), SKEW).is_ok());
        assert!(check_skew(now() + edge, now(), SKEW).is_ok());
    }

    #[test]
    fn test_should_reject_date_past_window_in_both_directions() {
        let beyond = TimeDelta::milliseconds(300_001);
        assert_eq!(check_skew(now() - beyond, now(), SKEW), Err(AuthError::StaleTimestamp));
        assert_eq!(check_skew(now() + beyond, now(), SKEW), Err(AuthError::StaleTimestamp));
    }

    #[test]
    fn test_should_check_header_value() {
        assert!(check_date_header("Fri, 01 Mar 2024 12:04:59 GMT", now(), SKEW).is_ok());
        assert_eq!(
            check_date_header("Fri, 01 Mar 2024 11:54:59 GMT", now(), SKEW),
            Err(AuthError::StaleTimestamp)
        );
    }
}
