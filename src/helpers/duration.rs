//! Conversion between user supplied queue offsets and milliseconds

use thiserror::Error;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Reasons an offset string could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("expected a duration in hh:mm format, got '{0}'")]
    Malformed(String),

    #[error("'{0}' is not a non-negative whole number")]
    NotANumber(String),

    #[error("duration '{0}' is too large")]
    OutOfRange(String),
}

/// Parse an `hh:mm` offset into milliseconds.
///
/// Hours and minutes are non-negative integers; minutes are not capped, so
/// `0:90` is ninety minutes. Anything else is rejected with a
/// [`DurationError`] so the caller can ask again.
pub fn parse_duration(text: &str) -> Result<u64, DurationError> {
    let text = text.trim();
    let mut parts = text.split(':');

    let (hours, minutes) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), None) => (h.trim(), m.trim()),
        _ => return Err(DurationError::Malformed(text.to_string())),
    };

    let hours = parse_component(hours)?;
    let minutes = parse_component(minutes)?;

    hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|h| minutes.checked_mul(MS_PER_MINUTE).and_then(|m| h.checked_add(m)))
        .ok_or_else(|| DurationError::OutOfRange(text.to_string()))
}

fn parse_component(part: &str) -> Result<u64, DurationError> {
    // u64::from_str accepts a leading '+', which is not a valid offset
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(DurationError::NotANumber(part.to_string()));
    }
    part.parse::<u64>()
        .map_err(|_| DurationError::OutOfRange(part.to_string()))
}

/// Format milliseconds as `h:mm:ss.mmm`
pub fn format_duration(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;

    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse_duration("0:00"), Ok(0));
        assert_eq!(parse_duration("0:05"), Ok(300_000));
        assert_eq!(parse_duration("1:30"), Ok(5_400_000));
        assert_eq!(parse_duration(" 2:00\n"), Ok(7_200_000));
    }

    #[test]
    fn test_parse_uncapped_minutes() {
        assert_eq!(parse_duration("0:90"), Ok(5_400_000));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(parse_duration("bad"), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration("1"), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration(""), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration("1:2:3"), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration("a:10"), Err(DurationError::NotANumber(_))));
        assert!(matches!(parse_duration("-1:10"), Err(DurationError::NotANumber(_))));
        assert!(matches!(parse_duration("+1:10"), Err(DurationError::NotANumber(_))));
        assert!(matches!(parse_duration("1:"), Err(DurationError::NotANumber(_))));
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            parse_duration("99999999999999999999:00"),
            Err(DurationError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_duration("18446744073709:00"),
            Err(DurationError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(0), "0:00:00.000");
        assert_eq!(format_duration(380_000), "0:06:20.000");
        assert_eq!(format_duration(3_723_004), "1:02:03.004");
        assert_eq!(format_duration(36_000_000 + 59_999), "10:00:59.999");
    }

    #[test]
    fn test_round_trip_hours_and_minutes() {
        for h in [0u64, 1, 7, 23, 100] {
            for m in [0u64, 1, 9, 30, 59] {
                let formatted = format_duration(parse_duration(&format!("{}:{}", h, m)).unwrap());
                let mut fields = formatted.split(':');
                assert_eq!(fields.next().unwrap().parse::<u64>().unwrap(), h);
                assert_eq!(fields.next().unwrap().parse::<u64>().unwrap(), m);
                assert_eq!(fields.next().unwrap(), "00.000");
            }
        }
    }
}
