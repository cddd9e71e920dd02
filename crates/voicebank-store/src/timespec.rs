//! Human time strings (`90`, `1:30`, `1:02:03.5`) to seconds.

use crate::error::StoreError;

/// Parses a time string into seconds.
///
/// Accepted forms:
///
/// - a bare number of seconds, fractional allowed (`95.5`)
/// - `MM:SS` where minutes are an integer and seconds may be fractional
/// - `HH:MM:SS` with the same rules, minutes below 60
///
/// Seconds fields must be below 60. Hours, the minutes of `MM:SS`, and bare
/// seconds have no upper bound.
///
/// # Errors
///
/// Returns [`StoreError::InvalidTimeSpec`] for empty input, non-numeric or
/// negative fields, out-of-range fields, a wrong number of fields, or a
/// total too large to represent in whole seconds.
pub fn parse_timespec(text: &str) -> Result<f64, StoreError> {
    let raw = text.trim();
    let invalid = |reason| StoreError::InvalidTimeSpec {
        value: text.to_string(),
        reason,
    };

    if raw.is_empty() {
        return Err(invalid("empty time value is not allowed"));
    }

    if !raw.contains(':') {
        let seconds: f64 = raw
            .parse()
            .map_err(|_| invalid("use seconds or MM:SS / HH:MM:SS"))?;
        if !seconds.is_finite() {
            return Err(invalid("use seconds or MM:SS / HH:MM:SS"));
        }
        if seconds < 0.0 {
            return Err(invalid("time cannot be negative"));
        }
        return Ok(seconds);
    }

    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let numeric = || invalid("use MM:SS or HH:MM:SS with numeric fields");
    let (hours, minutes, seconds) = match parts.as_slice() {
        [mm, ss] => (
            0_i64,
            mm.parse::<i64>().map_err(|_| numeric())?,
            ss.parse::<f64>().map_err(|_| numeric())?,
        ),
        [hh, mm, ss] => (
            hh.parse::<i64>().map_err(|_| numeric())?,
            mm.parse::<i64>().map_err(|_| numeric())?,
            ss.parse::<f64>().map_err(|_| numeric())?,
        ),
        _ => return Err(invalid("use MM:SS or HH:MM:SS")),
    };

    if !seconds.is_finite() {
        return Err(numeric());
    }
    if hours < 0 || minutes < 0 || seconds < 0.0 {
        return Err(invalid("time cannot be negative"));
    }
    if parts.len() == 3 && minutes >= 60 {
        return Err(invalid("in HH:MM:SS format, MM must be < 60"));
    }
    if seconds >= 60.0 {
        return Err(invalid("SS must be < 60"));
    }

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .ok_or_else(|| invalid("time value is too large"))?;
    Ok(whole as f64 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_seconds() {
        assert_eq!(parse_timespec("90").unwrap(), 90.0);
        assert_eq!(parse_timespec(" 12.25 ").unwrap(), 12.25);
        assert_eq!(parse_timespec("7200").unwrap(), 7200.0);
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(parse_timespec("21:34").unwrap(), 1294.0);
        assert_eq!(parse_timespec("1:00").unwrap(), 60.0);
        assert_eq!(parse_timespec("0:05.5").unwrap(), 5.5);
        // Minutes are unbounded in MM:SS form.
        assert_eq!(parse_timespec("90:00").unwrap(), 5400.0);
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(parse_timespec("1:21:34").unwrap(), 4894.0);
        assert_eq!(parse_timespec("100:00:01").unwrap(), 360_001.0);
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in [
            "", "   ", "abc", "1:xx", "1:2:3:4", "1:60", "1:60:00", "0:00:60", "-5", "-1:00",
            "1:-5", "inf", "nan", "1:30.5:00",
        ] {
            let err = parse_timespec(raw).expect_err(raw);
            assert!(
                matches!(err, StoreError::InvalidTimeSpec { .. }),
                "unexpected error for {raw:?}: {err:?}"
            );
        }
    }

    #[test]
    fn huge_fields_are_rejected_not_wrapped() {
        for raw in [
            "9999999999999999:00:00",
            "3074457345618258602:59",
            "99999999999999999999:00",
        ] {
            let err = parse_timespec(raw).expect_err(raw);
            assert!(matches!(err, StoreError::InvalidTimeSpec { .. }));
        }
        assert_eq!(parse_timespec("100000:00:00").unwrap(), 360_000_000.0);
    }
}
