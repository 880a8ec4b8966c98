//! Timestamp representation and its persisted text form.

use crate::error::{CheckpointError, CheckpointResult};
use chrono::{DateTime, FixedOffset, SubsecRound};

/// A repository modification time with the offset it was observed in.
pub type Timestamp = DateTime<FixedOffset>;

/// Format used when persisting timestamps, e.g. `2015-04-01T10:00:00.100-0700`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Accepts any fractional precision on input.
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Cuts a timestamp to the millisecond precision it is persisted at.
///
/// Every time that is compared against a checkpoint position must pass
/// through here first, otherwise a reloaded position sorts before the object
/// it was advanced past.
#[must_use]
pub fn truncate_timestamp(time: Timestamp) -> Timestamp {
    time.trunc_subsecs(3)
}

/// Formats a timestamp at millisecond precision.
#[must_use]
pub fn format_timestamp(time: &Timestamp) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a persisted timestamp.
///
/// Accepts [`TIMESTAMP_FORMAT`] and RFC 3339. Finer fractions are cut to
/// milliseconds.
pub fn parse_timestamp(input: &str) -> CheckpointResult<Timestamp> {
    DateTime::parse_from_str(input, PARSE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(input))
        .map(truncate_timestamp)
        .map_err(|e| CheckpointError::format(format!("invalid timestamp {input:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_offset() {
        let text = "2015-04-01T10:00:00.100-0700";
        let time = parse_timestamp(text).unwrap();
        assert_eq!(format_timestamp(&time), text);
    }

    #[test]
    fn accepts_rfc3339() {
        let time = parse_timestamp("2015-04-01T17:00:00.1Z").unwrap();
        assert_eq!(format_timestamp(&time), "2015-04-01T17:00:00.100+0000");
    }

    #[test]
    fn zero_millis_are_written() {
        let time = parse_timestamp("2015-04-01T10:00:00+0000").unwrap();
        assert_eq!(format_timestamp(&time), "2015-04-01T10:00:00.000+0000");
    }

    #[test]
    fn sub_millisecond_fractions_are_cut() {
        let fine = parse_timestamp("2015-04-01T10:00:00.000500Z").unwrap();
        let coarse = parse_timestamp("2015-04-01T10:00:00.000+0000").unwrap();
        assert_eq!(fine, coarse);
        assert_eq!(parse_timestamp(&format_timestamp(&fine)).unwrap(), fine);
    }

    #[test]
    fn truncate_is_idempotent() {
        let time = DateTime::parse_from_rfc3339("2015-04-01T10:00:00.123456789Z").unwrap();
        let cut = truncate_timestamp(time);
        assert_eq!(format_timestamp(&cut), "2015-04-01T10:00:00.123+0000");
        assert_eq!(truncate_timestamp(cut), cut);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(err.is_format());
    }
}
