//! UTC timestamps with millisecond display precision
//!
//! On the wire (and in [`Timestamp::seconds_since_epoch`]) a timestamp is a
//! double-precision count of seconds since the Unix epoch. The textual form
//! is RFC 3339 in UTC, e.g. `2015-05-16T19:50:21.002Z`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

const DISPLAY_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Current time, truncated to whole milliseconds.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = (now.nanosecond() / 1_000_000) * 1_000_000;
        Self(now.replace_nanosecond(millis).unwrap_or(now))
    }

    /// Builds a timestamp from fractional seconds since the epoch, rounding
    /// to the nearest microsecond.
    ///
    /// Returns `None` for non-finite or out-of-range inputs.
    pub fn from_epoch_seconds(secs: f64) -> Option<Self> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let micros = ((secs - whole) * 1e6).round() as i64;
        let base = OffsetDateTime::from_unix_timestamp(whole as i64).ok()?;
        base.checked_add(Duration::microseconds(micros)).map(Self)
    }

    pub fn seconds_since_epoch(&self) -> f64 {
        self.0.unix_timestamp() as f64 + f64::from(self.0.nanosecond()) / 1e9
    }

    /// Parses an RFC 3339 timestamp, normalizing it to UTC.
    pub fn parse(s: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(s, &Rfc3339).map(|dt| Self(dt.to_offset(UtcOffset::UTC)))
    }

    #[inline]
    pub fn as_datetime(&self) -> &OffsetDateTime {
        &self.0
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(UtcOffset::UTC))
    }
}

impl FromStr for Timestamp {
    type Err = time::error::Parse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.format(DISPLAY_FORMAT) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn epoch_roundtrip() {
        let ts = Timestamp::now();
        let secs = ts.seconds_since_epoch();
        assert_eq!(Timestamp::from_epoch_seconds(secs), Some(ts));
    }

    #[test]
    fn parse_and_display() {
        let ts = Timestamp::parse("2015-05-17T01:37:09.534Z").unwrap();
        assert_eq!(ts.to_string(), "2015-05-17T01:37:09.534Z");
        assert_eq!(ts, "2015-05-17T01:37:09.534Z".parse().unwrap());
        assert!(Timestamp::parse("20170420T15:04:05.999Z").is_err());
    }

    #[test]
    fn epoch_seconds_bits() {
        let ts = Timestamp::parse("2015-05-16T19:50:21.002Z").unwrap();
        assert_eq!(
            ts.seconds_since_epoch().to_be_bytes(),
            [65, 213, 85, 231, 223, 64, 32, 197]
        );
    }

    #[test]
    fn non_finite_rejected() {
        assert_eq!(Timestamp::from_epoch_seconds(f64::NAN), None);
        assert_eq!(Timestamp::from_epoch_seconds(f64::INFINITY), None);
    }
}
