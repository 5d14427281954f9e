//! [`Instant`] — the value type backing the `Timestamp`
//! [`crate::SerialKind`] (supplemented per SPEC_FULL §3; the spec discusses
//! timestamp precision boundaries in §4.6.1/§9 but leaves the value type
//! itself unspecified). The type itself is a plain offset from the Unix
//! epoch; it never carries a timezone and application code never performs
//! calendar arithmetic on it, the same way big-number arithmetic stays out
//! of scope (spec §1). Calendar/text conversion for the two wire timestamp
//! formats is delegated to `time`, the same crate `facet-core` uses for
//! this concern.

/// A point in time as an offset from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    seconds: i64,
    subsecond_nanos: u32,
}

impl Instant {
    /// The largest representable instant, matching the spec's
    /// `Instant.MAX_VALUE` boundary (§9): `i64::MAX` seconds.
    pub const MAX_VALUE: Instant = Instant {
        seconds: i64::MAX,
        subsecond_nanos: 0,
    };

    /// Build from whole epoch seconds plus a sub-second nanosecond offset.
    pub const fn new(seconds: i64, subsecond_nanos: u32) -> Self {
        Self {
            seconds,
            subsecond_nanos,
        }
    }

    /// Build from whole epoch seconds.
    pub const fn from_epoch_seconds(seconds: i64) -> Self {
        Self::new(seconds, 0)
    }

    /// Build from milliseconds since the epoch.
    pub fn from_epoch_millis(millis: i64) -> Self {
        let seconds = millis.div_euclid(1000);
        let rem_millis = millis.rem_euclid(1000);
        Self::new(seconds, (rem_millis as u32) * 1_000_000)
    }

    /// Build from a fractional number of seconds since the epoch, as CBOR
    /// tag 1 and form-url `EpochSeconds` both carry (§4.6.1, §4.5).
    pub fn from_epoch_seconds_f64(value: f64) -> Self {
        let seconds = value.floor();
        let frac = value - seconds;
        Self::new(seconds as i64, (frac * 1_000_000_000.0).round() as u32)
    }

    /// Whole epoch seconds (truncated toward negative infinity).
    pub const fn epoch_seconds(self) -> i64 {
        self.seconds
    }

    /// Sub-second remainder, in nanoseconds.
    pub const fn subsecond_nanos(self) -> u32 {
        self.subsecond_nanos
    }

    /// Milliseconds since the epoch, losing any sub-millisecond precision
    /// (spec §8: "CBOR Timestamp decode loses sub-millisecond precision").
    pub fn epoch_millis(self) -> i64 {
        self.seconds * 1000 + (self.subsecond_nanos / 1_000_000) as i64
    }

    /// Fractional seconds since the epoch, as an `f64` (the CBOR tag-1
    /// encode path, spec §9: "uses Float64 seconds ... for all timestamps").
    pub fn epoch_seconds_f64(self) -> f64 {
        self.seconds as f64 + self.subsecond_nanos as f64 / 1_000_000_000.0
    }
}

fn weekday_abbrev(w: time::Weekday) -> &'static str {
    use time::Weekday::*;
    match w {
        Monday => "Mon",
        Tuesday => "Tue",
        Wednesday => "Wed",
        Thursday => "Thu",
        Friday => "Fri",
        Saturday => "Sat",
        Sunday => "Sun",
    }
}

fn month_abbrev(m: time::Month) -> &'static str {
    use time::Month::*;
    match m {
        January => "Jan",
        February => "Feb",
        March => "Mar",
        April => "Apr",
        May => "May",
        June => "Jun",
        July => "Jul",
        August => "Aug",
        September => "Sep",
        October => "Oct",
        November => "Nov",
        December => "Dec",
    }
}

fn month_from_abbrev(name: &str) -> Option<time::Month> {
    use time::Month::*;
    Some(match name {
        "Jan" => January,
        "Feb" => February,
        "Mar" => March,
        "Apr" => April,
        "May" => May,
        "Jun" => June,
        "Jul" => July,
        "Aug" => August,
        "Sep" => September,
        "Oct" => October,
        "Nov" => November,
        "Dec" => December,
        _ => return None,
    })
}

#[cfg(feature = "alloc")]
impl Instant {
    /// ISO-8601 `date-time` text (`2023-03-07T12:34:56Z`), per the
    /// `TimestampFormat::DateTime` trait.
    pub fn to_iso8601(self) -> alloc::string::String {
        use time::OffsetDateTime;
        use time::format_description::well_known::Rfc3339;
        OffsetDateTime::from_unix_timestamp(self.seconds)
            .ok()
            .and_then(|dt| dt.replace_nanosecond(self.subsecond_nanos).ok())
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| alloc::string::String::from("1970-01-01T00:00:00Z"))
    }

    /// Parse an ISO-8601 `date-time` string produced by [`Instant::to_iso8601`].
    pub fn parse_iso8601(text: &str) -> Option<Instant> {
        use time::OffsetDateTime;
        use time::format_description::well_known::Rfc3339;
        let dt = OffsetDateTime::parse(text, &Rfc3339).ok()?;
        Some(Instant::new(dt.unix_timestamp(), dt.nanosecond()))
    }

    /// RFC 2822 / HTTP-date text (`Tue, 07 Mar 2023 12:34:56 GMT`), per the
    /// `TimestampFormat::HttpDate` trait.
    pub fn to_rfc2822(self) -> alloc::string::String {
        use alloc::format;
        use time::OffsetDateTime;
        let dt = match OffsetDateTime::from_unix_timestamp(self.seconds) {
            Ok(dt) => dt,
            Err(_) => return alloc::string::String::from("Thu, 01 Jan 1970 00:00:00 GMT"),
        };
        format!(
            "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
            weekday_abbrev(dt.weekday()),
            dt.day(),
            month_abbrev(dt.month()),
            dt.year(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }

    /// Parse an RFC 2822 / HTTP-date string produced by [`Instant::to_rfc2822`].
    pub fn parse_rfc2822(text: &str) -> Option<Instant> {
        use time::{Date, Time};
        let rest = text.split_once(", ")?.1;
        let mut parts = rest.split_whitespace();
        let d: u8 = parts.next()?.parse().ok()?;
        let month = month_from_abbrev(parts.next()?)?;
        let y: i32 = parts.next()?.parse().ok()?;
        let time_text = parts.next()?;
        let mut time_parts = time_text.split(':');
        let h: u8 = time_parts.next()?.parse().ok()?;
        let min: u8 = time_parts.next()?.parse().ok()?;
        let s: u8 = time_parts.next()?.parse().ok()?;
        let date = Date::from_calendar_date(y, month, d).ok()?;
        let time = Time::from_hms(h, min, s).ok()?;
        let seconds = date.with_time(time).assume_utc().unix_timestamp();
        Some(Instant::from_epoch_seconds(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_roundtrip() {
        let i = Instant::from_epoch_seconds(1_678_192_496);
        let text = i.to_iso8601();
        assert_eq!(text, "2023-03-07T12:34:56Z");
        assert_eq!(Instant::parse_iso8601(&text), Some(i));
    }

    #[test]
    fn rfc2822_roundtrip() {
        let i = Instant::from_epoch_seconds(1_678_192_496);
        let text = i.to_rfc2822();
        assert_eq!(text, "Tue, 07 Mar 2023 12:34:56 GMT");
        assert_eq!(Instant::parse_rfc2822(&text), Some(i));
    }

    #[test]
    fn millis_roundtrip_within_precision() {
        let i = Instant::from_epoch_millis(1_700_000_123_456);
        assert_eq!(i.epoch_millis(), 1_700_000_123_456);
    }

    #[test]
    fn float_roundtrip_within_tolerance() {
        let i = Instant::new(1_700_000_000, 250_000_000);
        let back = Instant::from_epoch_seconds_f64(i.epoch_seconds_f64());
        assert!((back.epoch_millis() - i.epoch_millis()).abs() <= 1);
    }
}
