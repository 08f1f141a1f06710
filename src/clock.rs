//! Wall clock sampling: device timezone plus the daylight saving override.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerseError;
use crate::resolver::{ClockConvention, TimeSample};

/// Override for regions where the device clock gets daylight saving wrong
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstOverride {
    #[default]
    Auto,
    AlwaysDst,
    NeverDst,
}

/// Timezone of the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Zone {
    /// Whatever the host is configured with
    #[default]
    Local,
    /// Fixed offset from UTC; `UTC` is `Fixed(0)`
    Fixed(FixedOffset),
    /// IANA zone such as `US/Eastern`, with its own daylight saving rules
    Named(Tz),
}

impl FromStr for Zone {
    type Err = VerseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if value.eq_ignore_ascii_case("utc") || value == "Z" {
            return Ok(Zone::Fixed(Utc.fix()));
        }
        if let Some(offset) = parse_offset(value) {
            return Ok(Zone::Fixed(offset));
        }
        value
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| VerseError::InvalidStyle(format!("unknown timezone '{}'", value)))
    }
}

/// `+HH`, `+HHMM` or `+HH:MM`
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Offset of `zone` outside daylight saving: the smaller of its January and July offsets
fn standard_offset_of<Z: TimeZone>(zone: &Z, at: DateTime<FixedOffset>) -> FixedOffset {
    let year = at.year();
    let offset_at = |month: u32| {
        zone.with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .earliest()
            .map(|t| t.offset().fix())
    };
    match (offset_at(1), offset_at(7)) {
        (Some(jan), Some(jul)) => {
            if jan.local_minus_utc() <= jul.local_minus_utc() {
                jan
            } else {
                jul
            }
        }
        _ => *at.offset(),
    }
}

impl TryFrom<String> for Zone {
    type Error = VerseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Zone> for String {
    fn from(value: Zone) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) if offset.local_minus_utc() == 0 => f.write_str("UTC"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl Zone {
    /// Current time in this zone
    pub fn now(self) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => Local::now().fixed_offset(),
            Zone::Fixed(offset) => Utc::now().with_timezone(&offset),
            Zone::Named(tz) => Utc::now().with_timezone(&tz).fixed_offset(),
        }
    }

    /// Offset the zone uses outside daylight saving around `at`
    pub fn standard_offset(self, at: DateTime<FixedOffset>) -> FixedOffset {
        match self {
            Zone::Fixed(offset) => offset,
            Zone::Local => standard_offset_of(&Local, at),
            Zone::Named(tz) => standard_offset_of(&tz, at),
        }
    }
}

/// Shift `now` by an hour when the override disagrees with the zone's DST state
pub fn apply_dst_override(
    now: DateTime<FixedOffset>,
    standard: FixedOffset,
    dst_override: DstOverride,
) -> DateTime<FixedOffset> {
    let in_dst = now.offset().local_minus_utc() > standard.local_minus_utc();
    match dst_override {
        DstOverride::AlwaysDst if !in_dst => now + Duration::hours(1),
        DstOverride::NeverDst if in_dst => now - Duration::hours(1),
        _ => now,
    }
}

/// Current display time for `zone`, with the override applied
pub fn current_time(zone: Zone, dst_override: DstOverride) -> DateTime<FixedOffset> {
    let now = zone.now();
    apply_dst_override(now, zone.standard_offset(now), dst_override)
}

/// Clock reading for the resolver
pub fn sample<Z: TimeZone>(
    time: &DateTime<Z>,
    convention: ClockConvention,
) -> Result<TimeSample, VerseError> {
    TimeSample::new(time.hour(), time.minute(), convention)
}

/// Parse a `HH:MM` override from the command line
pub fn parse_hh_mm(value: &str, convention: ClockConvention) -> Result<TimeSample, VerseError> {
    let invalid = || VerseError::UnreadableTime(value.trim().to_string());
    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour = hour.parse::<u32>().map_err(|_| invalid())?;
    let minute = minute.parse::<u32>().map_err(|_| invalid())?;
    TimeSample::new(hour, minute, convention)
}

/// `now` moved to the `HH:MM` given on the command line, same day and zone
pub fn with_hh_mm(
    now: DateTime<FixedOffset>,
    value: &str,
) -> Result<DateTime<FixedOffset>, VerseError> {
    let time = parse_hh_mm(value, ClockConvention::TwentyFourHour)?;
    now.with_hour(time.hour())
        .and_then(|t| t.with_minute(time.minute()))
        .and_then(|t| t.with_second(0))
        .ok_or(VerseError::InvalidTime {
            hour: time.hour(),
            minute: time.minute(),
        })
}

/// Seed that changes every hour, used to vary the matching book
pub fn hourly_seed<Z: TimeZone>(time: &DateTime<Z>) -> u32 {
    time.ordinal() * 24 + time.hour()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    fn at(offset: FixedOffset, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        offset.with_ymd_and_hms(2025, 3, 20, hour, minute, 0).unwrap()
    }

    #[test]
    fn always_dst_adds_an_hour_on_standard_time() {
        let est = fixed(-5);
        let now = at(est, 2, 16);
        let shifted = apply_dst_override(now, est, DstOverride::AlwaysDst);
        assert_eq!((shifted.hour(), shifted.minute()), (3, 16));
    }

    #[test]
    fn never_dst_removes_an_hour_during_dst() {
        let now = at(fixed(-4), 4, 16);
        let shifted = apply_dst_override(now, fixed(-5), DstOverride::NeverDst);
        assert_eq!(shifted.hour(), 3);
    }

    #[test]
    fn override_is_a_no_op_when_already_matching() {
        let now = at(fixed(-4), 4, 0);
        assert_eq!(apply_dst_override(now, fixed(-5), DstOverride::AlwaysDst), now);
        assert_eq!(apply_dst_override(now, fixed(-5), DstOverride::Auto), now);
        let winter = at(fixed(-5), 4, 0);
        assert_eq!(apply_dst_override(winter, fixed(-5), DstOverride::NeverDst), winter);
    }

    #[test]
    fn parses_zones() {
        assert_eq!("local".parse::<Zone>(), Ok(Zone::Local));
        assert_eq!("UTC".parse::<Zone>(), Ok(Zone::Fixed(fixed(0))));
        assert_eq!("+05:30".parse::<Zone>(), Ok(Zone::Fixed(FixedOffset::east_opt(19800).unwrap())));
        assert_eq!("-0500".parse::<Zone>(), Ok(Zone::Fixed(fixed(-5))));
        assert_eq!("US/Eastern".parse::<Zone>(), Ok(Zone::Named(Tz::US__Eastern)));
        assert_eq!(Zone::Named(Tz::Europe__Helsinki).to_string(), "Europe/Helsinki");
        assert!("Mars/Olympus".parse::<Zone>().is_err());
        assert!("+25".parse::<Zone>().is_err());
    }

    #[test]
    fn named_zone_knows_its_standard_offset() {
        let eastern = Zone::Named(Tz::US__Eastern);
        let summer = Tz::US__Eastern
            .with_ymd_and_hms(2025, 7, 4, 3, 16, 0)
            .unwrap()
            .fixed_offset();
        assert_eq!(summer.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(eastern.standard_offset(summer), fixed(-5));

        // southern hemisphere: standard time is the July offset
        let sydney = Zone::Named(Tz::Australia__Sydney);
        assert_eq!(sydney.standard_offset(summer), fixed(10));

        let shifted = apply_dst_override(summer, eastern.standard_offset(summer), DstOverride::NeverDst);
        assert_eq!((shifted.hour(), shifted.minute()), (2, 16));
    }

    #[test]
    fn hh_mm_parsing_validates_range() {
        let t = parse_hh_mm("03:16", ClockConvention::TwentyFourHour).unwrap();
        assert_eq!((t.hour(), t.minute()), (3, 16));
        assert!(matches!(
            parse_hh_mm("25:00", ClockConvention::TwentyFourHour),
            Err(VerseError::InvalidTime { hour: 25, minute: 0 })
        ));
        assert_eq!(
            parse_hh_mm(" noon ", ClockConvention::TwentyFourHour),
            Err(VerseError::UnreadableTime("noon".into()))
        );
        assert_eq!(
            parse_hh_mm("3:x6", ClockConvention::TwentyFourHour),
            Err(VerseError::UnreadableTime("3:x6".into()))
        );
    }

    #[test]
    fn hh_mm_override_keeps_the_day() {
        let moved = with_hh_mm(at(fixed(2), 9, 41), "03:16").unwrap();
        assert_eq!((moved.day(), moved.hour(), moved.minute()), (20, 3, 16));
        assert!(with_hh_mm(at(fixed(2), 9, 41), "3:60").is_err());
    }

    #[test]
    fn sample_uses_wall_clock_fields() {
        let t = sample(&at(fixed(9), 23, 59), ClockConvention::TwentyFourHour).unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));
    }
}
