use std::fmt::{self, Display};
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{
    format_description::FormatItem,
    macros::{format_description, offset},
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

const DISPLAY_FORMAT: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
const INPUT_FORMAT: &[FormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

const NANOS_PER_MILLI: i128 = 1_000_000;
const MAX_FRACTION_DIGITS: usize = 9;
const MILLIS_PER_HOUR: i128 = 3_600_000;
/// Longest digit string still read as whole seconds
const SECONDS_MAX_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("input is empty")]
    EmptyInput,
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl ConvertError {
    fn invalid<S: Into<String>>(input: S) -> Self {
        Self::InvalidFormat(input.into())
    }
}

#[derive(Debug, Error)]
#[error("unsupported timezone offset: {0}")]
pub struct UnknownOffset(pub String);

/// Resolution of a timestamp, guessed from its number of digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Seconds,
    Milliseconds,
}

impl Precision {
    #[inline]
    pub fn detect(timestamp: &str) -> Self {
        if timestamp.len() <= SECONDS_MAX_DIGITS {
            Precision::Seconds
        } else {
            Precision::Milliseconds
        }
    }
}

/// The fixed set of whole-hour offsets offered by the converter.
/// No DST handling: an offset is a flat shift of the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimezoneOffset {
    #[default]
    UtcPlus8,
    Utc,
    UtcMinus8,
    UtcPlus1,
    UtcPlus9,
}

impl TimezoneOffset {
    /// In display order
    pub const ALL: [TimezoneOffset; 5] = [
        TimezoneOffset::UtcPlus8,
        TimezoneOffset::Utc,
        TimezoneOffset::UtcMinus8,
        TimezoneOffset::UtcPlus1,
        TimezoneOffset::UtcPlus9,
    ];

    pub fn hours(self) -> i8 {
        match self {
            TimezoneOffset::UtcPlus8 => 8,
            TimezoneOffset::Utc => 0,
            TimezoneOffset::UtcMinus8 => -8,
            TimezoneOffset::UtcPlus1 => 1,
            TimezoneOffset::UtcPlus9 => 9,
        }
    }

    pub fn utc_offset(self) -> UtcOffset {
        match self {
            TimezoneOffset::UtcPlus8 => offset!(+8),
            TimezoneOffset::Utc => offset!(UTC),
            TimezoneOffset::UtcMinus8 => offset!(-8),
            TimezoneOffset::UtcPlus1 => offset!(+1),
            TimezoneOffset::UtcPlus9 => offset!(+9),
        }
    }

    pub fn from_hours(hours: i8) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.hours() == hours)
    }

    #[inline]
    fn shift_millis(self) -> i128 {
        i128::from(self.hours()) * MILLIS_PER_HOUR
    }
}

impl Display for TimezoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UTC{:+}", self.hours())
    }
}

impl FromStr for TimezoneOffset {
    type Err = UnknownOffset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hours = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("utc") => &trimmed[3..],
            _ => trimmed,
        };
        let hours = if hours.is_empty() {
            Some(0)
        } else {
            hours.parse::<i8>().ok()
        };

        hours
            .and_then(Self::from_hours)
            .ok_or_else(|| UnknownOffset(s.to_string()))
    }
}

impl TryFrom<String> for TimezoneOffset {
    type Error = UnknownOffset;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimezoneOffset> for String {
    fn from(value: TimezoneOffset) -> Self {
        value.to_string()
    }
}

/// Renders an instant in epoch milliseconds as wall-clock text at `offset`.
pub fn format_millis(millis: i64, offset: TimezoneOffset) -> Result<String, ConvertError> {
    // the wall clock at `offset` is the UTC rendering of the shifted instant
    let shifted = i128::from(millis) + offset.shift_millis();
    let wall_clock = OffsetDateTime::from_unix_timestamp_nanos(shifted * NANOS_PER_MILLI)
        .map_err(|_| ConvertError::invalid(millis.to_string()))?;

    wall_clock
        .format(DISPLAY_FORMAT)
        .map_err(|_| ConvertError::invalid(millis.to_string()))
}

/// Converts a seconds or milliseconds timestamp into `YYYY-MM-DD HH:mm:ss.sss` at `offset`.
pub fn timestamp_to_date_time(
    timestamp: &str,
    offset: TimezoneOffset,
) -> Result<String, ConvertError> {
    let timestamp = timestamp.trim();
    if timestamp.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    if !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConvertError::invalid(timestamp));
    }
    let value: i64 = timestamp
        .parse()
        .map_err(|_| ConvertError::invalid(timestamp))?;
    let precision = Precision::detect(timestamp);
    debug!("timestamp {} read as {:?}", timestamp, precision);
    let millis = match precision {
        Precision::Seconds => value
            .checked_mul(1000)
            .ok_or_else(|| ConvertError::invalid(timestamp))?,
        Precision::Milliseconds => value,
    };

    format_millis(millis, offset)
}

/// Converts wall-clock text at `offset` back into a timestamp.
///
/// The result is in milliseconds when the input carries a fractional part,
/// and in whole seconds (floored) otherwise.
pub fn date_time_to_timestamp(
    date_time: &str,
    offset: TimezoneOffset,
) -> Result<String, ConvertError> {
    let date_time = date_time.trim();
    if date_time.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    let fraction = date_time.split_once('.').map(|(_, f)| f);
    if fraction.is_some_and(|f| f.len() > MAX_FRACTION_DIGITS) {
        return Err(ConvertError::invalid(date_time));
    }
    let parsed = PrimitiveDateTime::parse(date_time, INPUT_FORMAT)
        .map_err(|_| ConvertError::invalid(date_time))?;
    let nanos = parsed.assume_offset(offset.utc_offset()).unix_timestamp_nanos();
    let millis = nanos.div_euclid(NANOS_PER_MILLI);
    let value = if fraction.is_some() {
        millis
    } else {
        millis.div_euclid(1000)
    };

    Ok(value.to_string())
}

/// Renders `now` at `offset`, paired with its millisecond timestamp.
pub fn current_time_to_both_at(
    now: OffsetDateTime,
    offset: TimezoneOffset,
) -> Result<(String, String), ConvertError> {
    let millis = i64::try_from(now.unix_timestamp_nanos().div_euclid(NANOS_PER_MILLI))
        .map_err(|_| ConvertError::invalid(now.to_string()))?;

    Ok((format_millis(millis, offset)?, millis.to_string()))
}

#[inline]
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / NANOS_PER_MILLI) as i64
}

#[inline]
pub fn current_time_to_both(offset: TimezoneOffset) -> Result<(String, String), ConvertError> {
    current_time_to_both_at(OffsetDateTime::now_utc(), offset)
}

/// Form state of the converter. Every handler returns the next state and
/// leaves `self` untouched, so a failed conversion keeps what was displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterState {
    pub timestamp: String,
    pub date_time: String,
    pub offset: TimezoneOffset,
}

/// Outcome of converting both fields at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub state: ConverterState,
    pub date_time_error: Option<ConvertError>,
    pub timestamp_error: Option<ConvertError>,
}

impl ConverterState {
    pub fn new(offset: TimezoneOffset) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn with_offset(&self, offset: TimezoneOffset) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    pub fn to_date_time(&self) -> Result<Self, ConvertError> {
        let date_time = timestamp_to_date_time(&self.timestamp, self.offset)?;

        Ok(Self {
            date_time,
            ..self.clone()
        })
    }

    pub fn to_timestamp(&self) -> Result<Self, ConvertError> {
        let timestamp = date_time_to_timestamp(&self.date_time, self.offset)?;

        Ok(Self {
            timestamp,
            ..self.clone()
        })
    }

    pub fn use_time(&self, now: OffsetDateTime) -> Result<Self, ConvertError> {
        let (date_time, timestamp) = current_time_to_both_at(now, self.offset)?;

        Ok(Self {
            timestamp,
            date_time,
            offset: self.offset,
        })
    }

    #[inline]
    pub fn use_current_time(&self) -> Result<Self, ConvertError> {
        self.use_time(OffsetDateTime::now_utc())
    }

    /// Runs both directions against the fields as they are now, so the
    /// two inputs are converted past each other. Each direction that
    /// succeeds is applied even when the other fails.
    pub fn convert_both(&self) -> Exchange {
        let mut state = self.clone();
        let date_time = timestamp_to_date_time(&self.timestamp, self.offset);
        let timestamp = date_time_to_timestamp(&self.date_time, self.offset);
        let date_time_error = match date_time {
            Ok(v) => {
                state.date_time = v;
                None
            }
            Err(e) => Some(e),
        };
        let timestamp_error = match timestamp {
            Ok(v) => {
                state.timestamp = v;
                None
            }
            Err(e) => Some(e),
        };

        Exchange {
            state,
            date_time_error,
            timestamp_error,
        }
    }
}

// tests
#[test]
fn test_precision() {
    assert_eq!(Precision::detect("1"), Precision::Seconds);
    assert_eq!(Precision::detect("1700000000"), Precision::Seconds);
    assert_eq!(Precision::detect("17000000000"), Precision::Milliseconds);
    assert_eq!(Precision::detect("1700000000000"), Precision::Milliseconds);
}

#[test]
fn test_seconds_at_utc8() {
    assert_eq!(
        timestamp_to_date_time("1700000000", TimezoneOffset::UtcPlus8).unwrap(),
        "2023-11-15 06:13:20.000"
    );
    assert_eq!(
        date_time_to_timestamp("2023-11-15 06:13:20.000", TimezoneOffset::UtcPlus8).unwrap(),
        "1700000000000"
    );
}

#[test]
fn test_milliseconds() {
    assert_eq!(
        timestamp_to_date_time("1700000000123", TimezoneOffset::Utc).unwrap(),
        "2023-11-14 22:13:20.123"
    );
    assert_eq!(
        timestamp_to_date_time(" 1700000000123 ", TimezoneOffset::UtcMinus8).unwrap(),
        "2023-11-14 14:13:20.123"
    );
}

#[test]
fn test_epoch_in_every_zone() {
    let expected = [
        (TimezoneOffset::UtcPlus8, "1970-01-01 08:00:00.000"),
        (TimezoneOffset::Utc, "1970-01-01 00:00:00.000"),
        (TimezoneOffset::UtcMinus8, "1969-12-31 16:00:00.000"),
        (TimezoneOffset::UtcPlus1, "1970-01-01 01:00:00.000"),
        (TimezoneOffset::UtcPlus9, "1970-01-01 09:00:00.000"),
    ];
    for (offset, text) in expected {
        assert_eq!(timestamp_to_date_time("0", offset).unwrap(), text);
    }
}

#[test]
fn test_offset_sweep() {
    use time::Duration;

    let parse = |s: &str| PrimitiveDateTime::parse(s, INPUT_FORMAT).unwrap();
    for ts in ["1700000000", "1234567890123", "86399"] {
        let utc = parse(&timestamp_to_date_time(ts, TimezoneOffset::Utc).unwrap());
        let east = parse(&timestamp_to_date_time(ts, TimezoneOffset::UtcPlus8).unwrap());
        assert_eq!(east - utc, Duration::hours(8));
    }
}

#[test]
fn test_invalid_timestamp() {
    assert_eq!(
        timestamp_to_date_time("", TimezoneOffset::UtcPlus8),
        Err(ConvertError::EmptyInput)
    );
    assert_eq!(
        timestamp_to_date_time("   ", TimezoneOffset::UtcPlus8),
        Err(ConvertError::EmptyInput)
    );
    for bad in ["abc", "12a", "-5", "1.5", "99999999999999999999", "99999999999999999"] {
        assert!(matches!(
            timestamp_to_date_time(bad, TimezoneOffset::Utc),
            Err(ConvertError::InvalidFormat(_))
        ));
    }
}

#[test]
fn test_whole_seconds_without_fraction() {
    let ts = date_time_to_timestamp("2024-01-01 00:00:00", TimezoneOffset::Utc).unwrap();
    assert_eq!(ts, "1704067200");
    let millis = date_time_to_timestamp("2024-01-01 00:00:00.000", TimezoneOffset::Utc).unwrap();
    assert_eq!(millis, "1704067200000");
    assert_eq!(
        ts.parse::<i64>().unwrap() * 1000,
        millis.parse::<i64>().unwrap()
    );
    assert_eq!(
        date_time_to_timestamp("2024-01-01 08:00:00", TimezoneOffset::UtcPlus8).unwrap(),
        "1704067200"
    );
}

#[test]
fn test_fraction_digits() {
    assert_eq!(
        date_time_to_timestamp("2024-01-01 00:00:00.123", TimezoneOffset::Utc).unwrap(),
        "1704067200123"
    );
    assert_eq!(
        date_time_to_timestamp("2024-01-01 00:00:00.123456", TimezoneOffset::Utc).unwrap(),
        "1704067200123"
    );
    assert_eq!(
        date_time_to_timestamp("2024-01-01 00:00:00.5", TimezoneOffset::Utc).unwrap(),
        "1704067200500"
    );
    assert_eq!(
        date_time_to_timestamp("2024-01-01 00:00:00.123456789", TimezoneOffset::Utc).unwrap(),
        "1704067200123"
    );
    // at most nanosecond precision
    assert!(matches!(
        date_time_to_timestamp("2024-01-01 00:00:00.1234567890", TimezoneOffset::Utc),
        Err(ConvertError::InvalidFormat(_))
    ));
}

#[test]
fn test_before_epoch() {
    assert_eq!(
        date_time_to_timestamp("1969-12-31 23:59:59", TimezoneOffset::Utc).unwrap(),
        "-1"
    );
    assert_eq!(
        date_time_to_timestamp("1969-12-31 23:59:59.500", TimezoneOffset::Utc).unwrap(),
        "-500"
    );
}

#[test]
fn test_invalid_date_time() {
    assert_eq!(
        date_time_to_timestamp(" ", TimezoneOffset::Utc),
        Err(ConvertError::EmptyInput)
    );
    for bad in [
        "yesterday",
        "2024-02-30 00:00:00",
        "2024-01-01T00:00:00",
        "2024-01-01 00:00",
        "2024-01-01 00:00:00.",
        "2024-01-01 00:00:00 +08:00",
        "2024-1-1 00:00:00",
    ] {
        assert!(
            matches!(
                date_time_to_timestamp(bad, TimezoneOffset::Utc),
                Err(ConvertError::InvalidFormat(_))
            ),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_round_trip_milliseconds() {
    for ts in ["1700000000123", "1234567890000", "946684800001", "4102444799999"] {
        for offset in TimezoneOffset::ALL {
            let date_time = timestamp_to_date_time(ts, offset).unwrap();
            assert_eq!(date_time_to_timestamp(&date_time, offset).unwrap(), ts);
        }
    }
}

#[test]
fn test_round_trip_drops_to_seconds() {
    let original: i64 = 1_700_000_000_987;
    for offset in TimezoneOffset::ALL {
        let date_time = timestamp_to_date_time(&original.to_string(), offset).unwrap();
        let whole = date_time.split('.').next().unwrap();
        let seconds: i64 = date_time_to_timestamp(whole, offset)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(seconds * 1000, original.div_euclid(1000) * 1000);
        assert!(original - seconds * 1000 < 1000);
    }
}

#[test]
fn test_seconds_input_round_trip() {
    let date_time = timestamp_to_date_time("1700000000", TimezoneOffset::UtcPlus9).unwrap();
    assert!(date_time.ends_with(".000"));
    assert_eq!(
        date_time_to_timestamp(&date_time, TimezoneOffset::UtcPlus9).unwrap(),
        "1700000000000"
    );
}

#[test]
fn test_current_time_to_both() {
    use time::macros::datetime;

    let (date_time, timestamp) = current_time_to_both_at(
        datetime!(2023-11-14 22:13:20.5 UTC),
        TimezoneOffset::UtcPlus8,
    )
    .unwrap();
    assert_eq!(date_time, "2023-11-15 06:13:20.500");
    assert_eq!(timestamp, "1700000000500");

    let (_, timestamp) = current_time_to_both(TimezoneOffset::Utc).unwrap();
    assert!(timestamp.len() > 10);
}

#[test]
fn test_offset_parse() {
    assert_eq!("UTC+8".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::UtcPlus8);
    assert_eq!("utc-8".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::UtcMinus8);
    assert_eq!("+9".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::UtcPlus9);
    assert_eq!("1".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::UtcPlus1);
    assert_eq!("UTC".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::Utc);
    assert_eq!("UTC+0".parse::<TimezoneOffset>().unwrap(), TimezoneOffset::Utc);
    assert!("UTC+5".parse::<TimezoneOffset>().is_err());
    assert!("abc".parse::<TimezoneOffset>().is_err());
    for offset in TimezoneOffset::ALL {
        assert_eq!(offset.to_string().parse::<TimezoneOffset>().unwrap(), offset);
    }
    assert_eq!(TimezoneOffset::Utc.to_string(), "UTC+0");
    assert_eq!(TimezoneOffset::UtcMinus8.to_string(), "UTC-8");
}

#[test]
fn test_state_handlers() {
    let state = ConverterState::new(TimezoneOffset::UtcPlus8);
    assert_eq!(state.to_date_time(), Err(ConvertError::EmptyInput));
    assert_eq!(state.to_timestamp(), Err(ConvertError::EmptyInput));

    let state = ConverterState {
        timestamp: "1700000000".to_string(),
        ..state
    };
    let next = state.to_date_time().unwrap();
    assert_eq!(next.date_time, "2023-11-15 06:13:20.000");
    assert_eq!(next.timestamp, "1700000000");

    let next = next.with_offset(TimezoneOffset::Utc).to_timestamp().unwrap();
    assert_eq!(next.timestamp, "1700028800000");

    let now = next
        .use_time(time::macros::datetime!(2024-01-01 0:00 UTC))
        .unwrap();
    assert_eq!(now.date_time, "2024-01-01 00:00:00.000");
    assert_eq!(now.timestamp, "1704067200000");
}

#[test]
fn test_convert_both_uses_previous_fields() {
    let state = ConverterState {
        timestamp: "1700000000".to_string(),
        date_time: "2024-01-01 00:00:00".to_string(),
        offset: TimezoneOffset::Utc,
    };
    let exchange = state.convert_both();
    assert_eq!(exchange.state.date_time, "2023-11-14 22:13:20.000");
    assert_eq!(exchange.state.timestamp, "1704067200");
    assert!(exchange.date_time_error.is_none());
    assert!(exchange.timestamp_error.is_none());

    let state = ConverterState {
        date_time: String::new(),
        ..state
    };
    let exchange = state.convert_both();
    assert_eq!(exchange.state.date_time, "2023-11-14 22:13:20.000");
    assert_eq!(exchange.state.timestamp, "1700000000");
    assert_eq!(exchange.timestamp_error, Some(ConvertError::EmptyInput));
}
