use crate::{
    fl,
    timestamp::{format_millis, TimezoneOffset},
};

pub mod cli;
pub mod tui;

/// Formats a millisecond timestamp for listings, without the fraction.
#[inline]
pub(crate) fn format_timestamp(t: Option<i64>, offset: TimezoneOffset) -> String {
    t.and_then(|t| format_millis(t, offset).ok())
        .and_then(|s| s.split('.').next().map(str::to_string))
        .unwrap_or_else(|| fl!("unknown"))
}

pub(crate) fn zone_label(offset: TimezoneOffset) -> String {
    match offset {
        TimezoneOffset::UtcPlus8 => fl!("tz-utc-plus-8"),
        TimezoneOffset::Utc => fl!("tz-utc"),
        TimezoneOffset::UtcMinus8 => fl!("tz-utc-minus-8"),
        TimezoneOffset::UtcPlus1 => fl!("tz-utc-plus-1"),
        TimezoneOffset::UtcPlus9 => fl!("tz-utc-plus-9"),
    }
}

// tests
#[test]
fn test_format_timestamp() {
    assert_eq!(
        format_timestamp(Some(1_700_000_000_123), TimezoneOffset::UtcPlus8),
        "2023-11-15 06:13:20"
    );
    assert_eq!(format_timestamp(None, TimezoneOffset::Utc), fl!("unknown"));
}

#[test]
fn test_zone_labels_mention_offset() {
    for offset in TimezoneOffset::ALL {
        assert!(zone_label(offset).contains(&offset.to_string()));
    }
}
