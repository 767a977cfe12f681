//! Timestamp and text normalization.
//!
//! Registry values, key metadata and NTFS stat data all report time as a
//! FILETIME: a 64-bit count of 100-nanosecond intervals since
//! 1601-01-01T00:00:00Z. Everything leaving this crate is a `DateTime<Utc>`.

use std::time::SystemTime;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lazy_static::lazy_static;

lazy_static! {
    /// 1601-01-01T00:00:00Z, the zero point of FILETIME values.
    pub static ref FILETIME_EPOCH: DateTime<Utc> = Utc
        .with_ymd_and_hms(1601, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
}

/// Convert a FILETIME to a UTC instant.
///
/// Sub-microsecond ticks are truncated (`filetime / 10`). Every `u64` is a
/// valid input: the largest value lands in the year 60056, well inside the
/// range chrono can represent.
pub fn filetime_to_utc(filetime: u64) -> DateTime<Utc> {
    // u64::MAX / 10 fits in an i64
    let micros = (filetime / 10) as i64;
    FILETIME_EPOCH
        .checked_add_signed(Duration::microseconds(micros))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Read a little-endian FILETIME at `offset` in a value's binary data.
pub fn filetime_at(data: &[u8], offset: usize) -> Option<DateTime<Utc>> {
    let bytes: [u8; 8] = data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
    Some(filetime_to_utc(u64::from_le_bytes(bytes)))
}

/// Convert an `std` timestamp (as returned by `fs::Metadata`) to UTC.
pub fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Undo the ROT13 substitution Explorer applies to UserAssist value names.
///
/// Only ASCII letters move; digits, punctuation, GUID braces and non-ASCII
/// text pass through untouched.
pub fn rot13_decode(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}
