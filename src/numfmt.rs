//! Number-format classification and serial date conversion.
//!
//! Worksheet XML stores dates as plain numbers; only the cell's number format
//! says they are dates. The parser uses [`is_date_format`] to decide which
//! numeric cells become [`chrono::NaiveDateTime`] values, and the writer turns
//! them back into serial numbers.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::workbook_meta::DateSystem;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Last serial Excel accepts (9999-12-31).
const MAX_SERIAL: f64 = 2_958_466.0;

/// Whether a built-in number format id is a date or time format.
///
/// Ids 14-22 and 45-47 are the locale-independent date/time formats; 27-36
/// and 50-58 are the East Asian date formats.
pub const fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a format code formats a date or time.
///
/// Quoted literals, `[...]` sections (colors, conditions, locales) and
/// backslash escapes are ignored. `m` only counts as month/minute when the code
/// has no digit placeholders.
pub fn is_date_format(format_code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    let mut cleaned = String::with_capacity(format_code.len());

    for c in format_code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if !in_quotes => escaped = true,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ if !in_quotes && !in_brackets => cleaned.push(c.to_ascii_lowercase()),
            _ => {}
        }
    }

    let has_digits = cleaned.contains('0') || cleaned.contains('#');
    cleaned.contains('y')
        || cleaned.contains('d')
        || cleaned.contains('h')
        || (cleaned.contains('m') && !has_digits)
        || (cleaned.contains('s') && cleaned.contains(':'))
}

fn epoch(system: DateSystem, before_march_1900: bool) -> Option<NaiveDateTime> {
    let date = match system {
        DateSystem::Date1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
        // Serials before the phantom 1900-02-29 are one day ahead.
        DateSystem::Date1900 if before_march_1900 => NaiveDate::from_ymd_opt(1899, 12, 31),
        DateSystem::Date1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
    }?;
    Some(date.and_time(NaiveTime::MIN))
}

/// Convert a serial date number to a date-time, rounded to the millisecond.
///
/// In the 1900 system serial 60 (the non-existent 1900-02-29) maps to
/// 1900-03-01. Negative and out-of-range serials give `None`.
#[allow(clippy::cast_possible_truncation)]
pub fn serial_to_datetime(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let base = epoch(system, serial < 61.0)?;
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a date-time to its serial number.
#[allow(clippy::cast_precision_loss)]
pub fn datetime_to_serial(dt: NaiveDateTime, system: DateSystem) -> f64 {
    let march_1900 = NaiveDate::from_ymd_opt(1900, 3, 1).map(|d| d.and_time(NaiveTime::MIN));
    let before_march = march_1900.is_some_and(|m| dt < m);
    epoch(system, before_march)
        .map(|base| (dt - base).num_milliseconds() as f64 / MILLIS_PER_DAY)
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test_case("yyyy-mm-dd", true)]
    #[test_case("m/d/yy", true)]
    #[test_case("h:mm AM/PM", true)]
    #[test_case("mm:ss", true)]
    #[test_case("[$-409]mmmm d, yyyy", true ; "locale prefix")]
    #[test_case("#,##0.00", false)]
    #[test_case("0.00%", false)]
    #[test_case("\"days\" 0", false ; "quoted literal")]
    #[test_case("[Red]0.00", false ; "color section")]
    #[test_case("General", false)]
    #[test_case("@", false)]
    fn test_is_date_format(code: &str, expected: bool) {
        assert_eq!(is_date_format(code), expected);
    }

    #[test]
    fn test_builtin_ids() {
        assert!(is_builtin_date_format(14));
        assert!(is_builtin_date_format(22));
        assert!(!is_builtin_date_format(0));
        assert!(!is_builtin_date_format(4));
        assert!(!is_builtin_date_format(49));
    }

    #[test_case(1.0, dt(1900, 1, 1, 0, 0, 0) ; "first day")]
    #[test_case(59.0, dt(1900, 2, 28, 0, 0, 0) ; "before phantom leap day")]
    #[test_case(61.0, dt(1900, 3, 1, 0, 0, 0) ; "after phantom leap day")]
    #[test_case(33_010.0, dt(1990, 5, 17, 0, 0, 0) ; "plain date")]
    #[test_case(45_292.5, dt(2024, 1, 1, 12, 0, 0) ; "noon")]
    fn test_serial_1900(serial: f64, expected: NaiveDateTime) {
        assert_eq!(serial_to_datetime(serial, DateSystem::Date1900), Some(expected));
        assert_eq!(datetime_to_serial(expected, DateSystem::Date1900), serial);
    }

    #[test]
    fn test_serial_1904() {
        let d = dt(1990, 5, 17, 0, 0, 0);
        let serial = datetime_to_serial(d, DateSystem::Date1904);
        assert_eq!(serial, 33_010.0 - 1462.0);
        assert_eq!(serial_to_datetime(serial, DateSystem::Date1904), Some(d));
        assert_eq!(
            serial_to_datetime(0.0, DateSystem::Date1904),
            Some(dt(1904, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_out_of_range_serials() {
        assert_eq!(serial_to_datetime(-1.0, DateSystem::Date1900), None);
        assert_eq!(serial_to_datetime(f64::NAN, DateSystem::Date1900), None);
        assert_eq!(serial_to_datetime(3_000_000.0, DateSystem::Date1900), None);
    }
}
