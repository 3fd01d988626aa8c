use crate::error::ScalerError;
use chrono::prelude::*;
use std::num::ParseIntError;
use std::path::Path;

/// Ticks of the 16 Hz internal clock per count.
pub const CLOCK_SCALE: f64 = 16.;
/// Accumulation window of a scaler record, in seconds.
pub const ACCUMULATION_SECONDS: f64 = 60.;

/// If longer than one week, keep year, month and day, drop hours;
/// if not, but longer than one day, add hours.
/// Otherwise, shorter than one day, keep also minutes.
pub fn suitable_xfmt(d: chrono::Duration) -> &'static str {
    if d > chrono::Duration::weeks(1) {
        "%y-%m-%d"
    } else if d > chrono::Duration::days(1) {
        "%m-%d %H"
    } else {
        "%d %H:%M"
    }
}

/// Min and max of the iterator, None if it is empty.
pub fn min_and_max<'a, I, T>(mut s: I) -> Option<(T, T)>
where
    I: Iterator<Item = &'a T>,
    T: 'a + std::cmp::PartialOrd + Clone,
{
    let first = s.next()?;
    let (mut min, mut max) = (first, first);
    for es in s {
        if es > max {
            max = es
        }
        if es < min {
            min = es
        }
    }
    Some((min.clone(), max.clone()))
}

/// Convert one hexadecimal scaler token to counts per second.
/// The raw count is scaled by the internal clock and divided by the accumulation window,
/// i.e., int(h, 16) * 16 / 60.
pub fn hex_to_rate(token: &str) -> Result<f64, ParseIntError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    let raw = u64::from_str_radix(digits, 16)?;
    Ok(raw as f64 * CLOCK_SCALE / ACCUMULATION_SECONDS)
}

/// Read the acquisition start from a file name like 29082024_1023_output.txt,
/// the date before the first underscore (ddmmyyyy)
/// and the time as the first four characters after it (HHMM).
pub fn datetime_from_filename<P>(fin: P) -> Result<NaiveDateTime, ScalerError>
where
    P: AsRef<Path>,
{
    let fname = fin
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let format_err = |reason: &str| ScalerError::FilenameFormat {
        name: fname.to_owned(),
        reason: reason.to_owned(),
    };
    let (date_part, rest) = fname
        .split_once('_')
        .ok_or_else(|| format_err("missing underscore between date and time"))?;
    let time_part: String = rest.chars().take(4).collect();
    let all_digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(date_part, 8) {
        return Err(format_err("date is not in the ddmmyyyy format"));
    }
    if !all_digits(&time_part, 4) {
        return Err(format_err("time is not in the HHMM format"));
    }
    NaiveDateTime::parse_from_str(&format!("{}{}", date_part, time_part), "%d%m%Y%H%M")
        .map_err(|e| format_err(&e.to_string()))
}

/// One timestamp per minute starting from start.
/// Uses checked calendar arithmetic, overflow is an error rather than a wrap.
pub fn minute_timestamps(
    start: NaiveDateTime,
    count: usize,
) -> Result<Vec<NaiveDateTime>, ScalerError> {
    (0..count)
        .map(|i| {
            i64::try_from(i)
                .ok()
                .and_then(chrono::Duration::try_minutes)
                .and_then(|d| start.checked_add_signed(d))
                .ok_or(ScalerError::TimeOverflow(i))
        })
        .collect()
}

/// Trailing moving average with a minimum of one period:
/// element i is the mean of v[max(0, i - window + 1)..=i].
/// The window must be >= 1, checked by the caller.
/// A running sum keeps it linear in the length of v, whatever the window.
pub fn trailing_mean(v: &[f64], window: usize) -> Vec<f64> {
    if window == 1 {
        return v.to_vec();
    }
    let mut sum = 0.;
    v.iter()
        .enumerate()
        .map(|(i, x)| {
            sum += x;
            if i >= window {
                sum -= v[i - window];
            }
            sum / (i + 1).min(window) as f64
        })
        .collect()
}

/// Output files are only written when their directory exists
/// and the path itself is not a directory.
pub fn check_output_path(p: &Path) -> Result<(), ScalerError> {
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    if !dir.is_dir() || p.is_dir() {
        return Err(ScalerError::OutputPath(p.to_path_buf()));
    }
    Ok(())
}
