use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::schema::EpochUnit;

/// Naive layouts accepted by the ISO path, tried in order after RFC 3339.
const ISO_NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const ISO_OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const ISO_DATE_LAYOUT: &str = "%Y-%m-%d";

/// Parse `s` exactly as given with an explicit chrono format. Formats
/// carrying an offset are converted to UTC; naive ones are taken as UTC;
/// date-only formats land on midnight.
pub fn parse_with_format(s: &str, format: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_str(s, format) {
        return Ok(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(s, format) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(dt_err) => NaiveDate::parse_from_str(s, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("does not match `{}`: {}", format, dt_err)),
    }
}

/// Parse ISO-8601-style text: RFC 3339 first, then a fixed list of layouts.
pub fn parse_iso(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for layout in ISO_OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for layout in ISO_NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, ISO_DATE_LAYOUT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "not an ISO-8601 date or datetime".to_string())
}

/// Integer offset from the Unix epoch.
pub fn from_epoch_int(value: i64, unit: EpochUnit) -> Result<DateTime<Utc>, String> {
    from_epoch_nanos(value as i128 * unit.nanos())
}

/// Fractional offset from the Unix epoch, rounded to the nearest nanosecond.
pub fn from_epoch_float(value: f64, unit: EpochUnit) -> Result<DateTime<Utc>, String> {
    if !value.is_finite() {
        return Err(format!("{} is not a finite offset", value));
    }
    let nanos = (value * unit.nanos() as f64).round();
    if nanos.abs() > i128::MAX as f64 {
        return Err(format!("{} {} is out of range", value, unit.as_str()));
    }
    from_epoch_nanos(nanos as i128)
}

fn from_epoch_nanos(nanos: i128) -> Result<DateTime<Utc>, String> {
    let secs = nanos.div_euclid(1_000_000_000);
    let sub = nanos.rem_euclid(1_000_000_000) as u32;
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, sub))
        .ok_or_else(|| format!("{}ns from epoch is out of range", nanos))
}
