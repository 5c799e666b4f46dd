//! Time frame resolution
//!
//! Derives the effective time frame of a record from the timestamp fields each
//! provider uses. Every resolved frame carries an explicit UTC offset; a value
//! that cannot be pinned to an offset is an `InvalidTimestamp`, never a naive
//! local time.

use crate::error::MappingError;
use crate::node::{find_node, optional_epoch, optional_str};
use crate::types::TimeFrame;
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use serde_json::Value;

const SECONDS_PER_HOUR: f64 = 3600.0;
const MAX_OFFSET_HOURS: i32 = 18;

/// Resolution of an epoch field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochPrecision {
    Seconds,
    Millis,
    Nanos,
}

/// How an epoch value relates to the offset it is paired with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochEncoding {
    /// A true UTC instant, displayed at the offset
    Instant,
    /// Local wall-clock time written as if it were UTC
    LocalWallClock,
}

/// Where the UTC offset for epoch values comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSource {
    /// Offset field on the record, then on the document root, then `fallback`
    Field {
        name: &'static str,
        fallback: FixedOffset,
    },
    /// Provider-declared fixed offset
    Fixed(FixedOffset),
}

/// Interpretation of epoch timestamp fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSpec {
    pub precision: EpochPrecision,
    pub encoding: EpochEncoding,
    pub offset: OffsetSource,
}

impl EpochSpec {
    /// UTC epoch values at a zero offset
    pub fn utc(precision: EpochPrecision) -> Self {
        Self {
            precision,
            encoding: EpochEncoding::Instant,
            offset: OffsetSource::Fixed(utc_offset()),
        }
    }
}

/// Timestamp field layout of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampScheme {
    EpochInstant {
        field: &'static str,
        epoch: EpochSpec,
    },
    EpochInterval {
        start: &'static str,
        end: &'static str,
        epoch: EpochSpec,
    },
    IsoInstant {
        field: &'static str,
    },
    IsoInterval {
        start: &'static str,
        end: &'static str,
    },
}

impl TimestampScheme {
    /// Resolve the time frame of `record`.
    ///
    /// Returns `Ok(None)` when none of the scheme's fields are present.
    pub fn resolve(
        &self,
        record: &Value,
        document: &Value,
    ) -> Result<Option<TimeFrame>, MappingError> {
        match *self {
            TimestampScheme::EpochInstant { field, epoch } => {
                match optional_epoch(record, field).map_err(|e| invalid(field, e))? {
                    Some(raw) => {
                        let offset = resolve_offset(&epoch.offset, record, document)?;
                        let dt = epoch_to_datetime(raw, &epoch, offset, field)?;
                        Ok(Some(TimeFrame::DateTime(dt)))
                    }
                    None => Ok(None),
                }
            }
            TimestampScheme::EpochInterval { start, end, epoch } => {
                let raw_start = optional_epoch(record, start).map_err(|e| invalid(start, e))?;
                let raw_end = optional_epoch(record, end).map_err(|e| invalid(end, e))?;
                match (raw_start, raw_end) {
                    (None, None) => Ok(None),
                    (Some(s), Some(e)) => {
                        let offset = resolve_offset(&epoch.offset, record, document)?;
                        let start_dt = epoch_to_datetime(s, &epoch, offset, start)?;
                        let end_dt = epoch_to_datetime(e, &epoch, offset, end)?;
                        interval(start_dt, end_dt, start).map(Some)
                    }
                    (Some(_), None) => Err(MappingError::timestamp(end, "interval end missing")),
                    (None, Some(_)) => {
                        Err(MappingError::timestamp(start, "interval start missing"))
                    }
                }
            }
            TimestampScheme::IsoInstant { field } => {
                match optional_str(record, field).map_err(|e| invalid(field, e))? {
                    Some(s) => parse_iso(s, field).map(|dt| Some(TimeFrame::DateTime(dt))),
                    None => Ok(None),
                }
            }
            TimestampScheme::IsoInterval { start, end } => {
                let raw_start = optional_str(record, start).map_err(|e| invalid(start, e))?;
                let raw_end = optional_str(record, end).map_err(|e| invalid(end, e))?;
                match (raw_start, raw_end) {
                    (None, None) => Ok(None),
                    (Some(s), Some(e)) => {
                        interval(parse_iso(s, start)?, parse_iso(e, end)?, start).map(Some)
                    }
                    (Some(_), None) => Err(MappingError::timestamp(end, "interval end missing")),
                    (None, Some(_)) => {
                        Err(MappingError::timestamp(start, "interval start missing"))
                    }
                }
            }
        }
    }
}

/// Convert a raw epoch value into an offset-aware date time
pub fn epoch_to_datetime(
    raw: i64,
    spec: &EpochSpec,
    offset: FixedOffset,
    field: &str,
) -> Result<DateTime<FixedOffset>, MappingError> {
    let (secs, nanos) = match spec.precision {
        EpochPrecision::Seconds => (raw, 0),
        EpochPrecision::Millis => (raw.div_euclid(1_000), raw.rem_euclid(1_000) * 1_000_000),
        EpochPrecision::Nanos => (
            raw.div_euclid(1_000_000_000),
            raw.rem_euclid(1_000_000_000),
        ),
    };

    let utc = Utc
        .timestamp_opt(secs, nanos as u32)
        .single()
        .ok_or_else(|| MappingError::timestamp(field, format!("epoch value {raw} out of range")))?;

    match spec.encoding {
        EpochEncoding::Instant => Ok(utc.with_timezone(&offset)),
        EpochEncoding::LocalWallClock => offset
            .from_local_datetime(&utc.naive_utc())
            .single()
            .ok_or_else(|| {
                MappingError::timestamp(field, format!("wall clock {raw} not representable"))
            }),
    }
}

/// Find the offset for a record according to `source`
pub fn resolve_offset(
    source: &OffsetSource,
    record: &Value,
    document: &Value,
) -> Result<FixedOffset, MappingError> {
    match *source {
        OffsetSource::Fixed(offset) => Ok(offset),
        OffsetSource::Field { name, fallback } => {
            match find_node(record, name).or_else(|| find_node(document, name)) {
                Some(value) => parse_offset(value).ok_or_else(|| {
                    MappingError::timestamp(name, format!("unrecognised UTC offset {value}"))
                }),
                None => Ok(fallback),
            }
        }
    }
}

/// Parse a UTC offset written as `Z`, `+HH:MM`, `-H:MM`, `-HHMM`, `-H`, or as
/// a number of hours
pub fn parse_offset(value: &Value) -> Option<FixedOffset> {
    match value {
        Value::Number(n) => {
            let hours = n.as_f64()?;
            if hours.abs() > MAX_OFFSET_HOURS as f64 {
                return None;
            }
            FixedOffset::east_opt((hours * SECONDS_PER_HOUR).round() as i32)
        }
        Value::String(s) => parse_offset_str(s.trim()),
        _ => None,
    }
}

fn parse_offset_str(s: &str) -> Option<FixedOffset> {
    if !s.is_ascii() {
        return None;
    }
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Some(utc_offset());
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() <= 2 => (rest, "0"),
        None => rest.split_at(rest.len() - 2),
    };

    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > MAX_OFFSET_HOURS || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_iso(s: &str, field: &str) -> Result<DateTime<FixedOffset>, MappingError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map_err(|e| MappingError::timestamp(field, format!("{s:?} is not an offset date time: {e}")))
}

fn interval(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    field: &str,
) -> Result<TimeFrame, MappingError> {
    if start == end {
        Ok(TimeFrame::DateTime(start))
    } else if start < end {
        Ok(TimeFrame::Interval { start, end })
    } else {
        Err(MappingError::timestamp(field, "interval ends before it starts"))
    }
}

fn invalid(field: &str, err: MappingError) -> MappingError {
    MappingError::timestamp(field, err.to_string())
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}
