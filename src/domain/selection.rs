// Time selection and interval resolution against an hourly series
use crate::domain::series::HourlySeries;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Length of a "YYYY-MM-DDTHH" hour prefix
const HOUR_PREFIX_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
}

/// The user's chosen instant or interval. Strings are kept as received;
/// malformed values simply resolve to no samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSelection {
    Instant(String),
    Interval(Interval),
}

impl TimeSelection {
    /// Current hour as a local-free ISO instant, e.g. "2024-01-01T06:00"
    pub fn current_hour(now: NaiveDateTime) -> Self {
        TimeSelection::Instant(now.format("%Y-%m-%dT%H:00").to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub scalar: Option<f64>,
    pub sample_count: usize,
}

impl Resolved {
    fn none() -> Self {
        Self {
            scalar: None,
            sample_count: 0,
        }
    }
}

/// Reduce the series to one representative scalar for the selection
pub fn resolve(series: &HourlySeries, selection: &TimeSelection) -> Resolved {
    match selection {
        TimeSelection::Instant(instant) => resolve_instant(series, instant),
        TimeSelection::Interval(interval) => resolve_interval(series, interval),
    }
}

fn resolve_instant(series: &HourlySeries, instant: &str) -> Resolved {
    let Some(prefix) = hour_prefix(instant) else {
        return Resolved::none();
    };
    series
        .iter()
        .find(|(time, _)| time.starts_with(prefix))
        .map(|(_, value)| Resolved {
            scalar: Some(value),
            sample_count: 1,
        })
        .unwrap_or_else(Resolved::none)
}

fn resolve_interval(series: &HourlySeries, interval: &Interval) -> Resolved {
    let (Some(start), Some(end)) = (
        boundary(&interval.start_date, &interval.start_time),
        boundary(&interval.end_date, &interval.end_time),
    ) else {
        return Resolved::none();
    };

    let (sum, count) = series
        .iter()
        .filter_map(|(time, value)| parse_series_time(time).map(|t| (t, value)))
        .filter(|(t, _)| *t >= start && *t <= end)
        .fold((0.0, 0usize), |(sum, count), (_, value)| (sum + value, count + 1));

    if count == 0 {
        return Resolved::none();
    }
    Resolved {
        scalar: Some(round2(sum / count as f64)),
        sample_count: count,
    }
}

/// "YYYY-MM-DDTHH" prefix of a well-formed instant
fn hour_prefix(instant: &str) -> Option<&str> {
    let prefix = instant.get(..HOUR_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(&format!("{prefix}:00"), "%Y-%m-%dT%H:%M").ok()?;
    Some(prefix)
}

fn boundary(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .ok()?;
    Some(date.and_time(time))
}

fn parse_series_time(time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
