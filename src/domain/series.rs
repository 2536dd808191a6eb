// Hourly series data and the cache window/key codec
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

/// Parallel time/value sequences for one location, ascending by time.
///
/// Gaps are possible when upstream data is sparse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub value: Vec<f64>,
}

impl HourlySeries {
    pub fn new(time: Vec<String>, value: Vec<f64>) -> Self {
        Self { time, value }
    }

    pub fn len(&self) -> usize {
        self.time.len().min(self.value.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.time
            .iter()
            .map(String::as_str)
            .zip(self.value.iter().copied())
    }

    /// Append another block after this one without de-duplication
    pub fn extend(&mut self, other: HourlySeries) {
        let n = other.len();
        self.time.extend(other.time.into_iter().take(n));
        self.value.extend(other.value.into_iter().take(n));
    }

    pub fn to_points(&self) -> Vec<SeriesPoint> {
        self.iter()
            .map(|(time, value)| SeriesPoint::new(time, value))
            .collect()
    }
}

/// How far the cache window reaches around "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowPolicy {
    pub past_days: u64,
    pub future_days: u64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            past_days: 14,
            future_days: 15,
        }
    }
}

/// Wall-clock derived fetch window: archive ends yesterday, forecast starts today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub past_start: NaiveDate,
    pub past_end: NaiveDate,
    pub future_start: NaiveDate,
    pub future_end: NaiveDate,
}

impl FetchWindow {
    pub fn around(today: NaiveDate, policy: WindowPolicy) -> Self {
        let past_start = today
            .checked_sub_days(Days::new(policy.past_days))
            .unwrap_or(today);
        let past_end = today.pred_opt().unwrap_or(today);
        let future_end = today
            .checked_add_days(Days::new(policy.future_days))
            .unwrap_or(today);
        Self {
            past_start,
            past_end,
            future_start: today,
            future_end,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.past_start
    }

    pub fn end(&self) -> NaiveDate {
        self.future_end
    }
}

/// Composite cache key. Coordinates compare by exact bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    lat_bits: u64,
    lng_bits: u64,
    start: NaiveDate,
    end: NaiveDate,
}

impl SeriesKey {
    pub fn new(lat: f64, lng: f64, window: &FetchWindow) -> Self {
        // adding 0.0 folds -0.0 into 0.0
        Self {
            lat_bits: (lat + 0.0).to_bits(),
            lng_bits: (lng + 0.0).to_bits(),
            start: window.start(),
            end: window.end(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            f64::from_bits(self.lat_bits),
            f64::from_bits(self.lng_bits),
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}
