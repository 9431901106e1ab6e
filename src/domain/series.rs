use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::data_type::DataType;

/// USGS marks ice-affected values with this sentinel.
pub const ICE_SENTINEL: f64 = -999999.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Measured(f64),
    /// Ice-affected, no usable observation.
    Ice,
    Missing,
}

impl Reading {
    pub fn from_value(value: f64) -> Self {
        if value == ICE_SENTINEL {
            Reading::Ice
        } else if value.is_finite() {
            Reading::Measured(value)
        } else {
            Reading::Missing
        }
    }

    /// Parses a CSV or JSON cell. `Ice`, the sentinel, blanks and garbage
    /// all become "no observation".
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("ice") {
            return Reading::Ice;
        }
        match text.parse::<f64>() {
            Ok(value) => Reading::from_value(value),
            Err(_) => Reading::Missing,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Measured(value) => Some(*value),
            Reading::Ice | Reading::Missing => None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub reading: Reading,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, reading: Reading) -> Self {
        Self { timestamp, reading }
    }

    pub fn value(&self) -> Option<f64> {
        self.reading.value()
    }
}

/// Ordered observations of one quantity with unique, naive timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub data_type: DataType,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Sorts by timestamp and keeps the first observation of any duplicated
    /// timestamp. Returns the series and the number of dropped duplicates.
    pub fn from_observations(
        data_type: DataType,
        mut observations: Vec<Observation>,
    ) -> (Self, usize) {
        observations.sort_by_key(|observation| observation.timestamp);
        let before = observations.len();
        observations.dedup_by_key(|observation| observation.timestamp);
        let dropped = before - observations.len();
        (
            Self {
                data_type,
                observations,
            },
            dropped,
        )
    }

    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            observations: Vec::new(),
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|observation| observation.reading.is_present())
            .count()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.first().map(|observation| observation.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|observation| observation.timestamp)
    }

    /// Observations with `start <= timestamp <= end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[Observation] {
        if start > end {
            return &[];
        }
        let lower = self
            .observations
            .partition_point(|observation| observation.timestamp < start);
        let upper = self
            .observations
            .partition_point(|observation| observation.timestamp <= end);
        &self.observations[lower..upper]
    }

    pub fn has_date(&self, date: NaiveDate) -> bool {
        let start = date.and_time(chrono::NaiveTime::MIN);
        let end = start + chrono::Duration::days(1);
        let index = self
            .observations
            .partition_point(|observation| observation.timestamp < start);
        self.observations
            .get(index)
            .is_some_and(|observation| observation.timestamp < end)
    }
}
