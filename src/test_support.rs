use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::data_type::DataType;
use crate::domain::series::{Observation, Reading, TimeSeries};

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    on_date(year, month, day).and_hms_opt(hour, minute, 0).unwrap()
}

/// Builds a series from `(timestamp, value)` pairs; `None` becomes `Missing`.
pub fn build_series(data_type: DataType, points: &[(NaiveDateTime, Option<f64>)]) -> TimeSeries {
    let observations = points
        .iter()
        .map(|(timestamp, value)| {
            let reading = match value {
                Some(value) => Reading::Measured(*value),
                None => Reading::Missing,
            };
            Observation::new(*timestamp, reading)
        })
        .collect();
    TimeSeries::from_observations(data_type, observations).0
}

/// A daily series at midnight with one value per consecutive day.
pub fn build_daily_series(start: NaiveDate, values: &[f64]) -> TimeSeries {
    let points: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(offset, value)| {
            let date = start + chrono::Duration::days(offset as i64);
            (date.and_hms_opt(0, 0, 0).unwrap(), Some(*value))
        })
        .collect();
    build_series(DataType::DailyQw, &points)
}
