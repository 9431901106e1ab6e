use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::data_type::DataType;
use crate::domain::series::Reading;

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub timestamp: NaiveDateTime,
    pub reading: Reading,
    /// `value / peak_value`
    pub dimensionless: Option<f64>,
    /// `value - pre_breakup_value`
    pub change: Option<f64>,
}

impl EventRow {
    pub fn value(&self) -> Option<f64> {
        self.reading.value()
    }
}

/// A breakup peak resolved from an approximate candidate date, with the
/// ten-day window of the source series around it.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakupEvent {
    pub data_type: DataType,
    pub candidate_date: NaiveDate,
    pub peak_timestamp: NaiveDateTime,
    pub peak_value: f64,
    /// Minimum of the extraction window, peak side included.
    pub pre_breakup_value: f64,
    pub rows: Vec<EventRow>,
}

impl BreakupEvent {
    pub fn file_name(&self) -> String {
        event_file_name(self.candidate_date)
    }
}

pub fn event_file_name(candidate_date: NaiveDate) -> String {
    format!("BreakUp_Event_{}.csv", candidate_date.format("%Y-%m-%d"))
}
