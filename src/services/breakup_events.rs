use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveTime};
use thiserror::Error;
use tracing::warn;

use crate::domain::event::{BreakupEvent, EventRow};
use crate::domain::series::{Observation, TimeSeries};
use crate::services::series_csv::{
    SeriesCsvError, TimestampStyle, create_writer, format_optional, format_reading,
    format_timestamp,
};

/// Half-width of the window searched for the peak.
pub const PEAK_SEARCH_DAYS: i64 = 1;
/// Half-width of the extracted event window around the peak.
pub const EVENT_HALF_WINDOW_DAYS: i64 = 5;

#[derive(Error, Debug)]
pub enum BreakupDatesError {
    #[error("failed to read breakup dates file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// Resolves a candidate breakup date to the local peak and extracts the
/// surrounding window. Returns `None` when the series has nothing on the
/// candidate date or no usable values near it.
pub fn extract_event(series: &TimeSeries, candidate_date: NaiveDate) -> Option<BreakupEvent> {
    let candidate = candidate_date.and_time(NaiveTime::MIN);
    if !series.has_date(candidate_date) {
        return None;
    }

    let search = series.between(
        candidate - Duration::days(PEAK_SEARCH_DAYS),
        candidate + Duration::days(PEAK_SEARCH_DAYS),
    );
    let peak = first_maximum(search)?;
    let peak_value = peak.value()?;

    let window = series.between(
        peak.timestamp - Duration::days(EVENT_HALF_WINDOW_DAYS),
        peak.timestamp + Duration::days(EVENT_HALF_WINDOW_DAYS),
    );
    // The baseline is the minimum of the whole centred window, including the
    // days after the peak.
    let pre_breakup_value = window
        .iter()
        .filter_map(Observation::value)
        .reduce(f64::min)?;

    let rows = window
        .iter()
        .map(|observation| {
            let value = observation.value();
            EventRow {
                timestamp: observation.timestamp,
                reading: observation.reading,
                dimensionless: value.map(|value| value / peak_value),
                change: value.map(|value| value - pre_breakup_value),
            }
        })
        .collect();

    Some(BreakupEvent {
        data_type: series.data_type,
        candidate_date,
        peak_timestamp: peak.timestamp,
        peak_value,
        pre_breakup_value,
        rows,
    })
}

/// Largest present value; ties go to the earliest timestamp.
fn first_maximum(observations: &[Observation]) -> Option<&Observation> {
    let mut best: Option<(&Observation, f64)> = None;
    for observation in observations {
        let Some(value) = observation.value() else {
            continue;
        };
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((observation, value)),
        }
    }
    best.map(|(observation, _)| observation)
}

pub fn write_event_csv(path: &Path, event: &BreakupEvent) -> Result<(), SeriesCsvError> {
    let data_type = event.data_type;
    let style = TimestampStyle::for_data_type(data_type);
    let mut writer = create_writer(path)?;
    let csv_error = |source| SeriesCsvError::Csv {
        path: path.to_path_buf(),
        source,
    };
    writer
        .write_record([
            data_type.date_column(),
            data_type.value_column(),
            data_type.dimensionless_column(),
            data_type.change_column(),
        ])
        .map_err(csv_error)?;

    for row in &event.rows {
        writer
            .write_record([
                format_timestamp(row.timestamp, style),
                format_reading(data_type, row.reading),
                format_optional(row.dimensionless),
                format_optional(row.change),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SeriesCsvError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `YYYY-MM-DD` dates, one per line. Blank lines and `#` comments are
/// ignored; anything else that does not parse (a CSV header, say) is logged
/// and skipped.
pub fn load_breakup_dates(path: &Path) -> Result<Vec<NaiveDate>, BreakupDatesError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BreakupDatesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_breakup_dates(&contents))
}

pub fn parse_breakup_dates(contents: &str) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let first_cell = line.split(',').next().unwrap_or(line).trim().trim_matches('"');
        match NaiveDate::parse_from_str(first_cell, "%Y-%m-%d") {
            Ok(date) => dates.push(date),
            Err(_) => warn!(line = index + 1, value = line, "skipping unparseable breakup date"),
        }
    }
    dates
}
