use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::data_type::DataType;
use crate::domain::series::{Observation, Reading, TimeSeries};

const DATE_COLUMNS: [&str; 2] = ["Date", "Date & Time"];

#[derive(Error, Debug)]
pub enum SeriesCsvError {
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse csv {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("column mismatch in {path}: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// `YYYY-MM-DD`
    DateOnly,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
}

impl TimestampStyle {
    /// Style of the processed file for `data_type`.
    pub fn for_data_type(data_type: DataType) -> Self {
        if data_type.is_daily() {
            TimestampStyle::DateOnly
        } else {
            TimestampStyle::DateTime
        }
    }
}

/// Counters from loading a series file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub bad_timestamps: usize,
    pub duplicates: usize,
}

/// Loads the file when it exists; an absent source is `Ok(None)`.
pub fn load_series_if_present(
    path: &Path,
    data_type: DataType,
) -> Result<Option<TimeSeries>, SeriesCsvError> {
    if !path.is_file() {
        return Ok(None);
    }
    let (series, report) = read_series_csv(path, data_type)?;
    if report.bad_timestamps > 0 || report.duplicates > 0 {
        warn!(
            path = %path.display(),
            bad_timestamps = report.bad_timestamps,
            duplicates = report.duplicates,
            "dropped unusable rows"
        );
    }
    Ok(Some(series))
}

/// Reads a two-column series CSV, skipping `#` comment lines. The value
/// column must match the data type; either date header is accepted.
pub fn read_series_csv(
    path: &Path,
    data_type: DataType,
) -> Result<(TimeSeries, LoadReport), SeriesCsvError> {
    let file = std::fs::File::open(path).map_err(|source| SeriesCsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(io::BufReader::new(file));

    let csv_error = |source| SeriesCsvError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let date_index = headers
        .iter()
        .position(|header| header == data_type.date_column())
        .or_else(|| headers.iter().position(|header| DATE_COLUMNS.contains(&header)));
    let value_index = headers
        .iter()
        .position(|header| header == data_type.value_column());

    let (Some(date_index), Some(value_index)) = (date_index, value_index) else {
        return Err(SeriesCsvError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: vec![
                data_type.date_column().to_string(),
                data_type.value_column().to_string(),
            ],
            found: headers.iter().map(str::to_string).collect(),
        });
    };

    let mut report = LoadReport::default();
    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        report.rows += 1;
        let Some(timestamp) = record.get(date_index).and_then(parse_timestamp) else {
            report.bad_timestamps += 1;
            continue;
        };
        let reading = record
            .get(value_index)
            .map(Reading::parse)
            .unwrap_or(Reading::Missing);
        observations.push(Observation::new(timestamp, reading));
    }

    let (series, duplicates) = TimeSeries::from_observations(data_type, observations);
    report.duplicates = duplicates;
    debug!(path = %path.display(), rows = report.rows, "loaded series csv");
    Ok((series, report))
}

pub fn write_series_csv(
    path: &Path,
    data_type: DataType,
    observations: &[Observation],
    style: TimestampStyle,
) -> Result<(), SeriesCsvError> {
    let mut writer = create_writer(path)?;
    let csv_error = |source| SeriesCsvError::Csv {
        path: path.to_path_buf(),
        source,
    };
    writer
        .write_record([data_type.date_column(), data_type.value_column()])
        .map_err(csv_error)?;
    for observation in observations {
        writer
            .write_record([
                format_timestamp(observation.timestamp, style),
                format_reading(data_type, observation.reading),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SeriesCsvError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Opens a CSV writer, creating parent folders as needed. Existing files
/// are overwritten.
pub fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, SeriesCsvError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SeriesCsvError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    WriterBuilder::new()
        .from_path(path)
        .map_err(|source| SeriesCsvError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

pub fn format_timestamp(timestamp: NaiveDateTime, style: TimestampStyle) -> String {
    match style {
        TimestampStyle::DateOnly => timestamp.format("%Y-%m-%d").to_string(),
        TimestampStyle::DateTime => timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Ice is written as the literal `Ice` in discharge columns only.
pub fn format_reading(data_type: DataType, reading: Reading) -> String {
    match reading {
        Reading::Measured(value) => format_value(value),
        Reading::Ice if data_type.is_discharge() => "Ice".to_string(),
        Reading::Ice | Reading::Missing => String::new(),
    }
}

pub fn format_value(value: f64) -> String {
    format!("{value}")
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map(format_value).unwrap_or_default()
}

/// Accepts RFC 3339 (converted to UTC), ISO without offset,
/// space-separated date-times and bare dates (midnight).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.naive_utc());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
