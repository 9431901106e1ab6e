use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Month, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use thiserror::Error;
use tracing::warn;

use crate::domain::series::TimeSeries;
use crate::domain::stats::{Period, PeriodSummary, StatsRow, StatsTable};
use crate::services::percentiles::{interpolated_sorted, median_sorted};
use crate::services::sampling::round_to;
use crate::services::series_csv::{SeriesCsvError, create_writer, format_value};

pub const STATS_COLUMNS: [&str; 8] = ["Min", "Max", "Mean", "Median", "P5", "P25", "P75", "P95"];

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("no data for {0:?} aggregation")]
    NoDataForWindow(Period),
}

pub fn period_key(period: Period, timestamp: NaiveDateTime) -> String {
    match period {
        Period::DayOfYear => timestamp.format("%m-%d").to_string(),
        Period::Month => timestamp.format("%m").to_string(),
        Period::YearMonth => timestamp.format("%Y-%m").to_string(),
    }
}

fn period_label(period: Period, key: &str) -> String {
    match period {
        Period::Month => key
            .parse::<u8>()
            .ok()
            .and_then(|number| Month::try_from(number).ok())
            .map(|month| month.name().to_string())
            .unwrap_or_else(|| key.to_string()),
        Period::DayOfYear | Period::YearMonth => key.to_string(),
    }
}

/// Groups present values by period key across all years and summarises
/// each group. Keys are zero-padded, so key order is calendar order.
pub fn aggregate(
    series: &TimeSeries,
    period: Period,
    precision: u32,
) -> Result<StatsTable, StatsError> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for observation in series.observations() {
        if let Some(value) = observation.value() {
            groups
                .entry(period_key(period, observation.timestamp))
                .or_default()
                .push(value);
        }
    }
    if groups.is_empty() {
        return Err(StatsError::NoDataForWindow(period));
    }

    let rows = groups
        .into_iter()
        .filter_map(|(key, mut values)| {
            let summary = summarize(&mut values, precision)?;
            Some(StatsRow {
                label: period_label(period, &key),
                key,
                summary,
            })
        })
        .collect();

    Ok(StatsTable {
        period,
        precision,
        rows,
    })
}

/// Min, max, mean, median and P5/P25/P75/P95 of `values`, rounded.
pub fn summarize(values: &mut [f64], precision: u32) -> Option<PeriodSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let round = |value: f64| round_to(value, precision);

    Some(PeriodSummary {
        min: round(values[0]),
        max: round(values[values.len() - 1]),
        mean: round(mean),
        median: round(median_sorted(values)?),
        p5: round(interpolated_sorted(values, 5.0)?),
        p25: round(interpolated_sorted(values, 25.0)?),
        p75: round(interpolated_sorted(values, 75.0)?),
        p95: round(interpolated_sorted(values, 95.0)?),
    })
}

pub fn write_stats_csv(path: &Path, table: &StatsTable) -> Result<(), SeriesCsvError> {
    let mut writer = create_writer(path)?;
    let csv_error = |source| SeriesCsvError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut header = vec![table.period.header()];
    header.extend(STATS_COLUMNS);
    writer.write_record(&header).map_err(csv_error)?;

    for row in &table.rows {
        let summary = &row.summary;
        let mut record = vec![row.label.clone()];
        record.extend(
            [
                summary.min,
                summary.max,
                summary.mean,
                summary.median,
                summary.p5,
                summary.p25,
                summary.p75,
                summary.p95,
            ]
            .into_iter()
            .map(format_value),
        );
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SeriesCsvError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a table written by [`write_stats_csv`]. Rows whose numbers do not
/// parse are logged and skipped.
pub fn read_stats_csv(
    path: &Path,
    period: Period,
    precision: u32,
) -> Result<StatsTable, SeriesCsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| SeriesCsvError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let csv_error = |source| SeriesCsvError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let found: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
    let mut expected = vec![period.header().to_string()];
    expected.extend(STATS_COLUMNS.iter().map(|column| column.to_string()));
    if found != expected {
        return Err(SeriesCsvError::SchemaMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let label = record.get(0).unwrap_or_default().to_string();
        let numbers: Option<Vec<f64>> = (1..=STATS_COLUMNS.len())
            .map(|column| record.get(column).and_then(|cell| cell.parse().ok()))
            .collect();
        let Some(numbers) = numbers else {
            warn!(path = %path.display(), row = index + 1, "skipping unreadable stats row");
            continue;
        };
        rows.push(StatsRow {
            key: key_for_label(period, &label),
            label,
            summary: PeriodSummary {
                min: numbers[0],
                max: numbers[1],
                mean: numbers[2],
                median: numbers[3],
                p5: numbers[4],
                p25: numbers[5],
                p75: numbers[6],
                p95: numbers[7],
            },
        });
    }

    Ok(StatsTable {
        period,
        precision,
        rows,
    })
}

fn key_for_label(period: Period, label: &str) -> String {
    match period {
        Period::Month => label
            .parse::<Month>()
            .map(|month| format!("{:02}", month.number_from_month()))
            .unwrap_or_else(|_| label.to_string()),
        Period::DayOfYear | Period::YearMonth => label.to_string(),
    }
}
