use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::series::{Observation, Reading, TimeSeries};
use crate::domain::winter::WinterSegment;
use crate::services::sampling::round_to;
use crate::services::series_csv::{SeriesCsvError, TimestampStyle, write_series_csv};

const WINTER_START: &str = "11-01";
const WINTER_END: &str = "03-31";

/// Water year label: November and December belong to the season starting
/// that year, everything else to the season starting the year before.
pub fn water_year(timestamp: NaiveDateTime) -> i32 {
    if timestamp.month() >= 11 {
        timestamp.year()
    } else {
        timestamp.year() - 1
    }
}

/// Winter membership by `MM-DD` string comparison. Zero-padded month-day
/// strings sort in calendar order, so this selects Nov 1 to Mar 31.
pub fn in_winter(timestamp: NaiveDateTime) -> bool {
    let month_day = timestamp.format("%m-%d").to_string();
    month_day.as_str() >= WINTER_START || month_day.as_str() <= WINTER_END
}

/// Expected timestamps for one water year. Daily grids are one slot per day
/// at noon, Nov 1 through Mar 31. Instantaneous grids start at midnight on
/// Nov 1 and step by `interval_minutes` through the end of Mar 31.
pub fn expected_grid(water_year: i32, interval_minutes: u32, daily: bool) -> Vec<NaiveDateTime> {
    let (Some(nov1), Some(apr1)) = (
        NaiveDate::from_ymd_opt(water_year, 11, 1),
        NaiveDate::from_ymd_opt(water_year + 1, 4, 1),
    ) else {
        return Vec::new();
    };

    let (first, step) = if daily {
        (nov1.and_time(noon()), Duration::days(1))
    } else {
        (
            nov1.and_time(NaiveTime::MIN),
            Duration::minutes(i64::from(interval_minutes.max(1))),
        )
    };
    let end = apr1.and_time(NaiveTime::MIN);

    let mut grid = Vec::new();
    let mut slot = first;
    while slot < end {
        grid.push(slot);
        slot += step;
    }
    grid
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Splits a series into water-year segments reindexed onto their expected
/// grids. Daily observations are matched by calendar date; instantaneous
/// observations must sit exactly on a grid slot and are otherwise counted
/// as `off_grid`.
pub fn fold_into_winters(
    series: &TimeSeries,
    interval_minutes: u32,
    is_daily: bool,
) -> Vec<WinterSegment> {
    let mut seasons: BTreeMap<i32, HashMap<NaiveDateTime, Reading>> = BTreeMap::new();
    let mut unmatched: BTreeMap<i32, usize> = BTreeMap::new();

    for observation in series.observations() {
        if !in_winter(observation.timestamp) {
            continue;
        }
        let season = water_year(observation.timestamp);
        let key = if is_daily {
            observation.timestamp.date().and_time(noon())
        } else {
            observation.timestamp
        };
        match seasons.entry(season).or_default().entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(observation.reading);
            }
            Entry::Occupied(_) => *unmatched.entry(season).or_default() += 1,
        }
    }

    seasons
        .into_iter()
        .map(|(season, readings)| {
            let grid = expected_grid(season, interval_minutes, is_daily);
            let rows: Vec<Observation> = grid
                .iter()
                .map(|slot| {
                    Observation::new(*slot, readings.get(slot).copied().unwrap_or(Reading::Missing))
                })
                .collect();
            let matched = grid.iter().filter(|slot| readings.contains_key(*slot)).count();
            let off_grid = readings.len() - matched + unmatched.get(&season).copied().unwrap_or(0);
            let completeness = completeness(&rows);

            WinterSegment {
                data_type: series.data_type,
                water_year: season,
                rows,
                completeness,
                off_grid,
            }
        })
        .collect()
}

/// Non-null rows over all rows × 100, rounded to 2 decimals. Only a grid
/// with no null rows reports 100.
pub fn completeness(rows: &[Observation]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let present = rows.iter().filter(|row| row.reading.is_present()).count();
    let percent = round_to(present as f64 / rows.len() as f64 * 100.0, 2);
    if present < rows.len() {
        percent.min(MAX_PARTIAL_COMPLETENESS)
    } else {
        percent
    }
}

const MAX_PARTIAL_COMPLETENESS: f64 = 99.99;

pub fn write_segment_csv(path: &Path, segment: &WinterSegment) -> Result<(), SeriesCsvError> {
    write_series_csv(path, segment.data_type, &segment.rows, TimestampStyle::DateTime)
}

/// One `Y-(Y+1): Completeness = NN.NN%` line per segment.
pub fn format_summary(segments: &[WinterSegment]) -> String {
    segments
        .iter()
        .map(|segment| {
            format!(
                "{}: Completeness = {:.2}%",
                segment.season_label(),
                segment.completeness
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
