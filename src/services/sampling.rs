use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::series::TimeSeries;

/// Sub-daily differences longer than this are missing data, not a sampling
/// change.
pub const GAP_THRESHOLD_MINUTES: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalChange {
    pub at: NaiveDateTime,
    pub from_minutes: i64,
    pub to_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingAnalysis {
    pub sampling_interval_minutes: i64,
    pub completeness_percent: f64,
    pub gaps: Vec<Gap>,
    pub interval_changes: Vec<IntervalChange>,
}

/// Derives the nominal sampling interval, gaps and interval changes from
/// successive timestamp differences.
///
/// The nominal interval is the median of differences up to the gap
/// threshold, which is [`GAP_THRESHOLD_MINUTES`] or `default_minutes` when
/// that is longer (daily series). `default_minutes` is also the interval
/// when no regular difference exists.
pub fn analyze_sampling(series: &TimeSeries, default_minutes: i64) -> SamplingAnalysis {
    let threshold = GAP_THRESHOLD_MINUTES.max(default_minutes);
    let observations = series.observations();
    let mut regular = Vec::new();
    let mut gaps = Vec::new();
    let mut interval_changes = Vec::new();
    let mut current: Option<i64> = None;

    for pair in observations.windows(2) {
        let (previous, next) = (pair[0].timestamp, pair[1].timestamp);
        let minutes = (next - previous).num_minutes();
        if minutes > threshold {
            gaps.push(Gap {
                start: previous,
                end: next,
                minutes,
            });
            continue;
        }
        regular.push(minutes);
        match current {
            Some(from) if from != minutes => {
                interval_changes.push(IntervalChange {
                    at: previous,
                    from_minutes: from,
                    to_minutes: minutes,
                });
                current = Some(minutes);
            }
            Some(_) => {}
            None => current = Some(minutes),
        }
    }

    let sampling_interval_minutes = median_minutes(&mut regular).unwrap_or(default_minutes);
    let completeness_percent = completeness_over_span(series, sampling_interval_minutes);

    SamplingAnalysis {
        sampling_interval_minutes,
        completeness_percent,
        gaps,
        interval_changes,
    }
}

/// Lower median for even counts so the result is always an observed step.
fn median_minutes(values: &mut [i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[(values.len() - 1) / 2])
}

/// Present values over expected slots between the first and last timestamp.
pub fn completeness_over_span(series: &TimeSeries, interval_minutes: i64) -> f64 {
    let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) else {
        return 0.0;
    };
    if interval_minutes <= 0 {
        return 0.0;
    }
    let expected = (last - first).num_minutes() / interval_minutes + 1;
    let percent = series.present_count() as f64 / expected as f64 * 100.0;
    round_to(percent.min(100.0), 2)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_type::DataType;
    use crate::test_support::{at, build_series};

    #[test]
    fn detects_nominal_interval_gaps_and_changes() {
        let series = build_series(
            DataType::InstQw,
            &[
                (at(2020, 1, 1, 0, 0), Some(1.0)),
                (at(2020, 1, 1, 0, 15), Some(1.0)),
                (at(2020, 1, 1, 0, 30), Some(1.0)),
                (at(2020, 1, 1, 0, 45), Some(1.0)),
                // 3h15m outage
                (at(2020, 1, 1, 4, 0), Some(1.0)),
                (at(2020, 1, 1, 4, 5), Some(1.0)),
                (at(2020, 1, 1, 4, 10), Some(1.0)),
            ],
        );

        let analysis = analyze_sampling(&series, 15);

        assert_eq!(analysis.sampling_interval_minutes, 15);
        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].minutes, 195);
        assert_eq!(analysis.gaps[0].start, at(2020, 1, 1, 0, 45));
        assert_eq!(
            analysis.interval_changes,
            vec![IntervalChange {
                at: at(2020, 1, 1, 4, 0),
                from_minutes: 15,
                to_minutes: 5,
            }]
        );
    }

    #[test]
    fn daily_series_uses_day_steps_as_regular() {
        let series = build_series(
            DataType::DailyQw,
            &[
                (at(2020, 1, 1, 0, 0), Some(1.0)),
                (at(2020, 1, 2, 0, 0), None),
                (at(2020, 1, 3, 0, 0), Some(1.0)),
                (at(2020, 1, 4, 0, 0), Some(1.0)),
                (at(2020, 1, 6, 0, 0), Some(1.0)),
            ],
        );

        let analysis = analyze_sampling(&series, 1440);

        assert_eq!(analysis.sampling_interval_minutes, 1440);
        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].minutes, 2880);
        assert!(analysis.interval_changes.is_empty());
        // 4 values over 6 expected days
        assert_eq!(analysis.completeness_percent, 66.67);
    }

    #[test]
    fn completeness_of_empty_series_is_zero() {
        let series = build_series(DataType::InstHw, &[]);
        assert_eq!(completeness_over_span(&series, 15), 0.0);
    }
}
