use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use plotters::prelude::*;
use thiserror::Error;

use crate::domain::series::{Observation, TimeSeries};
use crate::domain::winter::season_label;
use crate::services::stats_plot::{dash_pieces, line_runs};

#[derive(Error, Debug)]
pub enum WinterPlotError {
    #[error("no winter data to plot for {0}")]
    NoData(String),
    #[error("failed to render winter plot: {0}")]
    Render(String),
}

fn render_error(err: impl std::fmt::Display) -> WinterPlotError {
    WinterPlotError::Render(err.to_string())
}

/// The winter splits available for one season. Any of them may be absent.
#[derive(Debug, Default)]
pub struct WinterTraces {
    pub daily_qw: Option<TimeSeries>,
    pub inst_qw: Option<TimeSeries>,
    pub inst_hw: Option<TimeSeries>,
}

impl WinterTraces {
    pub fn is_empty(&self) -> bool {
        [&self.daily_qw, &self.inst_qw, &self.inst_hw]
            .into_iter()
            .all(|trace| trace.as_ref().is_none_or(|series| series.present_count() == 0))
    }
}

fn season_start(water_year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(water_year, 11, 1).map(|date| date.and_time(NaiveTime::MIN))
}

fn season_days(water_year: i32) -> Option<f64> {
    let start = season_start(water_year)?;
    let end = NaiveDate::from_ymd_opt(water_year + 1, 4, 1)?.and_time(NaiveTime::MIN);
    Some((end - start).num_days() as f64)
}

/// Days since Nov 1 00:00, the x coordinate of the winter plots.
fn day_offset(start: NaiveDateTime, timestamp: NaiveDateTime) -> f64 {
    (timestamp - start).num_minutes() as f64 / 1440.0
}

fn trace_points(start: NaiveDateTime, rows: &[Observation]) -> Vec<Option<(f64, f64)>> {
    rows.iter()
        .map(|row| row.value().map(|value| (day_offset(start, row.timestamp), value)))
        .collect()
}

fn max_value(series: Option<&TimeSeries>) -> f64 {
    series
        .into_iter()
        .flat_map(TimeSeries::observations)
        .filter_map(Observation::value)
        .fold(0.0, f64::max)
}

/// Daily discharge as a dashed black line, instantaneous discharge in red,
/// and gage height in blue on a secondary axis. Lines break at missing rows.
pub fn write_winter_plot(
    output_path: &Path,
    title: &str,
    water_year: i32,
    traces: &WinterTraces,
) -> Result<(), WinterPlotError> {
    let season = season_label(water_year);
    if traces.is_empty() {
        return Err(WinterPlotError::NoData(season));
    }
    let (Some(start), Some(days)) = (season_start(water_year), season_days(water_year)) else {
        return Err(WinterPlotError::NoData(season));
    };

    let discharge_max = max_value(traces.daily_qw.as_ref()).max(max_value(traces.inst_qw.as_ref()));
    let discharge_top = if discharge_max > 0.0 { discharge_max * 1.1 } else { 1.0 };
    let stage_max = max_value(traces.inst_hw.as_ref());
    let stage_top = if stage_max > 0.0 { stage_max * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 28))
        .x_label_area_size(55)
        .y_label_area_size(75)
        .right_y_label_area_size(75)
        .build_cartesian_2d(0f64..days, 0f64..discharge_top)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Date")
        .y_desc("Discharge (cfs)")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 20))
        .x_labels(6)
        .x_label_formatter(&|offset| {
            (start + Duration::minutes((offset * 1440.0).round() as i64))
                .format("%b-%d")
                .to_string()
        })
        .draw()
        .map_err(render_error)?;

    let mut chart = chart.set_secondary_coord(0f64..days, 0f64..stage_top);
    if traces.inst_hw.is_some() {
        chart
            .configure_secondary_axes()
            .y_desc("Gage Height (ft)")
            .label_style(("sans-serif", 16))
            .axis_desc_style(("sans-serif", 20))
            .draw()
            .map_err(render_error)?;
    }

    if let Some(series) = &traces.daily_qw {
        let style = BLACK.stroke_width(2);
        let mut labelled = false;
        for run in line_runs(trace_points(start, series.observations())) {
            let annotation = chart
                .draw_series(dash_pieces(&run).into_iter().map(|piece| PathElement::new(piece, style)))
                .map_err(render_error)?;
            if !labelled {
                annotation
                    .label("Daily Discharge")
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                labelled = true;
            }
        }
    }

    if let Some(series) = &traces.inst_qw {
        let style = RED.stroke_width(1);
        let mut labelled = false;
        for run in line_runs(trace_points(start, series.observations())) {
            let annotation = chart
                .draw_series(LineSeries::new(run, style))
                .map_err(render_error)?;
            if !labelled {
                annotation
                    .label("Instantaneous Discharge")
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                labelled = true;
            }
        }
    }

    if let Some(series) = &traces.inst_hw {
        let style = BLUE.stroke_width(1);
        let mut labelled = false;
        for run in line_runs(trace_points(start, series.observations())) {
            let annotation = chart
                .draw_secondary_series(LineSeries::new(run, style))
                .map_err(render_error)?;
            if !labelled {
                annotation
                    .label("Instantaneous Gage Height")
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                labelled = true;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 16))
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_type::DataType;
    use crate::services::winter_folding::fold_into_winters;
    use crate::test_support::{at, build_series};

    #[test]
    fn season_spans_nov_through_march() {
        assert_eq!(season_days(2019), Some(152.0));
        assert_eq!(season_days(2020), Some(151.0));
        let start = season_start(2019).unwrap();
        assert_eq!(day_offset(start, at(2019, 11, 2, 12, 0)), 1.5);
    }

    #[test]
    fn traces_without_values_are_empty() {
        assert!(WinterTraces::default().is_empty());
        let traces = WinterTraces {
            inst_qw: Some(build_series(DataType::InstQw, &[(at(2019, 11, 1, 0, 0), None)])),
            ..Default::default()
        };
        assert!(traces.is_empty());
    }

    #[test]
    fn empty_traces_are_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = write_winter_plot(
            &temp.path().join("Winter_2019-2020_CombinedPlot.png"),
            "t",
            2019,
            &WinterTraces::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WinterPlotError::NoData(season) if season == "2019-2020"));
    }

    #[test]
    fn writes_combined_png_with_gaps() {
        let temp = assert_fs::TempDir::new().unwrap();
        let daily = build_series(
            DataType::DailyQw,
            &[
                (at(2019, 11, 1, 12, 0), Some(100.0)),
                (at(2019, 11, 2, 12, 0), Some(120.0)),
                (at(2019, 11, 4, 12, 0), Some(90.0)),
            ],
        );
        let stage = build_series(
            DataType::InstHw,
            &[
                (at(2019, 11, 1, 0, 0), Some(2.5)),
                (at(2019, 11, 1, 0, 15), Some(2.6)),
                (at(2020, 2, 1, 0, 0), Some(4.0)),
            ],
        );
        let daily_segment = &fold_into_winters(&daily, 1440, true)[0];
        let (daily, _) = TimeSeries::from_observations(DataType::DailyQw, daily_segment.rows.clone());
        let traces = WinterTraces {
            daily_qw: Some(daily),
            inst_qw: None,
            inst_hw: Some(stage),
        };
        let path = temp.path().join("Winter_2019-2020_CombinedPlot.png");

        write_winter_plot(&path, "03020500 OilCreek - Winter 2019-2020", 2019, &traces).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
