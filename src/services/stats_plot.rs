use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

use crate::domain::stats::{Period, PeriodSummary, StatsTable};

#[derive(Error, Debug)]
pub enum StatsPlotError {
    #[error("stats table is empty")]
    EmptyTable,
    #[error("no positive values to draw on a log axis")]
    NoPositiveValues,
    #[error("failed to render stats plot: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log,
}

impl AxisScale {
    pub fn file_suffix(&self) -> &'static str {
        match self {
            AxisScale::Linear => "Linear",
            AxisScale::Log => "Log",
        }
    }

    /// Maps a value onto the drawn axis. Log axes are drawn in log10 space,
    /// so non-positive values have no position.
    fn project(&self, value: f64) -> Option<f64> {
        match self {
            AxisScale::Linear => Some(value),
            AxisScale::Log => (value > 0.0).then(|| value.log10()),
        }
    }

    fn tick_label(&self, position: f64) -> String {
        match self {
            AxisScale::Linear => format_tick(position),
            AxisScale::Log => format_tick(10f64.powf(position)),
        }
    }
}

fn format_tick(value: f64) -> String {
    if value >= 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

const BAND_COLORS: [RGBColor; 6] = [
    RGBColor(139, 0, 0),
    RGBColor(205, 92, 92),
    RGBColor(240, 128, 128),
    RGBColor(173, 216, 230),
    RGBColor(0, 191, 255),
    RGBColor(0, 0, 139),
];

/// (lower, upper) edges, top band first, matching `BAND_COLORS`.
fn band_edges(s: &PeriodSummary) -> [(f64, f64); 6] {
    [
        (s.p95, s.max),
        (s.p75, s.p95),
        (s.median, s.p75),
        (s.p25, s.median),
        (s.p5, s.p25),
        (s.min, s.p5),
    ]
}

// name, colour, dashed
const LINES: [(&str, RGBColor, bool); 4] = [
    ("Min", BLUE, false),
    ("Max", RED, false),
    ("Mean", BLACK, false),
    ("Median", BLACK, true),
];

fn line_values(s: &PeriodSummary) -> [f64; 4] {
    [s.min, s.max, s.mean, s.median]
}

fn render_error(err: impl std::fmt::Display) -> StatsPlotError {
    StatsPlotError::Render(err.to_string())
}

/// Draws Min/Max/Mean/Median lines over six shaded percentile bands, one
/// x slot per table row.
pub fn write_stats_plot(
    output_path: &Path,
    table: &StatsTable,
    title: &str,
    y_desc: &str,
    scale: AxisScale,
) -> Result<(), StatsPlotError> {
    if table.rows.is_empty() {
        return Err(StatsPlotError::EmptyTable);
    }
    let (y_low, y_high) = axis_bounds(table, scale).ok_or(StatsPlotError::NoPositiveValues)?;
    let x_max = table.rows.len().saturating_sub(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 28))
        .x_label_area_size(55)
        .y_label_area_size(75)
        .build_cartesian_2d(0f64..x_max, y_low..y_high)
        .map_err(render_error)?;

    let x_desc = match table.period {
        Period::DayOfYear => "Date",
        Period::Month | Period::YearMonth => "Month",
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 20))
        .x_labels(table.rows.len().min(12))
        .x_label_formatter(&|position| x_tick_label(table, *position))
        .y_label_formatter(&|position| scale.tick_label(*position))
        .draw()
        .map_err(render_error)?;

    for (band, color) in BAND_COLORS.iter().enumerate() {
        let fill = color.mix(0.5).filled();
        chart
            .draw_series(table.rows.windows(2).enumerate().filter_map(|(index, pair)| {
                let x0 = index as f64;
                let x1 = x0 + 1.0;
                let (low0, high0) = band_edges(&pair[0].summary)[band];
                let (low1, high1) = band_edges(&pair[1].summary)[band];
                let corners = vec![
                    (x0, scale.project(high0)?),
                    (x1, scale.project(high1)?),
                    (x1, scale.project(low1)?),
                    (x0, scale.project(low0)?),
                ];
                Some(Polygon::new(corners, fill))
            }))
            .map_err(render_error)?;
    }

    for (line, (name, color, dashed)) in LINES.into_iter().enumerate() {
        let style = color.stroke_width(2);
        let points = table.rows.iter().enumerate().map(|(index, row)| {
            scale
                .project(line_values(&row.summary)[line])
                .map(|y| (index as f64, y))
        });
        let mut labelled = false;
        for run in line_runs(points) {
            let pieces = if dashed { dash_pieces(&run) } else { vec![run] };
            let annotation = chart
                .draw_series(pieces.into_iter().map(|piece| PathElement::new(piece, style)))
                .map_err(render_error)?;
            if !labelled {
                annotation
                    .label(name)
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

fn x_tick_label(table: &StatsTable, position: f64) -> String {
    if position < 0.0 {
        return String::new();
    }
    table
        .rows
        .get(position.round() as usize)
        .map(|row| match table.period {
            Period::Month => row.label.chars().take(3).collect(),
            Period::DayOfYear | Period::YearMonth => row.label.clone(),
        })
        .unwrap_or_default()
}

/// Axis range covering every drawable value with a little headroom.
fn axis_bounds(table: &StatsTable, scale: AxisScale) -> Option<(f64, f64)> {
    let (low, high) = table
        .rows
        .iter()
        .flat_map(|row| [row.summary.min, row.summary.max])
        .filter_map(|value| scale.project(value))
        .fold(None, |bounds: Option<(f64, f64)>, value| match bounds {
            None => Some((value, value)),
            Some((low, high)) => Some((low.min(value), high.max(value))),
        })?;
    let pad = ((high - low) * 0.05).max(match scale {
        AxisScale::Linear => 1.0,
        AxisScale::Log => 0.1,
    });
    let low = match scale {
        AxisScale::Linear if low >= 0.0 => 0.0,
        _ => low - pad,
    };
    Some((low, high + pad))
}

/// Splits a sequence of optional points into runs of consecutive present
/// points, so lines break where data is missing.
pub(crate) fn line_runs(points: impl IntoIterator<Item = Option<(f64, f64)>>) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for point in points {
        match point {
            Some(point) => current.push(point),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Every other segment of a run, which reads as a dashed line.
pub(crate) fn dash_pieces(run: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    if run.len() < 2 {
        return vec![run.to_vec()];
    }
    run.windows(2).step_by(2).map(|pair| pair.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::climate_stats::aggregate;
    use crate::test_support::{build_daily_series, on_date};

    fn day_of_year_table() -> StatsTable {
        let values: Vec<f64> = (0..730).map(|day| 50.0 + (day % 365) as f64).collect();
        let series = build_daily_series(on_date(2019, 1, 1), &values);
        aggregate(&series, Period::DayOfYear, 0).unwrap()
    }

    #[test]
    fn line_runs_break_at_missing_points() {
        let runs = line_runs([
            Some((0.0, 1.0)),
            Some((1.0, 2.0)),
            None,
            None,
            Some((4.0, 3.0)),
        ]);
        assert_eq!(runs, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(4.0, 3.0)]]);
        assert!(line_runs([None, None]).is_empty());
    }

    #[test]
    fn dash_pieces_alternate_segments() {
        let run = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)];
        let pieces = dash_pieces(&run);
        assert_eq!(pieces, vec![vec![(0.0, 0.0), (1.0, 1.0)], vec![(2.0, 2.0), (3.0, 3.0)]]);
    }

    #[test]
    fn log_axis_ignores_non_positive_values() {
        let series = build_daily_series(on_date(2020, 1, 1), &[0.0, 10.0, 1000.0]);
        let table = aggregate(&series, Period::DayOfYear, 0).unwrap();

        let (low, high) = axis_bounds(&table, AxisScale::Log).unwrap();
        assert!(low < 1.0 && low > 0.5);
        assert!(high > 3.0);

        let zeros = build_daily_series(on_date(2020, 1, 1), &[0.0]);
        let table = aggregate(&zeros, Period::DayOfYear, 0).unwrap();
        assert!(axis_bounds(&table, AxisScale::Log).is_none());
    }

    #[test]
    fn month_ticks_use_short_names() {
        let series = build_daily_series(on_date(2020, 1, 1), &[1.0; 60]);
        let table = aggregate(&series, Period::Month, 0).unwrap();
        assert_eq!(x_tick_label(&table, 0.0), "Jan");
        assert_eq!(x_tick_label(&table, 1.0), "Feb");
        assert_eq!(x_tick_label(&table, 5.0), "");
    }

    #[test]
    fn writes_linear_and_log_pngs() {
        let temp = assert_fs::TempDir::new().unwrap();
        let table = day_of_year_table();

        for scale in [AxisScale::Linear, AxisScale::Log] {
            let path = temp.path().join(format!("DailyStats_Daily_Qw_{}.png", scale.file_suffix()));
            write_stats_plot(&path, &table, "03020500 - DailyStats Daily Qw", "Daily Discharge (cfs)", scale)
                .unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let table = StatsTable {
            period: Period::Month,
            precision: 0,
            rows: Vec::new(),
        };
        let err = write_stats_plot(&temp.path().join("x.png"), &table, "t", "y", AxisScale::Linear)
            .unwrap_err();
        assert!(matches!(err, StatsPlotError::EmptyTable));
    }
}
