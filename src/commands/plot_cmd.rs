use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::commands::stats_cmd::stats_file;
use crate::domain::data_type::DataType;
use crate::domain::series::TimeSeries;
use crate::domain::stats::Period;
use crate::domain::winter::season_label;
use crate::services::climate_stats::read_stats_csv;
use crate::services::folder_setup::ensure_folder;
use crate::services::project_config::ProjectConfig;
use crate::services::series_csv::load_series_if_present;
use crate::services::stats_plot::{AxisScale, write_stats_plot};
use crate::services::winter_plot::{WinterTraces, write_winter_plot};

const PLOTTED_PERIODS: [Period; 2] = [Period::DayOfYear, Period::Month];

pub fn winter_plots_folder(config: &ProjectConfig) -> PathBuf {
    config.folder("plots").join("Winter_Plots")
}

pub fn run_plot(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("plot");
    let plots = config.folder("plots");
    if let Err(e) = ensure_folder(&plots).and_then(|()| ensure_folder(&winter_plots_folder(config))) {
        error!(error = %e, "cannot create plot folders");
        report.skip();
        return report;
    }
    plot_stats(config, &plots, &mut report);
    plot_winters(config, &mut report);
    report
}

fn plot_stats(config: &ProjectConfig, plots: &Path, report: &mut StageReport) {
    for data_type in DataType::ALL {
        for period in PLOTTED_PERIODS {
            let source = stats_file(config, period, data_type);
            if !source.is_file() {
                info!(path = %source.display(), "no statistics file; skipping plot");
                continue;
            }
            let table = match read_stats_csv(&source, period, config.stats_precision) {
                Ok(table) => table,
                Err(e) => {
                    error!(%data_type, error = %e, "failed to read statistics");
                    report.skip();
                    continue;
                }
            };

            let prefix = format!("{}_{}", period.file_prefix(), data_type.label());
            let title = format!("{} - {}", config.gage_number, prefix.replace('_', " "));
            let y_desc = format!(
                "{} {} ({})",
                if data_type.is_daily() { "Daily" } else { "Instantaneous" },
                data_type.quantity(),
                data_type.unit()
            );
            for scale in [AxisScale::Linear, AxisScale::Log] {
                let path = plots.join(format!("{prefix}_{}.png", scale.file_suffix()));
                let title = match scale {
                    AxisScale::Linear => title.clone(),
                    AxisScale::Log => format!("{title} (Log Scale)"),
                };
                match write_stats_plot(&path, &table, &title, &y_desc, scale) {
                    Ok(()) => report.record(path),
                    Err(e) => {
                        warn!(%data_type, ?period, error = %e, "stats plot skipped");
                        report.skip();
                    }
                }
            }
        }
    }
}

/// Water years with a winter split file for `data_type`.
pub fn winter_seasons(config: &ProjectConfig, data_type: DataType) -> BTreeSet<i32> {
    let Ok(entries) = std::fs::read_dir(config.winter_folder(data_type)) else {
        return BTreeSet::new();
    };
    entries
        .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
        .filter_map(|name| {
            let (_, season) = name.strip_suffix(".csv")?.rsplit_once('_')?;
            let water_year = season.split_once('-')?.0.parse::<i32>().ok()?;
            (data_type.winter_file_name(&config.gage_number, water_year) == name).then_some(water_year)
        })
        .collect()
}

fn load_trace(config: &ProjectConfig, data_type: DataType, water_year: i32) -> Option<TimeSeries> {
    let path = config
        .winter_folder(data_type)
        .join(data_type.winter_file_name(&config.gage_number, water_year));
    load_series_if_present(&path, data_type).unwrap_or_else(|e| {
        warn!(%data_type, water_year, error = %e, "unreadable winter split; leaving it out");
        None
    })
}

fn plot_winters(config: &ProjectConfig, report: &mut StageReport) {
    let seasons: BTreeSet<i32> = DataType::ALL
        .into_iter()
        .flat_map(|data_type| winter_seasons(config, data_type))
        .collect();
    info!(count = seasons.len(), "winter seasons found");

    for water_year in seasons {
        let season = season_label(water_year);
        let traces = WinterTraces {
            daily_qw: load_trace(config, DataType::DailyQw, water_year),
            inst_qw: load_trace(config, DataType::InstQw, water_year),
            inst_hw: load_trace(config, DataType::InstHw, water_year),
        };
        let title = format!("{} {} - Winter {season}", config.gage_number, config.site_name);
        let path = winter_plots_folder(config).join(format!("Winter_{season}_CombinedPlot.png"));
        match write_winter_plot(&path, &title, water_year, &traces) {
            Ok(()) => {
                info!(%season, "winter plot written");
                report.record(path);
            }
            Err(e) => {
                warn!(%season, error = %e, "winter plot skipped");
                report.skip();
            }
        }
    }
}

pub fn plot_command(config: &ProjectConfig) {
    let report = run_plot(config);
    println!("Plots written to {}", config.folder("plots").display());
    println!("{}", format_stage_report(&report));
}
