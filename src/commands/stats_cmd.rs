use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::domain::data_type::DataType;
use crate::domain::stats::Period;
use crate::services::climate_stats::{aggregate, write_stats_csv};
use crate::services::project_config::ProjectConfig;
use crate::services::series_csv::load_series_if_present;

pub const STATS_PERIODS: [Period; 3] = [Period::DayOfYear, Period::YearMonth, Period::Month];

/// `<stats>/<Prefix>_<Label>.csv`
pub fn stats_file(config: &ProjectConfig, period: Period, data_type: DataType) -> PathBuf {
    config
        .folder("stats")
        .join(format!("{}_{}.csv", period.file_prefix(), data_type.label()))
}

pub fn run_stats(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("stats");
    for data_type in DataType::ALL {
        let series = match load_series_if_present(&config.processed_file(data_type), data_type) {
            Ok(Some(series)) => series,
            Ok(None) => {
                info!(%data_type, "no processed series; skipping");
                report.skip();
                continue;
            }
            Err(e) => {
                error!(%data_type, error = %e, "failed to load series; skipping");
                report.skip();
                continue;
            }
        };

        for period in STATS_PERIODS {
            let table = match aggregate(&series, period, config.stats_precision) {
                Ok(table) => table,
                Err(e) => {
                    warn!(%data_type, error = %e, "no statistics");
                    report.skip();
                    continue;
                }
            };
            let path = stats_file(config, period, data_type);
            match write_stats_csv(&path, &table) {
                Ok(()) => {
                    info!(%data_type, ?period, rows = table.rows.len(), "statistics written");
                    report.record(path);
                }
                Err(e) => {
                    error!(%data_type, ?period, error = %e, "failed to write statistics");
                    report.skip();
                }
            }
        }
    }
    report
}

pub fn stats_command(config: &ProjectConfig) {
    let report = run_stats(config);
    println!("Statistics written to {}", config.folder("stats").display());
    println!("{}", format_stage_report(&report));
}
