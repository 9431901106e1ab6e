use tracing::{error, info, warn};

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::domain::data_type::DataType;
use crate::services::breakup_events::{extract_event, load_breakup_dates, write_event_csv};
use crate::services::project_config::ProjectConfig;
use crate::services::series_csv::load_series_if_present;

/// Extracts one event per (data type, listed date). Dates without data are
/// logged and skipped.
pub fn run_events(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("events");
    let dates = match load_breakup_dates(&config.breakup_dates_file) {
        Ok(dates) => dates,
        Err(e) => {
            error!(error = %e, "cannot read breakup dates");
            report.skip();
            return report;
        }
    };
    if dates.is_empty() {
        warn!(path = %config.breakup_dates_file.display(), "no breakup dates listed");
        return report;
    }

    for data_type in DataType::ALL {
        let series = match load_series_if_present(&config.processed_file(data_type), data_type) {
            Ok(Some(series)) => series,
            Ok(None) => {
                info!(%data_type, "no processed series; skipping");
                continue;
            }
            Err(e) => {
                error!(%data_type, error = %e, "failed to load series; skipping");
                report.skip();
                continue;
            }
        };

        let folder = config.folder("breakup_events").join(data_type.label());
        for date in &dates {
            let Some(event) = extract_event(&series, *date) else {
                warn!(%data_type, %date, "no data for breakup date");
                report.skip();
                continue;
            };
            let path = folder.join(event.file_name());
            match write_event_csv(&path, &event) {
                Ok(()) => {
                    info!(
                        %data_type,
                        %date,
                        peak = %event.peak_timestamp,
                        peak_value = event.peak_value,
                        "breakup event written"
                    );
                    report.record(path);
                }
                Err(e) => {
                    error!(%data_type, %date, error = %e, "failed to write breakup event");
                    report.skip();
                }
            }
        }
    }
    report
}

pub fn events_command(config: &ProjectConfig) {
    let report = run_events(config);
    println!("Breakup events written to {}", config.folder("breakup_events").display());
    println!("{}", format_stage_report(&report));
}
