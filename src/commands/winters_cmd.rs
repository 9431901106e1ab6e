use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::domain::data_type::DataType;
use crate::services::download_metadata::{load_metadata_if_present, sampling_interval_minutes};
use crate::services::folder_setup::{FolderSetupError, ensure_folder};
use crate::services::project_config::ProjectConfig;
use crate::services::series_csv::{SeriesCsvError, load_series_if_present};
use crate::services::winter_folding::{fold_into_winters, format_summary, write_segment_csv};

#[derive(Error, Debug)]
pub enum WintersError {
    #[error(transparent)]
    Csv(#[from] SeriesCsvError),
    #[error(transparent)]
    Folder(#[from] FolderSetupError),
    #[error("failed to write winter summary {path}: {source}")]
    Summary { path: PathBuf, source: io::Error },
}

pub fn run_winters(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("winters");
    for data_type in DataType::ALL {
        match fold_data_type(config, data_type) {
            Ok(Some(outputs)) => outputs.into_iter().for_each(|path| report.record(path)),
            Ok(None) => {
                info!(%data_type, "no processed series; skipping");
                report.skip();
            }
            Err(e) => {
                error!(%data_type, error = %e, "winter split failed; skipping");
                report.skip();
            }
        }
    }
    report
}

fn fold_data_type(
    config: &ProjectConfig,
    data_type: DataType,
) -> Result<Option<Vec<PathBuf>>, WintersError> {
    let Some(series) = load_series_if_present(&config.processed_file(data_type), data_type)? else {
        return Ok(None);
    };
    let metadata = load_metadata_if_present(&config.metadata_file(data_type)).unwrap_or_else(|e| {
        warn!(%data_type, error = %e, "unreadable metadata; using default interval");
        None
    });
    let interval = sampling_interval_minutes(metadata.as_ref(), data_type);
    let segments = fold_into_winters(&series, interval, data_type.is_daily());

    let folder = config.winter_folder(data_type);
    ensure_folder(&folder)?;
    let mut outputs = Vec::with_capacity(segments.len() + 1);
    for segment in &segments {
        if segment.off_grid > 0 {
            warn!(
                %data_type,
                season = %segment.season_label(),
                off_grid = segment.off_grid,
                interval,
                "observations off the expected grid were dropped"
            );
        }
        let path = folder.join(data_type.winter_file_name(&config.gage_number, segment.water_year));
        write_segment_csv(&path, segment)?;
        info!(
            %data_type,
            season = %segment.season_label(),
            completeness = segment.completeness,
            "winter split written"
        );
        outputs.push(path);
    }

    let summary_path = config.winter_splits_folder().join(format!(
        "{}_{}_WinterSummary.txt",
        config.gage_number,
        data_type.label()
    ));
    let mut summary = format_summary(&segments);
    summary.push('\n');
    std::fs::write(&summary_path, summary).map_err(|source| WintersError::Summary {
        path: summary_path.clone(),
        source,
    })?;
    outputs.push(summary_path);
    Ok(Some(outputs))
}

pub fn winters_command(config: &ProjectConfig) {
    let report = run_winters(config);
    println!("Winter splits written to {}", config.winter_splits_folder().display());
    println!("{}", format_stage_report(&report));
}
