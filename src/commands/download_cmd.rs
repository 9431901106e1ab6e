use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::domain::data_type::DataType;
use crate::services::download_metadata::{DownloadMetadata, MetadataError, write_metadata};
use crate::services::folder_setup::{FolderSetupError, ensure_folder};
use crate::services::project_config::{DateSpan, ProjectConfig};
use crate::services::sampling::analyze_sampling;
use crate::services::series_csv::{SeriesCsvError, TimestampStyle, write_series_csv};
use crate::services::usgs_api::{FetchError, UsgsApiClient};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Folder(#[from] FolderSetupError),
    #[error(transparent)]
    Csv(#[from] SeriesCsvError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("failed to write raw response {path}: {source}")]
    RawResponse { path: PathBuf, source: io::Error },
}

/// Downloads every configured data type in order. A failed download is
/// logged and skipped.
pub fn run_download(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("download");
    let client = match UsgsApiClient::new(&config.service_url) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create USGS client");
            report.skipped = DataType::ALL.len();
            return report;
        }
    };

    for data_type in DataType::ALL {
        let Some(span) = config.available_dates.get(&data_type) else {
            warn!(%data_type, key = data_type.available_dates_key(), "no available_dates entry; skipping");
            report.skip();
            continue;
        };
        match download_data_type(config, &client, data_type, *span) {
            Ok(outputs) => outputs.into_iter().for_each(|path| report.record(path)),
            Err(e) => {
                error!(%data_type, error = %e, "download failed; skipping");
                report.skip();
            }
        }
    }
    report
}

fn download_data_type(
    config: &ProjectConfig,
    client: &UsgsApiClient,
    data_type: DataType,
    span: DateSpan,
) -> Result<Vec<PathBuf>, DownloadError> {
    info!(%data_type, start = %span.start, end = %span.end, "downloading");
    let fetched = client.fetch(&config.gage_number, data_type, span.start, span.end)?;
    if fetched.skipped > 0 {
        warn!(%data_type, skipped = fetched.skipped, "records without a readable dateTime");
    }
    if fetched.duplicates > 0 {
        warn!(%data_type, duplicates = fetched.duplicates, "records with a repeated timestamp dropped");
    }
    ensure_folder(&config.data_folder(data_type))?;

    let raw_path = config.raw_file(data_type);
    let raw = serde_json::to_vec_pretty(&fetched.raw).map_err(|e| DownloadError::RawResponse {
        path: raw_path.clone(),
        source: io::Error::other(e),
    })?;
    std::fs::write(&raw_path, raw).map_err(|source| DownloadError::RawResponse {
        path: raw_path.clone(),
        source,
    })?;

    let series = fetched.series;
    let csv_path = config.processed_file(data_type);
    write_series_csv(
        &csv_path,
        data_type,
        series.observations(),
        TimestampStyle::for_data_type(data_type),
    )?;

    let analysis = analyze_sampling(&series, i64::from(data_type.default_interval_minutes()));
    for gap in &analysis.gaps {
        info!(%data_type, start = %gap.start, end = %gap.end, minutes = gap.minutes, "missing data interval");
    }
    for change in &analysis.interval_changes {
        info!(
            %data_type,
            at = %change.at,
            from = change.from_minutes,
            to = change.to_minutes,
            "sampling interval change"
        );
    }
    let metadata = DownloadMetadata::new(
        &config.gage_number,
        data_type,
        span.start,
        span.end,
        series.len(),
        analysis,
    );
    let metadata_path = config.metadata_file(data_type);
    write_metadata(&metadata_path, &metadata)?;

    info!(
        %data_type,
        records = metadata.record_count,
        completeness = metadata.completeness_percent,
        interval = metadata.sampling_interval_minutes,
        "download complete"
    );
    Ok(vec![raw_path, csv_path, metadata_path])
}

pub fn download_command(config: &ProjectConfig) {
    let report = run_download(config);
    if report.outputs.is_empty() {
        eprintln!("No series downloaded for gage {}", config.gage_number);
    } else {
        println!("Series for gage {} written", config.gage_number);
    }
    println!("{}", format_stage_report(&report));
}
