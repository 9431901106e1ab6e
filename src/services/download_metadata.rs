use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::data_type::DataType;
use crate::services::sampling::{Gap, IntervalChange, SamplingAnalysis};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to access metadata {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse metadata {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// JSON sidecar written next to each processed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub site: String,
    pub parameter_code: String,
    pub service: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub download_date: String,
    pub record_count: usize,
    pub completeness_percent: f64,
    pub sampling_interval_minutes: i64,
    #[serde(default)]
    pub gaps: Vec<Gap>,
    #[serde(default)]
    pub interval_changes: Vec<IntervalChange>,
}

impl DownloadMetadata {
    pub fn new(
        site: &str,
        data_type: DataType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        record_count: usize,
        analysis: SamplingAnalysis,
    ) -> Self {
        Self {
            site: site.to_string(),
            parameter_code: data_type.parameter_code().to_string(),
            service: data_type.service().code().to_string(),
            start_date,
            end_date,
            download_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            record_count,
            completeness_percent: analysis.completeness_percent,
            sampling_interval_minutes: analysis.sampling_interval_minutes,
            gaps: analysis.gaps,
            interval_changes: analysis.interval_changes,
        }
    }
}

pub fn write_metadata(path: &Path, metadata: &DownloadMetadata) -> Result<(), MetadataError> {
    let json = serde_json::to_string_pretty(metadata).map_err(|source| MetadataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_metadata_if_present(path: &Path) -> Result<Option<DownloadMetadata>, MetadataError> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Sampling interval recorded at download time, or the data type default.
pub fn sampling_interval_minutes(metadata: Option<&DownloadMetadata>, data_type: DataType) -> u32 {
    metadata
        .map(|metadata| metadata.sampling_interval_minutes)
        .filter(|minutes| *minutes > 0)
        .and_then(|minutes| u32::try_from(minutes).ok())
        .unwrap_or_else(|| data_type.default_interval_minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, on_date};
    use assert_fs::prelude::*;

    fn sample_metadata() -> DownloadMetadata {
        DownloadMetadata::new(
            "03020500",
            DataType::InstQw,
            on_date(2020, 1, 1),
            on_date(2020, 3, 31),
            42,
            SamplingAnalysis {
                sampling_interval_minutes: 5,
                completeness_percent: 88.5,
                gaps: vec![Gap {
                    start: at(2020, 1, 1, 0, 0),
                    end: at(2020, 1, 1, 6, 0),
                    minutes: 360,
                }],
                interval_changes: vec![],
            },
        )
    }

    #[test]
    fn written_metadata_loads_back() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("meta.json");
        let metadata = sample_metadata();

        write_metadata(file.path(), &metadata).unwrap();
        let loaded = load_metadata_if_present(file.path()).unwrap().unwrap();

        assert_eq!(loaded, metadata);
        assert_eq!(loaded.service, "iv");
        assert_eq!(loaded.parameter_code, "00060");
    }

    #[test]
    fn interval_prefers_metadata_then_default() {
        let metadata = sample_metadata();
        assert_eq!(sampling_interval_minutes(Some(&metadata), DataType::InstQw), 5);
        assert_eq!(sampling_interval_minutes(None, DataType::InstQw), 15);
        assert_eq!(sampling_interval_minutes(None, DataType::DailyQw), 1440);
    }

    #[test]
    fn absent_metadata_is_none() {
        let temp = assert_fs::TempDir::new().unwrap();
        assert!(load_metadata_if_present(&temp.path().join("x.json")).unwrap().is_none());
    }

    #[test]
    fn malformed_metadata_is_a_parse_error() {
        let file = assert_fs::NamedTempFile::new("bad.json").unwrap();
        file.write_str("{ not json").unwrap();
        let err = load_metadata_if_present(file.path()).unwrap_err();
        assert!(matches!(err, MetadataError::Parse { .. }));
    }
}
