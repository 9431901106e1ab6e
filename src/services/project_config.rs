use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::data_type::DataType;

pub const DEFAULT_SERVICE_URL: &str = "https://waterservices.usgs.gov/nwis";
const DEFAULT_PROJECT_FOLDER: &str = "${base_folder}/${gage_number}_${site_name}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("missing config key: {0}")]
    MissingKey(String),
    #[error("unknown placeholder ${{{placeholder}}} in {key}")]
    UnknownPlaceholder { key: String, placeholder: String },
    #[error("invalid date in available_dates.{key}: {value} (expected YYYY-MM-DD)")]
    InvalidDate { key: String, value: String },
    #[error("invalid date range in available_dates.{key}: {start} is after {end}")]
    InvalidDateRange {
        key: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Debug, Deserialize)]
struct ConfigRecord {
    base_folder: Option<String>,
    project_folder: Option<String>,
    gage_number: Option<String>,
    site_name: Option<String>,
    service_url: Option<String>,
    #[serde(default)]
    available_dates: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    folders: BTreeMap<String, String>,
    breakup_dates_file: Option<String>,
    stats_precision: Option<u32>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Resolved project settings passed explicitly to every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub gage_number: String,
    pub site_name: String,
    pub project_folder: PathBuf,
    pub service_url: String,
    pub available_dates: BTreeMap<DataType, DateSpan>,
    pub folders: BTreeMap<String, String>,
    pub breakup_dates_file: PathBuf,
    pub stats_precision: u32,
    pub logging: LoggingConfig,
}

fn default_folders() -> BTreeMap<String, String> {
    [
        ("daily_qw", "Daily/Qw"),
        ("inst_qw", "Inst/Qw"),
        ("inst_hw", "Inst/Hw"),
        ("processed_data", "ProcessedData"),
        ("breakup_events", "BreakupEvents"),
        ("stats", "Stats"),
        ("plots", "Plots"),
        ("logs", "Logs"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

impl ProjectConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let record: ConfigRecord =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_record(record)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let record: ConfigRecord =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        Self::from_record(record)
    }

    fn from_record(record: ConfigRecord) -> Result<Self, ConfigError> {
        let base_folder = required(record.base_folder, "base_folder")?;
        let gage_number = required(record.gage_number, "gage_number")?;
        let site_name = required(record.site_name, "site_name")?;

        let mut placeholders = BTreeMap::new();
        placeholders.insert("base_folder", base_folder.clone());
        placeholders.insert("gage_number", gage_number.clone());
        placeholders.insert("site_name", site_name.clone());

        let project_folder = resolve_placeholders(
            record
                .project_folder
                .as_deref()
                .unwrap_or(DEFAULT_PROJECT_FOLDER),
            &placeholders,
            "project_folder",
        )?;
        placeholders.insert("project_folder", project_folder.clone());

        let breakup_dates_file = match record.breakup_dates_file.as_deref() {
            Some(value) => resolve_placeholders(value, &placeholders, "breakup_dates_file")?,
            None => format!("{project_folder}/BreakupEvents/Event_Dates.txt"),
        };

        let mut folders = default_folders();
        for (key, value) in record.folders {
            let resolved = resolve_placeholders(&value, &placeholders, &format!("folders.{key}"))?;
            folders.insert(key, resolved);
        }

        let available_dates = DataType::ALL
            .iter()
            .filter_map(|data_type| {
                let key = data_type.available_dates_key();
                record
                    .available_dates
                    .get(key)
                    .map(|values| parse_span(key, values).map(|span| (*data_type, span)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            gage_number,
            site_name,
            project_folder: PathBuf::from(project_folder),
            service_url: record
                .service_url
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            available_dates,
            folders,
            breakup_dates_file: PathBuf::from(breakup_dates_file),
            stats_precision: record.stats_precision.unwrap_or(0),
            logging: record.logging,
        })
    }

    /// Absolute path of a named subfolder; relative folder values are joined
    /// onto the project folder.
    pub fn folder(&self, key: &str) -> PathBuf {
        let value = self
            .folders
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());
        self.project_folder.join(value)
    }

    pub fn data_folder(&self, data_type: DataType) -> PathBuf {
        self.folder(data_type.folder_key())
    }

    pub fn processed_file(&self, data_type: DataType) -> PathBuf {
        self.data_folder(data_type)
            .join(data_type.processed_file_name(&self.gage_number))
    }

    pub fn metadata_file(&self, data_type: DataType) -> PathBuf {
        self.data_folder(data_type)
            .join(data_type.metadata_file_name(&self.gage_number))
    }

    pub fn raw_file(&self, data_type: DataType) -> PathBuf {
        self.data_folder(data_type)
            .join(data_type.raw_file_name(&self.gage_number))
    }

    pub fn winter_splits_folder(&self) -> PathBuf {
        self.folder("processed_data").join("Winter_Splits")
    }

    pub fn winter_folder(&self, data_type: DataType) -> PathBuf {
        let [service, quantity] = data_type.winter_subfolder();
        self.winter_splits_folder().join(service).join(quantity)
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingKey(key.to_string())),
    }
}

/// Replaces `${name}` tokens with known values.
pub fn resolve_placeholders(
    template: &str,
    values: &BTreeMap<&str, String>,
    key: &str,
) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return Ok(output);
        };
        let name = &after[..end];
        let value = values
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPlaceholder {
                key: key.to_string(),
                placeholder: name.to_string(),
            })?;
        output.push_str(value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

fn parse_span(key: &str, values: &[String]) -> Result<DateSpan, ConfigError> {
    let [start, end] = values else {
        return Err(ConfigError::MissingKey(format!(
            "available_dates.{key} (expected [start, end])"
        )));
    };
    let start = parse_date(key, start)?;
    let end = parse_date(key, end)?;
    if start > end {
        return Err(ConfigError::InvalidDateRange {
            key: key.to_string(),
            start,
            end,
        });
    }
    Ok(DateSpan { start, end })
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        key: key.to_string(),
        value: value.to_string(),
    })
}
