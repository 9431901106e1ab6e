use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::services::folder_setup::{FolderSetupError, ensure_folder};
use crate::services::project_config::{LogFormat, LoggingConfig};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error(transparent)]
    Folder(#[from] FolderSetupError),
    #[error("failed to create log file {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn log_file_name(stage: &str, started: NaiveDateTime) -> String {
    format!("{stage}_{}.log", started.format("%Y-%m-%d_%H-%M-%S"))
}

/// `RUST_LOG` wins over the configured level; an unusable level falls back
/// to `info`.
pub fn level_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);
    match format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Installs the global subscriber: stderr plus a per-run file
/// `<log_dir>/<stage>_<timestamp>.log`. Returns the log file path.
pub fn init_logging(
    config: &LoggingConfig,
    log_dir: &Path,
    stage: &str,
) -> Result<PathBuf, LoggingError> {
    ensure_folder(log_dir)?;
    let path = log_dir.join(log_file_name(stage, Local::now().naive_local()));
    let file = File::create(&path).map_err(|source| LoggingError::CreateFile {
        path: path.clone(),
        source,
    })?;

    let layers = vec![
        fmt_layer(config.format, io::stderr, true),
        fmt_layer(config.format, Mutex::new(file), false),
    ];
    tracing_subscriber::registry()
        .with(layers)
        .with(level_filter(config))
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))?;
    Ok(path)
}
