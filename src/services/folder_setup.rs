use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::services::project_config::ProjectConfig;

const BREAKUP_DATES_PLACEHOLDER: &str =
    "# List breakup event dates here, one per line (YYYY-MM-DD)\n";

#[derive(Error, Debug)]
pub enum FolderSetupError {
    #[error("failed to create folder {path}: {source}")]
    CreateFolder { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    WriteFile { path: PathBuf, source: io::Error },
}

/// Creates the project folder tree and, if absent, a placeholder breakup
/// dates file. Returns every folder that was ensured.
pub fn initialize_project(config: &ProjectConfig) -> Result<Vec<PathBuf>, FolderSetupError> {
    let mut folders = vec![config.project_folder.clone()];
    folders.extend(config.folders.keys().map(|key| config.folder(key)));
    folders.push(config.winter_splits_folder());

    for folder in &folders {
        ensure_folder(folder)?;
    }

    let dates_file = &config.breakup_dates_file;
    if !dates_file.exists() {
        if let Some(parent) = dates_file.parent() {
            ensure_folder(parent)?;
        }
        std::fs::write(dates_file, BREAKUP_DATES_PLACEHOLDER).map_err(|source| {
            FolderSetupError::WriteFile {
                path: dates_file.clone(),
                source,
            }
        })?;
        info!(path = %dates_file.display(), "created breakup dates placeholder");
    }

    Ok(folders)
}

pub fn ensure_folder(path: &Path) -> Result<(), FolderSetupError> {
    std::fs::create_dir_all(path).map_err(|source| FolderSetupError::CreateFolder {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "folder ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    fn config_in(root: &Path) -> ProjectConfig {
        ProjectConfig::from_yaml_str(&format!(
            "base_folder: {}\ngage_number: '03020500'\nsite_name: OilCreek\n",
            root.display()
        ))
        .unwrap()
    }

    #[test]
    fn creates_folders_and_placeholder_dates_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = config_in(temp.path());

        initialize_project(&config).unwrap();

        let project = temp.child("03020500_OilCreek");
        project.child("Daily/Qw").assert(predicate::path::is_dir());
        project.child("Inst/Hw").assert(predicate::path::is_dir());
        project.child("ProcessedData/Winter_Splits").assert(predicate::path::is_dir());
        project
            .child("BreakupEvents/Event_Dates.txt")
            .assert(predicate::str::starts_with("# List breakup event dates"));
    }

    #[test]
    fn keeps_existing_dates_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = config_in(temp.path());
        let dates = temp.child("03020500_OilCreek/BreakupEvents/Event_Dates.txt");
        dates.write_str("2019-03-12\n").unwrap();

        initialize_project(&config).unwrap();

        dates.assert("2019-03-12\n");
    }
}
