use tracing::error;

use crate::commands::report_format::{StageReport, format_stage_report};
use crate::services::folder_setup::initialize_project;
use crate::services::project_config::ProjectConfig;

pub fn run_setup(config: &ProjectConfig) -> StageReport {
    let mut report = StageReport::new("setup");
    match initialize_project(config) {
        Ok(folders) => folders.into_iter().for_each(|folder| report.record(folder)),
        Err(e) => {
            error!(error = %e, "project setup failed");
            report.skip();
        }
    }
    report
}

pub fn setup_command(config: &ProjectConfig) {
    let report = run_setup(config);
    if report.skipped > 0 {
        eprintln!("Failed to set up project folders under {}", config.project_folder.display());
    } else {
        println!("Project folders ready under {}", config.project_folder.display());
    }
    println!("{}", format_stage_report(&report));
}
