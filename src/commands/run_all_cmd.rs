use tracing::info;

use crate::commands::download_cmd::download_command;
use crate::commands::events_cmd::events_command;
use crate::commands::plot_cmd::plot_command;
use crate::commands::setup_cmd::setup_command;
use crate::commands::stats_cmd::stats_command;
use crate::commands::winters_cmd::winters_command;
use crate::services::project_config::ProjectConfig;

/// Every stage in pipeline order. Each stage reads what the previous ones
/// wrote, so a skipped dataset simply has nothing downstream.
pub fn run_all_command(config: &ProjectConfig) {
    let stages: [(&str, fn(&ProjectConfig)); 6] = [
        ("setup", setup_command),
        ("download", download_command),
        ("winters", winters_command),
        ("events", events_command),
        ("stats", stats_command),
        ("plot", plot_command),
    ];
    for (name, stage) in stages {
        info!(stage = name, "starting stage");
        stage(config);
    }
}
