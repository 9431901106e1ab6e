pub mod base_commands;
pub mod download_cmd;
pub mod events_cmd;
pub mod plot_cmd;
pub mod report_format;
pub mod run_all_cmd;
pub mod setup_cmd;
pub mod stats_cmd;
pub mod winters_cmd;
