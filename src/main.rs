use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use icebreakup::commands::base_commands::{CliArgs, Commands};
use icebreakup::commands::download_cmd::download_command;
use icebreakup::commands::events_cmd::events_command;
use icebreakup::commands::plot_cmd::plot_command;
use icebreakup::commands::run_all_cmd::run_all_command;
use icebreakup::commands::setup_cmd::setup_command;
use icebreakup::commands::stats_cmd::stats_command;
use icebreakup::commands::winters_cmd::winters_command;
use icebreakup::services::logging::init_logging;
use icebreakup::services::project_config::ProjectConfig;
use tracing::info;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    if let Commands::Completions { shell } = args.command {
        let mut command = CliArgs::command();
        let name = command.get_name().to_string();
        generate(shell, &mut command, name, &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match ProjectConfig::from_yaml_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stage = args.command.stage_name();
    match init_logging(&config.logging, &config.folder("logs"), stage) {
        Ok(path) => info!(log_file = %path.display(), gage = %config.gage_number, "{stage} started"),
        Err(e) => eprintln!("Logging to file disabled: {e}"),
    }

    match args.command {
        Commands::Setup => setup_command(&config),
        Commands::Download => download_command(&config),
        Commands::Winters => winters_command(&config),
        Commands::Events => events_command(&config),
        Commands::Stats => stats_command(&config),
        Commands::Plot => plot_command(&config),
        Commands::RunAll => run_all_command(&config),
        Commands::Completions { .. } => {}
    }
    ExitCode::SUCCESS
}
