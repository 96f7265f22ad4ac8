//! worktally: splits computer time into working, resting and idle.
//!
//! - `worktally run` (default): track in the foreground until SIGINT/SIGTERM
//! - `worktally today` / `worktally history --days N`: print totals as JSON
//! - `worktally focus start|stop|status`: manage the work focus override
//! - `worktally config show|set`: inspect or change tracker settings

use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use worktally_lib::commands::{self, SettingsPatch};
use worktally_lib::day::now_unix;
use worktally_lib::focus::FocusManager;
use worktally_lib::settings::SettingsStore;
use worktally_lib::{default_db_path, default_settings_path, open_database};

#[derive(Parser, Debug)]
#[command(name = "worktally")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file (default: the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Settings file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track activity until interrupted
    Run,
    /// Print today's totals
    Today,
    /// Print per-day totals
    History {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    /// Manage the work focus override
    Focus {
        #[command(subcommand)]
        action: FocusAction,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum FocusAction {
    Start {
        /// Planned length; open-ended when omitted
        #[arg(short, long)]
        minutes: Option<i64>,
    },
    Stop,
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        auto_detect: Option<bool>,
        #[arg(long)]
        idle_threshold: Option<i64>,
        /// Comma-separated app names, matched case-sensitively
        #[arg(long)]
        work_apps: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let settings_path = match cli.config {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let now = now_unix();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => worktally_lib::run(&db_path, settings_path)?,
        Command::Today => print_json(&commands::today(&open_database(&db_path)?, now)?)?,
        Command::History { days } => print_json(&commands::history(&open_database(&db_path)?, days, now)?)?,
        Command::Focus { action } => {
            let focus = FocusManager::new(open_database(&db_path)?);
            let state = match action {
                FocusAction::Start { minutes } => commands::focus_start(&focus, minutes, now)?,
                FocusAction::Stop => commands::focus_stop(&focus, now)?,
                FocusAction::Status => commands::focus_status(&focus, now)?,
            };
            print_json(&state)?;
        }
        Command::Config { action } => {
            let settings = SettingsStore::new(settings_path);
            let shown = match action {
                ConfigAction::Show => commands::config_show(&settings),
                ConfigAction::Set {
                    auto_detect,
                    idle_threshold,
                    work_apps,
                } => commands::config_set(
                    &settings,
                    SettingsPatch {
                        auto_detect_enabled: auto_detect,
                        idle_threshold_secs: idle_threshold,
                        work_apps,
                    },
                )?,
            };
            print_json(&shown)?;
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout, reason = "command output is the JSON on stdout")]
fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
