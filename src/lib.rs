pub mod classifier;
pub mod commands;
pub mod constants;
pub mod day;
pub mod db;
pub mod error;
pub mod flusher;
pub mod focus;
pub mod ledger;
pub mod models;
pub mod platform;
pub mod settings;
#[cfg(test)]
mod test_utils;
pub mod tracker;
pub mod validation;

use crate::db::{migrations, Database};
use crate::error::AppError;
use crate::flusher::SqliteSnapshotStore;
use crate::focus::FocusManager;
use crate::platform::NativeTracker;
use crate::settings::SettingsStore;
use crate::tracker::{TrackerConfig, TrackerService};
use directories::ProjectDirs;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How often the foreground loop checks for signals.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for startup failures
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not determine project directories")]
    NoProjectDirs,
    #[error("Could not create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("Failed to open database: {0}")]
    DatabaseOpen(rusqlite::Error),
    #[error("Failed to run database migrations: {0}")]
    Migration(rusqlite::Error),
    #[error("Failed to start tracker: {0}")]
    Tracker(AppError),
    #[error("Failed to register signal handler: {0}")]
    Signals(std::io::Error),
}

fn project_dirs() -> Result<ProjectDirs, InitError> {
    ProjectDirs::from("com", "worktally", "Worktally").ok_or(InitError::NoProjectDirs)
}

pub fn default_db_path() -> Result<PathBuf, InitError> {
    Ok(project_dirs()?.data_dir().join("worktally.db"))
}

pub fn default_settings_path() -> Result<PathBuf, InitError> {
    Ok(project_dirs()?.config_dir().join("settings.json"))
}

/// Open the database at `path`, creating its directory and schema as needed.
pub fn open_database(path: &Path) -> Result<Arc<Mutex<Database>>, InitError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(InitError::DataDirCreation)?;
    }
    let db = Database::open(path).map_err(InitError::DatabaseOpen)?;
    migrations::run(db.connection()).map_err(InitError::Migration)?;
    Ok(Arc::new(Mutex::new(db)))
}

/// Lock a mutex, recovering from poisoning if necessary
pub(crate) fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> std::sync::MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{context} mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Run the tracker in the foreground until SIGINT or SIGTERM.
///
/// SIGHUP re-reads the settings file.
pub fn run(db_path: &Path, settings_path: PathBuf) -> Result<(), InitError> {
    let settings = SettingsStore::new(settings_path);
    let db = open_database(db_path)?;
    info!("Database at {}", db_path.display());

    let tracker = TrackerService::new(
        Arc::new(NativeTracker::new()),
        Arc::new(FocusManager::new(Arc::clone(&db))),
        Arc::new(SqliteSnapshotStore::new(Arc::clone(&db))),
        &settings.get().effective(),
        TrackerConfig::default(),
    )
    .map_err(InitError::Tracker)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown)).map_err(InitError::Signals)?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown)).map_err(InitError::Signals)?;

    let reload = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&reload)).map_err(InitError::Signals)?;

    let handle = tracker.start();

    while !shutdown.load(Ordering::SeqCst) {
        if reload.swap(false, Ordering::SeqCst) {
            match settings.reload() {
                Ok(updated) => tracker.reload_settings(&updated.effective()),
                Err(e) => warn!("Keeping current settings, reload of {} failed: {e}", settings.path().display()),
            }
        }
        thread::sleep(SIGNAL_POLL_INTERVAL);
    }

    info!("Shutdown requested");
    tracker.stop();
    if let Err(e) = handle.join() {
        error!("Tracker thread panicked: {e:?}");
    }
    Ok(())
}
