//! Shared test utilities.
//!
//! Temporary databases plus in-memory fakes for the sampler, the focus
//! signal and the snapshot store.

#![cfg(test)]

use crate::day::DayBounds;
use crate::db::{migrations, Database};
use crate::error::AppError;
use crate::flusher::SnapshotStore;
use crate::focus::FocusSignal;
use crate::models::{Snapshot, Totals};
use crate::platform::{ActiveWindow, PlatformTracker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleBackend {
    Working,
    Denied,
    Missing,
}

struct FakeReading {
    idle_secs: u64,
    app: Option<String>,
    backend: IdleBackend,
}

/// Sampler whose readings are set by the test.
pub struct FakePlatform {
    reading: Mutex<FakeReading>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            reading: Mutex::new(FakeReading {
                idle_secs: 0,
                app: None,
                backend: IdleBackend::Working,
            }),
        }
    }

    pub fn set(&self, idle_secs: u64, app: Option<&str>) {
        let mut reading = self.reading.lock().unwrap();
        reading.idle_secs = idle_secs;
        reading.app = app.map(ToString::to_string);
    }

    pub fn deny_permission(&self) {
        self.reading.lock().unwrap().backend = IdleBackend::Denied;
    }

    pub fn make_unavailable(&self) {
        self.reading.lock().unwrap().backend = IdleBackend::Missing;
    }

    pub fn restore_idle_detection(&self) {
        self.reading.lock().unwrap().backend = IdleBackend::Working;
    }
}

impl PlatformTracker for FakePlatform {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        let reading = self.reading.lock().unwrap();
        reading.app.as_ref().map(|app| ActiveWindow {
            app_name: app.clone(),
            window_title: None,
            bundle_id: None,
        })
    }

    fn get_idle_time_secs(&self) -> Result<u64, AppError> {
        let reading = self.reading.lock().unwrap();
        match reading.backend {
            IdleBackend::Working => Ok(reading.idle_secs),
            IdleBackend::Denied => Err(AppError::PermissionDenied {
                capability: "idle detection",
            }),
            IdleBackend::Missing => Err(AppError::Unavailable {
                capability: "idle detection",
                reason: "fake backend disabled".into(),
            }),
        }
    }
}

/// Focus override toggled by the test.
pub struct StaticFocus(AtomicBool);

impl StaticFocus {
    pub fn new(active: bool) -> Self {
        Self(AtomicBool::new(active))
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::SeqCst);
    }
}

impl FocusSignal for StaticFocus {
    fn is_work_focus_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot store kept in memory, with switchable failures.
pub struct MemoryStore {
    snapshots: Mutex<Vec<Snapshot>>,
    fail_writes: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
        }
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.snapshots.lock().unwrap().push(snapshot);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_loads(&self, failing: bool) {
        self.fail_loads.store(failing, Ordering::SeqCst);
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn load_latest_snapshot_for_day(&self, day: DayBounds) -> Result<Option<Totals>, AppError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable("fake load failure".into()));
        }
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .iter()
            .filter(|s| day.contains(s.timestamp))
            .max_by_key(|s| s.timestamp)
            .map(|s| s.totals))
    }

    fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable("fake write failure".into()));
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}
