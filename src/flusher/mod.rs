//! Snapshot persistence off the tick thread.

use crate::day::DayBounds;
use crate::db::{with_connection, Database};
use crate::error::{is_busy, AppError};
use crate::models::{Snapshot, Totals};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Where snapshots are read from and appended to.
pub trait SnapshotStore: Send + Sync {
    /// Totals of the most recent snapshot inside `day`, if any.
    fn load_latest_snapshot_for_day(&self, day: DayBounds) -> Result<Option<Totals>, AppError>;

    fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError>;
}

pub struct SqliteSnapshotStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteSnapshotStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

fn busy_to_unavailable(err: AppError) -> AppError {
    match err {
        AppError::Database(ref e) if is_busy(e) => {
            AppError::StorageUnavailable(format!("database is locked: {e}"))
        }
        other => other,
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load_latest_snapshot_for_day(&self, day: DayBounds) -> Result<Option<Totals>, AppError> {
        with_connection(&self.db, "load latest snapshot", |conn| {
            Snapshot::find_latest_in_range(conn, day.start, day.end)
        })
        .map(|found| found.map(|snapshot| snapshot.totals))
        .map_err(busy_to_unavailable)
    }

    fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let mut row = snapshot.clone();
        with_connection(&self.db, "append snapshot", |conn| row.save(conn)).map_err(busy_to_unavailable)
    }
}

enum FlushCommand {
    Write {
        snapshot: Snapshot,
        /// The ledger had already absorbed the day's earlier totals.
        baseline_included: bool,
    },
    Shutdown,
}

/// Earlier totals of a day whose startup load failed.
///
/// The writer retries the load before the next write for that day, adds
/// the result to every snapshot the ledger took before absorbing it, and
/// leaves it here for the tick thread to pick up.
#[derive(Default)]
struct BaselineRetry {
    pending_day: Mutex<Option<DayBounds>>,
    loaded: Mutex<Option<(DayBounds, Totals)>>,
}

impl BaselineRetry {
    fn pending_day(&self) -> MutexGuard<'_, Option<DayBounds>> {
        self.pending_day.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(&self) -> MutexGuard<'_, Option<(DayBounds, Totals)>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer thread that appends snapshots in submission order.
///
/// A failed write is logged and dropped. The next snapshot carries the
/// cumulative totals, so it catches up on its own. The tick thread only
/// ever sends over a channel, so storage never delays a tick.
pub struct Flusher {
    sender: mpsc::Sender<FlushCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    storage_healthy: Arc<AtomicBool>,
    baseline: Arc<BaselineRetry>,
    baseline_included: AtomicBool,
}

impl Flusher {
    /// `pending_day` names a day whose earlier totals could not be loaded yet.
    pub fn spawn(store: Arc<dyn SnapshotStore>, pending_day: Option<DayBounds>) -> Result<Self, AppError> {
        let (sender, receiver) = mpsc::channel::<FlushCommand>();
        let storage_healthy = Arc::new(AtomicBool::new(true));
        let baseline = Arc::new(BaselineRetry {
            pending_day: Mutex::new(pending_day),
            loaded: Mutex::new(None),
        });

        let mut writer = Writer {
            store,
            healthy: Arc::clone(&storage_healthy),
            baseline: Arc::clone(&baseline),
            carry: None,
        };

        let worker = thread::Builder::new()
            .name("worktally-flusher".into())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        FlushCommand::Write {
                            snapshot,
                            baseline_included,
                        } => writer.write(snapshot, baseline_included),
                        FlushCommand::Shutdown => break,
                    }
                }
                info!("Flusher thread shutting down");
            })?;

        Ok(Self {
            sender,
            worker: Mutex::new(Some(worker)),
            storage_healthy,
            baseline,
            baseline_included: AtomicBool::new(pending_day.is_none()),
        })
    }

    pub fn submit(&self, snapshot: Snapshot) {
        let command = FlushCommand::Write {
            snapshot,
            baseline_included: self.baseline_included.load(Ordering::SeqCst),
        };
        if self.sender.send(command).is_err() {
            error!("Flusher thread is gone, snapshot dropped");
        }
    }

    /// Earlier totals for `day` loaded by the writer since the last call.
    /// The caller must add them to its counters; later snapshots are
    /// written as submitted.
    pub fn take_loaded_baseline(&self, day: DayBounds) -> Option<Totals> {
        let (loaded_day, totals) = self.baseline.loaded().take()?;
        if loaded_day != day {
            return None;
        }
        self.baseline_included.store(true, Ordering::SeqCst);
        Some(totals)
    }

    /// A new day starts from zero, so it has no earlier totals to wait for.
    pub fn start_day(&self) {
        self.baseline_included.store(true, Ordering::SeqCst);
    }

    /// Whether `day`'s earlier totals are still unknown.
    pub fn baseline_pending_for(&self, day: DayBounds) -> bool {
        *self.baseline.pending_day() == Some(day)
    }

    /// Whether the most recent write succeeded.
    pub fn storage_healthy(&self) -> bool {
        self.storage_healthy.load(Ordering::SeqCst)
    }

    /// Drain queued writes and join the writer thread. Safe to call twice.
    pub fn shutdown(&self) {
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            if let Err(err) = self.sender.send(FlushCommand::Shutdown) {
                error!("Failed to send shutdown to flusher thread: {err}");
            }
            if let Err(err) = handle.join() {
                error!("Failed to join flusher thread: {err:?}");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Writer {
    store: Arc<dyn SnapshotStore>,
    healthy: Arc<AtomicBool>,
    baseline: Arc<BaselineRetry>,
    /// Baseline this thread loaded, for snapshots taken before the ledger absorbed it.
    carry: Option<(DayBounds, Totals)>,
}

impl Writer {
    fn write(&mut self, mut snapshot: Snapshot, baseline_included: bool) {
        if !baseline_included {
            let day = DayBounds::containing(snapshot.timestamp);
            let pending = *self.baseline.pending_day() == Some(day);
            if pending && !self.load_baseline(day) {
                // Writing now would hide the earlier totals from the next load.
                self.healthy.store(false, Ordering::SeqCst);
                warn!("Skipping snapshot at {}: today's earlier totals are still unreadable", snapshot.timestamp);
                return;
            }
            if let Some((carry_day, carried)) = self.carry {
                if carry_day == day {
                    snapshot.totals = snapshot.totals.merged(&carried);
                }
            }
        }

        self.append(&snapshot);
    }

    fn load_baseline(&mut self, day: DayBounds) -> bool {
        match self.store.load_latest_snapshot_for_day(day) {
            Ok(found) => {
                let baseline = found.unwrap_or_default();
                info!(
                    "Loaded earlier totals: work={}s rest={}s idle={}s",
                    baseline.work_secs, baseline.rest_secs, baseline.idle_secs
                );
                self.carry = Some((day, baseline));
                *self.baseline.loaded() = Some((day, baseline));
                *self.baseline.pending_day() = None;
                true
            }
            Err(e) => {
                warn!("Still unable to load earlier totals: {e}");
                false
            }
        }
    }

    fn append(&self, snapshot: &Snapshot) {
        match self.store.append_snapshot(snapshot) {
            Ok(()) => {
                if !self.healthy.swap(true, Ordering::SeqCst) {
                    info!("Storage recovered, snapshot at {} written", snapshot.timestamp);
                }
            }
            Err(e) => {
                let was_healthy = self.healthy.swap(false, Ordering::SeqCst);
                if !e.is_storage() {
                    error!("Snapshot at {} could not be written: {e}", snapshot.timestamp);
                } else if was_healthy {
                    warn!("Storage unavailable, skipping snapshot at {}: {e}", snapshot.timestamp);
                }
            }
        }
    }
}
