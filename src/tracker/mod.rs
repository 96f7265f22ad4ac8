//! The tick loop: sample, classify, accrue, flush.

use crate::classifier::{Classifier, ClassifierInput};
use crate::constants::TICK_INTERVAL_SECS;
use crate::day::{now_unix, DayBounds};
use crate::error::AppError;
use crate::flusher::{Flusher, SnapshotStore};
use crate::focus::FocusSignal;
use crate::ledger::{LedgerEvent, TimeLedger};
use crate::models::{Totals, WorkState};
use crate::platform::{IdleDetection, PlatformTracker};
use crate::safe_lock;
use crate::settings::EffectiveSettings;
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct TrackerConfig {
    pub tick_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(TICK_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageHealth {
    Healthy,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub idle_detection: IdleDetection,
    pub storage: StorageHealth,
}

/// State shared between the service handle and the tick thread.
struct Tracker {
    ledger: Mutex<TimeLedger>,
    classifier: Mutex<Classifier>,
    platform: Arc<dyn PlatformTracker>,
    focus: Arc<dyn FocusSignal>,
    flusher: Flusher,
    idle_detection: Mutex<IdleDetection>,
}

pub struct TrackerService {
    config: TrackerConfig,
    running: Arc<AtomicBool>,
    tracker: Arc<Tracker>,
}

impl TrackerService {
    /// Seed today's counters from storage and spawn the snapshot writer.
    pub fn new(
        platform: Arc<dyn PlatformTracker>,
        focus: Arc<dyn FocusSignal>,
        store: Arc<dyn SnapshotStore>,
        settings: &EffectiveSettings,
        config: TrackerConfig,
    ) -> Result<Self, AppError> {
        Self::starting_at(platform, focus, store, settings, config, now_unix())
    }

    pub(crate) fn starting_at(
        platform: Arc<dyn PlatformTracker>,
        focus: Arc<dyn FocusSignal>,
        store: Arc<dyn SnapshotStore>,
        settings: &EffectiveSettings,
        config: TrackerConfig,
        now: i64,
    ) -> Result<Self, AppError> {
        let day = DayBounds::containing(now);
        let (baseline, pending_day) = match store.load_latest_snapshot_for_day(day) {
            Ok(found) => (found.unwrap_or_default(), None),
            Err(e) => {
                warn!("Could not load today's totals, counting from zero: {e}");
                (Totals::default(), Some(day))
            }
        };
        info!(
            "Starting with work={}s rest={}s idle={}s",
            baseline.work_secs, baseline.rest_secs, baseline.idle_secs
        );

        let flusher = Flusher::spawn(store, pending_day)?;

        let tracker = Tracker {
            ledger: Mutex::new(TimeLedger::new(baseline, day, now)),
            classifier: Mutex::new(Classifier::new(settings)),
            platform,
            focus,
            flusher,
            idle_detection: Mutex::new(IdleDetection::Available),
        };

        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            tracker: Arc::new(tracker),
        })
    }

    /// Run the tick loop until [`stop`](Self::stop). The thread writes a final
    /// snapshot and closes the writer before it exits.
    pub fn start(&self) -> thread::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let tracker = Arc::clone(&self.tracker);
        let tick_interval = self.config.tick_interval;

        thread::spawn(move || {
            info!("Tracker started");
            while running.load(Ordering::SeqCst) {
                tracker.tick(now_unix());
                thread::sleep(tick_interval);
            }
            tracker.finish(now_unix());
            info!("Tracker stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn current_state(&self) -> WorkState {
        safe_lock(&self.tracker.ledger, "Ledger").state()
    }

    pub fn current_totals(&self) -> Totals {
        safe_lock(&self.tracker.ledger, "Ledger").totals()
    }

    pub fn health(&self) -> HealthReport {
        self.tracker.health()
    }

    pub fn subscribe(&self) -> Receiver<LedgerEvent> {
        safe_lock(&self.tracker.ledger, "Ledger").subscribe()
    }

    /// Force a state until the next classification changes it.
    pub fn set_state(&self, state: WorkState) {
        safe_lock(&self.tracker.ledger, "Ledger").set_state(state, now_unix());
    }

    pub fn reload_settings(&self, settings: &EffectiveSettings) {
        safe_lock(&self.tracker.classifier, "Classifier").reload(settings);
        info!(
            "Settings reloaded: idle threshold {}s, {} work apps, auto-detect {}",
            settings.idle_threshold_secs,
            settings.work_apps.len(),
            settings.auto_detect_enabled
        );
    }

    #[cfg(test)]
    fn tick(&self, now: i64) {
        self.tracker.tick(now);
    }

    #[cfg(test)]
    fn finish(&self, now: i64) {
        self.tracker.finish(now);
    }
}

impl Tracker {
    fn tick(&self, now: i64) {
        let sample = self.platform.sample();
        self.note_idle_detection(sample.idle_detection);

        let input = ClassifierInput {
            idle_secs: sample.idle_secs,
            foreground_app: sample.foreground_app.as_deref(),
            work_focus_active: self.focus.is_work_focus_active(),
        };

        let mut ledger = safe_lock(&self.ledger, "Ledger");
        self.absorb_loaded_baseline(&mut ledger);

        let verdict = safe_lock(&self.classifier, "Classifier").classify(&input, ledger.state());
        let outcome = ledger.advance(verdict, now);

        if let Some(closing) = outcome.rollover {
            self.flusher.submit(closing);
            self.flusher.start_day();
        }

        if let Some(snapshot) = outcome.flush {
            self.flusher.submit(snapshot);
        }
    }

    /// Write the last snapshot and wait for the writer to drain.
    fn finish(&self, now: i64) {
        let snapshot = {
            let mut ledger = safe_lock(&self.ledger, "Ledger");
            self.absorb_loaded_baseline(&mut ledger);
            ledger.snapshot(now)
        };
        self.flusher.submit(snapshot);
        self.flusher.shutdown();
    }

    /// Pick up earlier totals the writer thread managed to load.
    fn absorb_loaded_baseline(&self, ledger: &mut TimeLedger) {
        if let Some(baseline) = self.flusher.take_loaded_baseline(ledger.day()) {
            ledger.absorb_baseline(baseline);
        }
    }

    fn note_idle_detection(&self, current: IdleDetection) {
        let mut last = safe_lock(&self.idle_detection, "Idle detection");
        if *last == current {
            return;
        }

        match current {
            IdleDetection::Available => info!("Idle detection available again"),
            IdleDetection::PermissionDenied => {
                warn!("Idle detection not permitted; the user will never be classified idle");
            }
            IdleDetection::Unavailable => {
                warn!("Idle detection unavailable; the user will never be classified idle");
            }
        }
        *last = current;
    }

    fn health(&self) -> HealthReport {
        let day = safe_lock(&self.ledger, "Ledger").day();
        let storage = if self.flusher.storage_healthy() && !self.flusher.baseline_pending_for(day) {
            StorageHealth::Healthy
        } else {
            StorageHealth::Unavailable
        };

        HealthReport {
            idle_detection: *safe_lock(&self.idle_detection, "Idle detection"),
            storage,
        }
    }
}
