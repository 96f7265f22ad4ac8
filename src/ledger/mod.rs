//! Per-state time accrual for the current day.
//!
//! The ledger owns the current state, the three counters and the list of
//! event subscribers. Only the tracker's tick thread advances it; everyone
//! else reads through the same mutex.

use crate::constants::FLUSH_INTERVAL_SECS;
use crate::day::DayBounds;
use crate::models::{Snapshot, Totals, WorkState};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

/// Seconds credited per tick. Ticks are taken to be exactly this far apart.
const SECS_PER_TICK: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub previous: WorkState,
    pub new: WorkState,
    pub timestamp: i64,
    /// How long `previous` lasted, in wall-clock seconds.
    pub previous_duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LedgerEvent {
    StateChanged(StateChange),
    Totals {
        timestamp: i64,
        state: WorkState,
        totals: Totals,
    },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: WorkState,
    pub transition: Option<StateChange>,
    /// Closing snapshot of the previous day when the tick crossed midnight.
    pub rollover: Option<Snapshot>,
    /// Periodic snapshot due after this tick.
    pub flush: Option<Snapshot>,
}

pub struct TimeLedger {
    state: WorkState,
    state_since: i64,
    totals: Totals,
    day: DayBounds,
    subscribers: Vec<Sender<LedgerEvent>>,
}

impl TimeLedger {
    /// Start in `Idle` with `baseline` as the day's totals so far.
    pub fn new(baseline: Totals, day: DayBounds, now: i64) -> Self {
        Self {
            state: WorkState::default(),
            state_since: now,
            totals: baseline,
            day,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkState {
        self.state
    }

    pub fn state_since(&self) -> i64 {
        self.state_since
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn day(&self) -> DayBounds {
        self.day
    }

    /// Events are delivered in tick order; a state change comes before
    /// that tick's totals.
    pub fn subscribe(&mut self) -> Receiver<LedgerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self, timestamp: i64) -> Snapshot {
        Snapshot::new(timestamp, self.state, self.totals)
    }

    /// Add totals that were persisted before this process started counting.
    pub fn absorb_baseline(&mut self, baseline: Totals) {
        self.totals = self.totals.merged(&baseline);
    }

    /// Switch state without crediting any time.
    pub fn set_state(&mut self, state: WorkState, now: i64) -> Option<StateChange> {
        let change = self.transition_to(state, now)?;
        self.publish(&LedgerEvent::StateChanged(change.clone()));
        Some(change)
    }

    /// Apply the classifier's verdict and credit one tick to the resulting state.
    pub fn advance(&mut self, next: Option<WorkState>, now: i64) -> TickOutcome {
        let rollover = self.roll_over_if_needed(now);

        let transition = next.and_then(|state| self.transition_to(state, now));
        self.totals.accrue(self.state, SECS_PER_TICK);

        let flush = (self.totals.total() % FLUSH_INTERVAL_SECS == 0).then(|| self.snapshot(now));

        if let Some(change) = &transition {
            self.publish(&LedgerEvent::StateChanged(change.clone()));
        }
        self.publish(&LedgerEvent::Totals {
            timestamp: now,
            state: self.state,
            totals: self.totals,
        });

        TickOutcome {
            state: self.state,
            transition,
            rollover,
            flush,
        }
    }

    fn transition_to(&mut self, state: WorkState, now: i64) -> Option<StateChange> {
        if state == self.state {
            return None;
        }

        let change = StateChange {
            previous: self.state,
            new: state,
            timestamp: now,
            previous_duration_secs: (now - self.state_since).max(0),
        };
        log::info!(
            "State {} -> {} after {}s",
            change.previous,
            change.new,
            change.previous_duration_secs
        );

        self.state = state;
        self.state_since = now;
        Some(change)
    }

    // A clock that jumps backwards keeps counting into the current day.
    fn roll_over_if_needed(&mut self, now: i64) -> Option<Snapshot> {
        if now < self.day.end {
            return None;
        }

        let closing = self.snapshot(self.day.last_second());
        log::info!(
            "Day ended with work={}s rest={}s idle={}s",
            closing.totals.work_secs,
            closing.totals.rest_secs,
            closing.totals.idle_secs
        );

        self.totals = Totals::default();
        self.day = DayBounds::containing(now);
        Some(closing)
    }

    fn publish(&mut self, event: &LedgerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
