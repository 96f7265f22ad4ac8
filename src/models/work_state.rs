use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkState {
    Working,
    Resting,
    /// No activity observed yet, or the user stepped away.
    #[default]
    Idle,
}

impl WorkState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkState::Working => "Working",
            WorkState::Resting => "Resting",
            WorkState::Idle => "Idle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Working" => Some(WorkState::Working),
            "Resting" => Some(WorkState::Resting),
            "Idle" => Some(WorkState::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative seconds per state for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub work_secs: u64,
    pub rest_secs: u64,
    pub idle_secs: u64,
}

impl Totals {
    pub fn new(work_secs: u64, rest_secs: u64, idle_secs: u64) -> Self {
        Self {
            work_secs,
            rest_secs,
            idle_secs,
        }
    }

    pub fn total(&self) -> u64 {
        self.work_secs + self.rest_secs + self.idle_secs
    }

    pub fn get(&self, state: WorkState) -> u64 {
        match state {
            WorkState::Working => self.work_secs,
            WorkState::Resting => self.rest_secs,
            WorkState::Idle => self.idle_secs,
        }
    }

    /// Add `secs` to the counter for `state`.
    pub fn accrue(&mut self, state: WorkState, secs: u64) {
        let counter = match state {
            WorkState::Working => &mut self.work_secs,
            WorkState::Resting => &mut self.rest_secs,
            WorkState::Idle => &mut self.idle_secs,
        };
        *counter = counter.saturating_add(secs);
    }

    pub fn merged(&self, other: &Totals) -> Totals {
        Totals {
            work_secs: self.work_secs.saturating_add(other.work_secs),
            rest_secs: self.rest_secs.saturating_add(other.rest_secs),
            idle_secs: self.idle_secs.saturating_add(other.idle_secs),
        }
    }
}
