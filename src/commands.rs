//! Operations behind the CLI subcommands. Each returns a serializable value;
//! printing is left to the binary.

use crate::day::DayBounds;
use crate::db::{with_connection, Database};
use crate::error::AppError;
use crate::focus::{FocusManager, FocusState};
use crate::models::{DailyTotals, Snapshot, Totals, WorkState};
use crate::settings::{SettingsStore, TrackerSettings};
use crate::validation::{
    validate_focus_minutes, validate_history_days, validate_idle_threshold, validate_work_app_name,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub date: Option<String>,
    /// State at the last snapshot; `None` when nothing was recorded today.
    pub state: Option<WorkState>,
    pub recorded_at: Option<i64>,
    pub totals: Totals,
}

/// Changes requested by `config set`; `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct SettingsPatch {
    pub auto_detect_enabled: Option<bool>,
    pub idle_threshold_secs: Option<i64>,
    pub work_apps: Option<String>,
}

pub fn today(db: &Arc<Mutex<Database>>, now: i64) -> Result<TodayResponse, AppError> {
    let day = DayBounds::containing(now);
    let latest = with_connection(db, "read today's snapshot", |conn| {
        Snapshot::find_latest_in_range(conn, day.start, day.end)
    })?;

    Ok(TodayResponse {
        date: day.date().map(|d| d.format("%Y-%m-%d").to_string()),
        state: latest.as_ref().map(|s| s.state),
        recorded_at: latest.as_ref().map(|s| s.timestamp),
        totals: latest.map(|s| s.totals).unwrap_or_default(),
    })
}

/// Per-day totals for the last `days` days, today included.
pub fn history(db: &Arc<Mutex<Database>>, days: u32, now: i64) -> Result<Vec<DailyTotals>, AppError> {
    let days = validate_history_days(days)?;
    let last = DayBounds::containing(now);
    let first = (1..days).fold(last, |day, _| day.previous());

    with_connection(db, "read daily totals", |conn| Snapshot::daily_totals(conn, first, last))
}

pub fn focus_start(focus: &FocusManager, minutes: Option<i64>, now: i64) -> Result<FocusState, AppError> {
    let planned_secs = minutes.map(validate_focus_minutes).transpose()?;
    focus.start_session(now, planned_secs)?;
    focus.get_state(now)
}

pub fn focus_stop(focus: &FocusManager, now: i64) -> Result<FocusState, AppError> {
    focus.end_session(now)?;
    focus.get_state(now)
}

pub fn focus_status(focus: &FocusManager, now: i64) -> Result<FocusState, AppError> {
    focus.get_state(now)
}

pub fn config_show(settings: &SettingsStore) -> TrackerSettings {
    settings.get()
}

/// Validate and persist a settings change. A running tracker applies it on SIGHUP.
pub fn config_set(settings: &SettingsStore, patch: SettingsPatch) -> Result<TrackerSettings, AppError> {
    let mut updated = settings.get();

    if let Some(enabled) = patch.auto_detect_enabled {
        updated.auto_detect_enabled = enabled;
    }
    if let Some(secs) = patch.idle_threshold_secs {
        validate_idle_threshold(secs)?;
        updated.idle_threshold_secs = secs;
    }
    if let Some(raw) = patch.work_apps {
        let names = raw
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(validate_work_app_name)
            .collect::<Result<Vec<_>, _>>()?;
        updated.work_apps = names.join(", ");
    }

    settings.update(updated.clone())?;
    Ok(updated)
}
