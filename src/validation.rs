use crate::constants::{MAX_FOCUS_MINUTES, MAX_HISTORY_DAYS, MAX_IDLE_THRESHOLD_SECS, MAX_WORK_APP_NAME_LEN};
use crate::error::AppError;

/// Validate the idle threshold in seconds.
/// Returns Ok(threshold) if valid.
pub fn validate_idle_threshold(secs: i64) -> Result<u64, AppError> {
    let secs = u64::try_from(secs).map_err(|_| AppError::ConfigurationInvalid {
        field: "idle_threshold_secs",
        reason: "cannot be negative".into(),
    })?;
    if secs == 0 {
        return Err(AppError::ConfigurationInvalid {
            field: "idle_threshold_secs",
            reason: "must be positive".into(),
        });
    }
    if secs > MAX_IDLE_THRESHOLD_SECS {
        return Err(AppError::ConfigurationInvalid {
            field: "idle_threshold_secs",
            reason: format!("cannot exceed {MAX_IDLE_THRESHOLD_SECS} seconds"),
        });
    }
    Ok(secs)
}

/// Validate a planned focus length in minutes.
/// Returns Ok(planned_secs) if valid.
pub fn validate_focus_minutes(minutes: i64) -> Result<i64, AppError> {
    if minutes <= 0 {
        return Err(AppError::ConfigurationInvalid {
            field: "focus_minutes",
            reason: "must be positive".into(),
        });
    }
    if minutes > MAX_FOCUS_MINUTES {
        return Err(AppError::ConfigurationInvalid {
            field: "focus_minutes",
            reason: format!("cannot exceed {MAX_FOCUS_MINUTES} minutes"),
        });
    }
    Ok(minutes * 60)
}

/// Validate the number of days of history to report.
pub fn validate_history_days(days: u32) -> Result<u32, AppError> {
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(AppError::ConfigurationInvalid {
            field: "days",
            reason: format!("must be between 1 and {MAX_HISTORY_DAYS}"),
        });
    }
    Ok(days)
}

/// Validate a single work app name.
pub fn validate_work_app_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::ConfigurationInvalid {
            field: "work_apps",
            reason: "app name cannot be empty".into(),
        });
    }
    if name.len() > MAX_WORK_APP_NAME_LEN {
        return Err(AppError::ConfigurationInvalid {
            field: "work_apps",
            reason: format!("app name cannot exceed {MAX_WORK_APP_NAME_LEN} characters"),
        });
    }
    if name.contains(',') {
        return Err(AppError::ConfigurationInvalid {
            field: "work_apps",
            reason: format!("app name '{name}' cannot contain a comma"),
        });
    }
    Ok(name)
}

/// Split the comma-separated work app list into trimmed, non-empty names.
///
/// Case is preserved: names are compared exactly against the foreground app.
pub fn parse_work_apps(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}
