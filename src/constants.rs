// src/constants.rs

/// Seconds in one day (24 * 60 * 60)
pub const SECS_PER_DAY: i64 = 86400;

/// Idle threshold used when none (or an invalid one) is configured
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 300;

/// Largest accepted idle threshold (24 hours)
pub const MAX_IDLE_THRESHOLD_SECS: u64 = 24 * 60 * 60;

/// Accumulated seconds between two periodic snapshot writes
pub const FLUSH_INTERVAL_SECS: u64 = 60;

/// Seconds between two tracker ticks
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Maximum length of one work app name
pub const MAX_WORK_APP_NAME_LEN: usize = 200;

/// Work apps written to a fresh settings file
pub const DEFAULT_WORK_APPS: &str = "Xcode, Terminal, Visual Studio Code";

/// Longest planned focus session in minutes (24 hours)
pub const MAX_FOCUS_MINUTES: i64 = 24 * 60;

/// Longest history window the CLI reports, in days
pub const MAX_HISTORY_DAYS: u32 = 366;
