pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL,
    state TEXT NOT NULL,
    work_secs INTEGER NOT NULL,
    rest_secs INTEGER NOT NULL,
    idle_secs INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS focus_sessions (
    id INTEGER PRIMARY KEY,
    started_at INTEGER NOT NULL,
    ended_at INTEGER,
    planned_secs INTEGER
);

CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON snapshots(timestamp);
CREATE INDEX IF NOT EXISTS idx_focus_sessions_active ON focus_sessions(ended_at) WHERE ended_at IS NULL;
";
