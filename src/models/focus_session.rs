use rusqlite::{params, Connection, Result};
use serde::Serialize;

/// A user-started work focus period; while active the tracker counts Working.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusSession {
    pub id: Option<i64>,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    /// Planned length; `None` runs until ended by hand.
    pub planned_secs: Option<i64>,
}

impl FocusSession {
    pub fn new(started_at: i64, planned_secs: Option<i64>) -> Self {
        Self {
            id: None,
            started_at,
            ended_at: None,
            planned_secs,
        }
    }

    pub fn save(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO focus_sessions (started_at, ended_at, planned_secs) VALUES (?1, ?2, ?3)",
            params![self.started_at, self.ended_at, self.planned_secs],
        )?;
        self.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    pub fn find_active(conn: &Connection) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, started_at, ended_at, planned_secs
             FROM focus_sessions WHERE ended_at IS NULL ORDER BY started_at DESC, id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self {
                id: Some(row.get(0)?),
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                planned_secs: row.get(3)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Ends the session at `ended_at`.
    /// Returns an error if the session has not been saved yet (id is None).
    pub fn end(&mut self, conn: &Connection, ended_at: i64) -> Result<()> {
        let id = self.id.ok_or_else(|| {
            rusqlite::Error::InvalidParameterName("Cannot end unsaved session - call save() first".to_string())
        })?;

        self.ended_at = Some(ended_at);

        conn.execute(
            "UPDATE focus_sessions SET ended_at = ?1 WHERE id = ?2",
            params![ended_at, id],
        )?;

        Ok(())
    }

    pub fn elapsed_secs(&self, now: i64) -> i64 {
        (self.ended_at.unwrap_or(now) - self.started_at).max(0)
    }

    pub fn remaining_secs(&self, now: i64) -> Option<i64> {
        self.planned_secs
            .map(|planned| (planned - self.elapsed_secs(now)).max(0))
    }

    /// Planned length fully used up.
    pub fn has_lapsed(&self, now: i64) -> bool {
        self.remaining_secs(now) == Some(0)
    }
}
