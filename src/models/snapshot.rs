use crate::day::DayBounds;
use crate::db::helpers::{column_u64, to_sql_i64};
use crate::models::{Totals, WorkState};
use rusqlite::{params, Connection, Result, Row};
use serde::Serialize;

/// One append-only row of cumulative per-state totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: Option<i64>,
    pub timestamp: i64,
    pub state: WorkState,
    pub totals: Totals,
}

/// Latest snapshot of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotals {
    pub date: String,
    pub last_state: WorkState,
    pub recorded_at: i64,
    pub totals: Totals,
}

fn row_to_snapshot(row: &Row<'_>) -> Result<Snapshot> {
    let label: String = row.get(2)?;
    let state = WorkState::parse(&label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown work state '{label}'").into(),
        )
    })?;

    Ok(Snapshot {
        id: Some(row.get(0)?),
        timestamp: row.get(1)?,
        state,
        totals: Totals {
            work_secs: column_u64(row, 3)?,
            rest_secs: column_u64(row, 4)?,
            idle_secs: column_u64(row, 5)?,
        },
    })
}

impl Snapshot {
    pub fn new(timestamp: i64, state: WorkState, totals: Totals) -> Self {
        Self {
            id: None,
            timestamp,
            state,
            totals,
        }
    }

    pub fn save(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO snapshots (timestamp, state, work_secs, rest_secs, idle_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.timestamp,
                self.state.as_str(),
                to_sql_i64(self.totals.work_secs)?,
                to_sql_i64(self.totals.rest_secs)?,
                to_sql_i64(self.totals.idle_secs)?,
            ],
        )?;
        self.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    /// Most recent snapshot with `start <= timestamp < end`.
    pub fn find_latest_in_range(conn: &Connection, start: i64, end: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, state, work_secs, rest_secs, idle_secs
             FROM snapshots WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query(params![start, end])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_snapshot(row)?)),
            None => Ok(None),
        }
    }

    pub fn find_in_range(conn: &Connection, start: i64, end: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, state, work_secs, rest_secs, idle_secs
             FROM snapshots WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp, id",
        )?;

        let rows = stmt.query_map(params![start, end], row_to_snapshot)?;
        rows.collect()
    }

    /// Latest snapshot of every local day from `first` through `last`, oldest first.
    /// Days without snapshots are skipped.
    pub fn daily_totals(conn: &Connection, first: DayBounds, last: DayBounds) -> Result<Vec<DailyTotals>> {
        // Local days are not all the same length, so their bounds come from chrono.
        let mut bounds: Vec<[i64; 2]> = Vec::new();
        let mut day = first;
        while day.start <= last.start {
            bounds.push([day.start, day.end]);
            day = DayBounds::containing(day.end);
        }
        let bounds = serde_json::to_string(&bounds).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let mut stmt = conn.prepare(
            "WITH days(day_start, day_end) AS (
                 SELECT json_extract(value, '$[0]'), json_extract(value, '$[1]') FROM json_each(?1)
             )
             SELECT s.id, s.timestamp, s.state, s.work_secs, s.rest_secs, s.idle_secs, d.day_start
             FROM days d
             JOIN snapshots s ON s.id = (
                 SELECT id FROM snapshots
                 WHERE timestamp >= d.day_start AND timestamp < d.day_end
                 ORDER BY timestamp DESC, id DESC LIMIT 1
             )
             ORDER BY d.day_start",
        )?;

        let rows = stmt.query_map(params![bounds], |row| {
            let snapshot = row_to_snapshot(row)?;
            let day = DayBounds::containing(row.get(6)?);
            Ok(DailyTotals {
                date: day
                    .date()
                    .map_or_else(|| day.start.to_string(), |d| d.format("%Y-%m-%d").to_string()),
                last_state: snapshot.state,
                recorded_at: snapshot.timestamp,
                totals: snapshot.totals,
            })
        })?;
        rows.collect()
    }
}
