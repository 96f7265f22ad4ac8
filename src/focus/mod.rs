use crate::day::now_unix;
use crate::db::{with_connection, Database};
use crate::error::AppError;
use crate::models::FocusSession;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

/// Source of the "work focus" override the classifier consults.
pub trait FocusSignal: Send + Sync {
    fn is_work_focus_active(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusState {
    pub active: bool,
    pub started_at: Option<i64>,
    pub session_duration_secs: Option<i64>,
    /// `None` for open-ended sessions.
    pub remaining_secs: Option<i64>,
}

impl FocusState {
    fn inactive() -> Self {
        Self {
            active: false,
            started_at: None,
            session_duration_secs: None,
            remaining_secs: None,
        }
    }
}

pub struct FocusManager {
    db: Arc<Mutex<Database>>,
    /// Last answer given through `FocusSignal`.
    last_known_active: AtomicBool,
}

impl FocusManager {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self {
            db,
            last_known_active: AtomicBool::new(false),
        }
    }

    /// Start a session, ending any one already running.
    pub fn start_session(&self, now: i64, planned_secs: Option<i64>) -> Result<FocusSession, AppError> {
        with_connection(&self.db, "start focus session", |conn| {
            if let Some(mut existing) = FocusSession::find_active(conn)? {
                existing.end(conn, now)?;
            }

            let mut session = FocusSession::new(now, planned_secs);
            session.save(conn)?;
            Ok(session)
        })
        .inspect(|session| match session.planned_secs {
            Some(planned) => info!("Focus session started for {planned}s"),
            None => info!("Focus session started"),
        })
    }

    pub fn end_session(&self, now: i64) -> Result<Option<FocusSession>, AppError> {
        with_connection(&self.db, "end focus session", |conn| {
            let Some(mut session) = active_session(conn, now)? else {
                return Ok(None);
            };
            session.end(conn, now)?;
            Ok(Some(session))
        })
        .inspect(|ended| {
            if let Some(session) = ended {
                info!("Focus session ended after {}s", session.elapsed_secs(now));
            }
        })
    }

    pub fn get_state(&self, now: i64) -> Result<FocusState, AppError> {
        let session = with_connection(&self.db, "read focus state", |conn| active_session(conn, now))?;

        Ok(session.map_or_else(FocusState::inactive, |s| FocusState {
            active: true,
            started_at: Some(s.started_at),
            session_duration_secs: Some(s.elapsed_secs(now)),
            remaining_secs: s.remaining_secs(now),
        }))
    }
}

/// The running session, closing it first if its planned length has passed.
fn active_session(conn: &Connection, now: i64) -> rusqlite::Result<Option<FocusSession>> {
    let Some(mut session) = FocusSession::find_active(conn)? else {
        return Ok(None);
    };

    if session.has_lapsed(now) {
        let planned_end = session.started_at + session.planned_secs.unwrap_or(0);
        session.end(conn, planned_end.min(now))?;
        info!("Focus session lapsed after its planned {}s", session.elapsed_secs(now));
        return Ok(None);
    }

    Ok(Some(session))
}

impl FocusSignal for FocusManager {
    /// Read-only and never waits for the database lock. While another thread
    /// holds it, the last known answer is returned. Lapsed sessions count as
    /// inactive here and are closed by the next `get_state`.
    fn is_work_focus_active(&self) -> bool {
        let db = match self.db.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("FocusManager: database mutex was poisoned, recovering");
                poisoned.into_inner()
            }
            Err(TryLockError::WouldBlock) => return self.last_known_active.load(Ordering::SeqCst),
        };

        let now = now_unix();
        match FocusSession::find_active(db.connection()) {
            Ok(session) => {
                let active = session.is_some_and(|s| !s.has_lapsed(now));
                self.last_known_active.store(active, Ordering::SeqCst);
                active
            }
            Err(e) => {
                warn!("Could not read focus state, keeping last value: {e}");
                self.last_known_active.load(Ordering::SeqCst)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    const NOW: i64 = 1_700_000_000;

    fn manager() -> (FocusManager, tempfile::TempDir) {
        let (db, dir) = setup_test_db();
        (FocusManager::new(Arc::new(Mutex::new(db))), dir)
    }

    #[test]
    fn test_no_session_is_inactive() {
        let (focus, _dir) = manager();
        let state = focus.get_state(NOW).unwrap();
        assert_eq!(state, FocusState::inactive());
    }

    #[test]
    fn test_start_session_reports_progress() {
        let (focus, _dir) = manager();
        focus.start_session(NOW, Some(1500)).unwrap();

        let state = focus.get_state(NOW + 100).unwrap();
        assert!(state.active);
        assert_eq!(state.started_at, Some(NOW));
        assert_eq!(state.session_duration_secs, Some(100));
        assert_eq!(state.remaining_secs, Some(1400));
    }

    #[test]
    fn test_starting_again_replaces_running_session() {
        let (focus, _dir) = manager();
        focus.start_session(NOW, None).unwrap();
        let second = focus.start_session(NOW + 50, Some(600)).unwrap();

        let state = focus.get_state(NOW + 60).unwrap();
        assert_eq!(state.started_at, Some(second.started_at));
        assert_eq!(state.remaining_secs, Some(590));
    }

    #[test]
    fn test_end_session() {
        let (focus, _dir) = manager();
        focus.start_session(NOW, None).unwrap();

        let ended = focus.end_session(NOW + 30).unwrap().unwrap();
        assert_eq!(ended.ended_at, Some(NOW + 30));
        assert!(!focus.get_state(NOW + 31).unwrap().active);
        assert!(focus.end_session(NOW + 40).unwrap().is_none());
    }

    #[test]
    fn test_session_lapses_after_planned_length() {
        let (focus, _dir) = manager();
        focus.start_session(NOW, Some(60)).unwrap();

        assert!(focus.get_state(NOW + 59).unwrap().active);
        assert!(!focus.get_state(NOW + 60).unwrap().active);

        let conn_check = with_connection(&focus.db, "check lapsed", |conn| {
            conn.query_row("SELECT ended_at FROM focus_sessions", [], |row| row.get::<_, Option<i64>>(0))
        })
        .unwrap();
        assert_eq!(conn_check, Some(NOW + 60));
    }

    #[test]
    fn test_open_ended_session_never_lapses() {
        let (focus, _dir) = manager();
        focus.start_session(NOW, None).unwrap();
        let state = focus.get_state(NOW + 10 * 86_400).unwrap();
        assert!(state.active);
        assert_eq!(state.remaining_secs, None);
    }

    #[test]
    fn test_focus_signal_follows_wall_clock() {
        let (focus, _dir) = manager();
        assert!(!focus.is_work_focus_active());

        focus.start_session(now_unix(), None).unwrap();
        assert!(focus.is_work_focus_active());
    }

    #[test]
    fn test_focus_signal_does_not_wait_for_a_busy_database() {
        let (focus, _dir) = manager();
        focus.start_session(now_unix(), None).unwrap();
        assert!(focus.is_work_focus_active());

        let db = Arc::clone(&focus.db);
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let _guard = db.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(1_000));
        });
        locked_rx.recv().unwrap();

        let started = std::time::Instant::now();
        assert!(focus.is_work_focus_active());
        assert!(started.elapsed() < std::time::Duration::from_millis(500));

        holder.join().unwrap();
    }

    #[test]
    fn test_focus_signal_treats_lapsed_session_as_inactive_without_writing() {
        let (focus, _dir) = manager();
        focus.start_session(now_unix() - 120, Some(60)).unwrap();

        assert!(!focus.is_work_focus_active());

        let ended_at = with_connection(&focus.db, "check open session", |conn| {
            conn.query_row("SELECT ended_at FROM focus_sessions", [], |row| row.get::<_, Option<i64>>(0))
        })
        .unwrap();
        assert_eq!(ended_at, None);
    }
}
