//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Reported focus sessions
//! - Session statistics (daily and all-time)
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::data_dir;
use crate::error::{DatabaseError, PersistenceError, Result};
use crate::session::{SessionReporter, SessionSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub session_id: String,
    pub planned_seconds: u64,
    pub elapsed_seconds: u64,
    pub task_title: Option<String>,
    pub completed: bool,
    pub sound: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub cancelled_sessions: u64,
    pub total_focus_min: u64,
    pub today_sessions: u64,
    pub today_focus_min: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/focusroom/focusroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusroom.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_results (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id      TEXT NOT NULL UNIQUE,
                planned_seconds INTEGER NOT NULL,
                elapsed_seconds INTEGER NOT NULL,
                task_title      TEXT,
                completed       INTEGER NOT NULL,
                sound           TEXT,
                started_at      TEXT NOT NULL,
                ended_at        TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_results_ended_at ON session_results(ended_at);",
        )?;
        Ok(())
    }

    /// Store a session summary. Reporting the same session twice keeps the
    /// latest summary.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_result(
        &self,
        summary: &SessionSummary,
    ) -> std::result::Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session_results
                (session_id, planned_seconds, elapsed_seconds, task_title, completed, sound, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                summary.session_id,
                summary.planned_seconds,
                summary.elapsed_seconds,
                summary.task_title,
                summary.completed,
                summary.sound.map(|c| c.display_name()),
                summary.started_at.to_rfc3339(),
                summary.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent results first.
    pub fn recent_results(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, planned_seconds, elapsed_seconds, task_title, completed, sound, started_at, ended_at
             FROM session_results
             ORDER BY ended_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                planned_seconds: row.get(2)?,
                elapsed_seconds: row.get(3)?,
                task_title: row.get(4)?,
                completed: row.get(5)?,
                sound: row.get(6)?,
                started_at: parse_ts(row.get::<_, String>(7)?, 7)?,
                ended_at: parse_ts(row.get::<_, String>(8)?, 8)?,
            })
        })?;
        rows.collect()
    }

    pub fn stats(&self) -> std::result::Result<Stats, rusqlite::Error> {
        self.stats_at(Utc::now())
    }

    /// Statistics with "today" taken as the UTC day of `now`.
    pub fn stats_at(&self, now: DateTime<Utc>) -> std::result::Result<Stats, rusqlite::Error> {
        let mut stats = Stats::default();
        let (total, completed, focus_secs): (u64, u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0), COALESCE(SUM(elapsed_seconds), 0)
             FROM session_results",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        stats.total_sessions = total;
        stats.completed_sessions = completed;
        stats.cancelled_sessions = total - completed;
        stats.total_focus_min = focus_secs / 60;

        let today = now.format("%Y-%m-%d").to_string();
        let (today_count, today_secs): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(elapsed_seconds), 0)
             FROM session_results
             WHERE ended_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.today_sessions = today_count;
        stats.today_focus_min = today_secs / 60;
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> std::result::Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> std::result::Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn parse_ts(raw: String, column: usize) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Reporter that stores results in the local database, skipping sessions
/// shorter than `min_recorded_minutes`.
pub struct SessionLog<'a> {
    db: &'a Database,
    min_recorded_minutes: u32,
}

impl<'a> SessionLog<'a> {
    pub fn new(db: &'a Database, min_recorded_minutes: u32) -> Self {
        Self {
            db,
            min_recorded_minutes,
        }
    }
}

impl SessionReporter for SessionLog<'_> {
    fn submit_session_result(
        &self,
        summary: &SessionSummary,
    ) -> std::result::Result<(), PersistenceError> {
        if summary.elapsed_minutes() < u64::from(self.min_recorded_minutes) {
            debug!(
                session = %summary.session_id,
                elapsed_seconds = summary.elapsed_seconds,
                "session too short to record"
            );
            return Ok(());
        }
        self.db.record_result(summary)?;
        debug!(session = %summary.session_id, "session recorded");
        Ok(())
    }
}
