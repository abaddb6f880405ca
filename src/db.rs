//! Database module for the professor
//!
//! Persists sessions and the snapshot trail each one leaves behind.

mod schema;

pub use schema::*;

use crate::state_machine::SessionState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("State encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session already exists: {0}")]
    SessionExists(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

const SESSION_COLUMNS: &str = "s.id, s.topic, s.background, s.state, s.created_at, s.updated_at,
    (SELECT COUNT(*) FROM snapshots n WHERE n.session_id = s.id) AS snapshot_count";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Session Operations ====================

    /// Create a session from its initial state
    pub fn create_session(&self, id: &str, state: &SessionState) -> DbResult<Session> {
        let conn = self.conn()?;
        let now = Utc::now();
        let state_json = serde_json::to_string(state)?;

        conn.execute(
            "INSERT INTO sessions (id, topic, background, phase, state, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                state.topic,
                state.background,
                state.phase.name(),
                state_json,
                state.completed,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                DbError::SessionExists(id.to_string())
            }
            other => DbError::Sqlite(other),
        })?;

        Ok(Session {
            id: id.to_string(),
            topic: state.topic.clone(),
            background: state.background.clone(),
            state: state.clone(),
            created_at: now,
            updated_at: now,
            snapshot_count: 0,
        })
    }

    /// Get session by ID
    pub fn get_session(&self, id: &str) -> DbResult<Session> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.id = ?1"
        ))?;

        stmt.query_row(params![id], parse_session_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::SessionNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// List sessions, most recently updated first
    pub fn list_sessions(&self) -> DbResult<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions s ORDER BY s.updated_at DESC"
        ))?;

        let rows = stmt.query_map([], parse_session_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Record a snapshot and make it the session's current state.
    ///
    /// Returns the snapshot's sequence number, starting at 1.
    pub fn save_snapshot(&self, id: &str, state: &SessionState) -> DbResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let state_json = serde_json::to_string(state)?;

        let updated = tx.execute(
            "UPDATE sessions SET phase = ?2, state = ?3, completed = ?4, updated_at = ?5 WHERE id = ?1",
            params![id, state.phase.name(), state_json, state.completed, now],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }

        let sequence_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM snapshots WHERE session_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO snapshots (session_id, sequence_id, phase, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, sequence_id, state.phase.name(), state_json, now],
        )?;
        tx.commit()?;

        Ok(sequence_id)
    }

    /// Replace the session's current state without recording a snapshot
    pub fn update_state(&self, id: &str, state: &SessionState) -> DbResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sessions SET phase = ?2, state = ?3, completed = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                id,
                state.phase.name(),
                serde_json::to_string(state)?,
                state.completed,
                Utc::now().to_rfc3339()
            ],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// All snapshots of a session in sequence order
    pub fn get_snapshots(&self, id: &str) -> DbResult<Vec<Snapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, sequence_id, phase, state, created_at
             FROM snapshots WHERE session_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![id], |row| {
            Ok(Snapshot {
                session_id: row.get(0)?,
                sequence_id: row.get(1)?,
                phase: row.get(2)?,
                state: parse_state(&row.get::<_, String>(3)?, 3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a session and its snapshots
    pub fn delete_session(&self, id: &str) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM snapshots WHERE session_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        topic: row.get(1)?,
        background: row.get(2)?,
        state: parse_state(&row.get::<_, String>(3)?, 3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
        snapshot_count: row.get(6)?,
    })
}

fn parse_state(json: &str, column: usize) -> rusqlite::Result<SessionState> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
