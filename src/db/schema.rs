//! Database schema and types

use crate::state_machine::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    topic TEXT NOT NULL,
    background TEXT NOT NULL,
    phase TEXT NOT NULL,
    state TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);

CREATE TABLE IF NOT EXISTS snapshots (
    session_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    phase TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (session_id, sequence_id),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);
";

/// Session record with its latest state
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub topic: String,
    pub background: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub snapshot_count: i64,
}

/// The state after one step, in the order steps ran
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session_id: String,
    pub sequence_id: i64,
    pub phase: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}
