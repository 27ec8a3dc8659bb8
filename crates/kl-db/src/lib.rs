//! Storage layer for Keyllama.
//!
//! Persists finished session reports and per-class system prompts using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Wrap it in a `Mutex` or open one instance per thread when sharing.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 with millisecond precision
//! (e.g. `2025-03-10T14:00:00.000Z`), so lexicographic order is chronological.
//! The `stats` column holds the full session snapshot as JSON; the counter
//! columns duplicate a few of its fields for querying.

use std::path::Path;

use chrono::SecondsFormat;
use kl_core::{HumanLikelihoodAnalysis, SessionStats};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to encode a session snapshot.
    #[error("failed to encode session {session_id}: {source}")]
    Encode {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored session could not be decoded.
    #[error("invalid session data for {session_id}: {message}")]
    InvalidSessionData { session_id: String, message: String },
    /// Class names must contain something other than whitespace.
    #[error("class name cannot be empty")]
    EmptyClassName,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A finished session together with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub student_name: Option<String>,
    pub class_name: Option<String>,
    pub stats: SessionStats,
    pub analysis: HumanLikelihoodAnalysis,
}

impl SessionRecord {
    /// Creates a record with a fresh ID.
    pub fn new(stats: SessionStats, analysis: HumanLikelihoodAnalysis) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_name: None,
            class_name: None,
            stats,
            analysis,
        }
    }
}

/// Lower-cases and trims a class name for storage and lookup.
pub fn normalize_class_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                student_name TEXT,
                class_name TEXT,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                total_edits INTEGER NOT NULL,
                chars_inserted INTEGER NOT NULL,
                chars_deleted INTEGER NOT NULL,
                paste_events INTEGER NOT NULL,
                score INTEGER NOT NULL,
                reasons TEXT NOT NULL,
                stats TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_class ON sessions(class_name);

            -- System prompts prepended to chat requests for a class
            CREATE TABLE IF NOT EXISTS classes (
                name TEXT PRIMARY KEY,
                system_prompt TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Stores a finished session, replacing any record with the same ID.
    pub fn insert_session(&self, record: &SessionRecord) -> Result<(), DbError> {
        let stats = serde_json::to_string(&record.stats).map_err(|source| DbError::Encode {
            session_id: record.id.clone(),
            source,
        })?;
        let reasons =
            serde_json::to_string(&record.analysis.reasons).map_err(|source| DbError::Encode {
                session_id: record.id.clone(),
                source,
            })?;
        let class_name = record.class_name.as_deref().map(normalize_class_name);

        self.conn.execute(
            "
            INSERT OR REPLACE INTO sessions
            (id, student_name, class_name, started_at, ended_at, total_edits, chars_inserted,
             chars_deleted, paste_events, score, reasons, stats)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                record.student_name,
                class_name,
                record
                    .stats
                    .start_time
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                record
                    .stats
                    .last_event_time
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                record.stats.total_edit_events,
                record.stats.chars_inserted,
                record.stats.chars_deleted,
                record.stats.paste_events.len(),
                record.analysis.score,
                reasons,
                stats,
            ],
        )?;
        tracing::debug!(session_id = %record.id, score = record.analysis.score, "session stored");
        Ok(())
    }

    /// Lists stored sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, student_name, class_name, score, reasons, stats
            FROM sessions
            ORDER BY started_at DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, student_name, class_name, score, reasons, stats) = row?;
            let reasons: Vec<String> = serde_json::from_str(&reasons).map_err(|err| {
                DbError::InvalidSessionData {
                    session_id: id.clone(),
                    message: format!("reasons: {err}"),
                }
            })?;
            let stats: SessionStats =
                serde_json::from_str(&stats).map_err(|err| DbError::InvalidSessionData {
                    session_id: id.clone(),
                    message: format!("stats: {err}"),
                })?;
            sessions.push(SessionRecord {
                id,
                student_name,
                class_name,
                stats,
                analysis: HumanLikelihoodAnalysis::new(score, reasons),
            });
        }
        Ok(sessions)
    }

    /// Sets the system prompt for a class.
    pub fn set_class_prompt(&self, class_name: &str, system_prompt: &str) -> Result<(), DbError> {
        let name = normalize_class_name(class_name);
        if name.is_empty() {
            return Err(DbError::EmptyClassName);
        }
        self.conn.execute(
            "
            INSERT INTO classes (name, system_prompt) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET system_prompt = excluded.system_prompt
            ",
            params![name, system_prompt],
        )?;
        Ok(())
    }

    /// Looks up the system prompt for a class.
    pub fn class_system_prompt(&self, class_name: &str) -> Result<Option<String>, DbError> {
        let prompt = self
            .conn
            .query_row(
                "SELECT system_prompt FROM classes WHERE name = ?",
                params![normalize_class_name(class_name)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use kl_core::PasteEvent;

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::minutes(minutes)
    }

    fn record(id: &str, start: DateTime<Utc>, score: i64) -> SessionRecord {
        let mut stats = SessionStats::new(start, true);
        stats.last_event_time = start + Duration::minutes(20);
        stats.total_edit_events = 40;
        stats.chars_inserted = 900;
        stats.chars_deleted = 60;
        stats.active_time_ms = 900_000;
        stats.inactive_time_ms = 300_000;
        stats.paste_events.push(PasteEvent {
            timestamp: start + Duration::minutes(5),
            length: 200,
            external: true,
            after_focus_loss: true,
        });
        SessionRecord {
            id: id.to_string(),
            student_name: Some("ada lovelace".to_string()),
            class_name: Some("CS24".to_string()),
            stats,
            analysis: HumanLikelihoodAnalysis::new(score, vec!["Large paste".to_string()]),
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        assert!(Database::open_in_memory().is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "sessions"),
            vec![
                "id",
                "student_name",
                "class_name",
                "started_at",
                "ended_at",
                "total_edits",
                "chars_inserted",
                "chars_deleted",
                "paste_events",
                "score",
                "reasons",
                "stats",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "classes"),
            vec!["name", "system_prompt"]
        );
    }

    #[test]
    fn sessions_round_trip_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&record("older", ts(0), 90)).unwrap();
        db.insert_session(&record("newer", ts(60), 35)).unwrap();

        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "newer");
        assert_eq!(sessions[0].analysis.score, 35);
        assert_eq!(sessions[0].class_name.as_deref(), Some("cs24"));
        assert_eq!(sessions[1].stats, record("older", ts(0), 90).stats);
    }

    #[test]
    fn insert_session_replaces_same_id() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&record("s1", ts(0), 90)).unwrap();
        db.insert_session(&record("s1", ts(0), 20)).unwrap();

        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].analysis.score, 20);
    }

    #[test]
    fn new_records_get_unique_ids() {
        let stats = SessionStats::new(ts(0), true);
        let a = SessionRecord::new(stats.clone(), HumanLikelihoodAnalysis::failed());
        let b = SessionRecord::new(stats, HumanLikelihoodAnalysis::failed());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn class_prompts_are_case_insensitive_and_updatable() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.class_system_prompt("cs24").unwrap(), None);

        db.set_class_prompt(" CS24 ", "Give hints, not answers.")
            .unwrap();
        assert_eq!(
            db.class_system_prompt("cs24").unwrap().as_deref(),
            Some("Give hints, not answers.")
        );

        db.set_class_prompt("cs24", "Explain concepts only.").unwrap();
        assert_eq!(
            db.class_system_prompt("Cs24").unwrap().as_deref(),
            Some("Explain concepts only.")
        );
    }

    #[test]
    fn empty_class_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.set_class_prompt("   ", "x"),
            Err(DbError::EmptyClassName)
        ));
    }

    #[test]
    fn database_persists_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("keyllama.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_session(&record("kept", ts(0), 77)).unwrap();
            db.set_class_prompt("cs24", "Be brief.").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_sessions().unwrap()[0].id, "kept");
        assert_eq!(
            db.class_system_prompt("cs24").unwrap().as_deref(),
            Some("Be brief.")
        );
    }
}
