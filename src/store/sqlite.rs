//! SQLite implementation of `RequestStore`.
//!
//! Persistent storage that survives service restarts. A `schema_version`
//! table tracks the schema; bump `CURRENT_SCHEMA_VERSION` and extend
//! `run_migrations()` when the schema changes. Synchronous rusqlite calls run
//! under `tokio::task::spawn_blocking` so they never block the async runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::{RequestStore, ReviewUpdate, StoreError};
use crate::request::{LeaveRequest, NoticeId, RequestId, RequestStatus, UserId};

/// Current schema version. Increment when making schema changes and add the
/// corresponding step to `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed request store.
///
/// Configured with `journal_mode = WAL`, `synchronous = FULL` and a 5s busy
/// timeout. WAL must actually take effect; some filesystems silently refuse
/// it, which would break the durability assumptions, so the pragma result is
/// checked.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and brings the schema up to
    /// date.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| StoreError::storage("open database", e.to_string()))?;

        // The database holds member leave data; keep it private to the
        // service user.
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!("Failed to set restrictive permissions on database file: {}", e);
            }
        }

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StoreError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            return Err(StoreError::storage(
                "configure journal_mode",
                format!(
                    "failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| StoreError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, for tests.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), StoreError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::storage(
                "schema version",
                format!(
                    "database schema version {} is newer than supported version {}",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }
        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS leave_requests (
                    id TEXT PRIMARY KEY,
                    requester_id TEXT NOT NULL,
                    requester_name TEXT NOT NULL,
                    requester_avatar TEXT NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    category TEXT NOT NULL,
                    notes TEXT NOT NULL,
                    status TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    processed_by TEXT,
                    processed_at TEXT
                );
                "#,
            )
            .map_err(|e| StoreError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| StoreError::storage("update schema version", e.to_string()))?;

        Ok(())
    }
}

/// Raw row as read from `leave_requests`, before decoding into domain types.
struct RequestRow {
    id: String,
    requester_id: String,
    requester_name: String,
    requester_avatar: String,
    start_date: String,
    end_date: String,
    category: String,
    notes: String,
    status: String,
    submitted_at: String,
    processed_by: Option<String>,
    processed_at: Option<String>,
}

fn decode_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::corruption(format!("{} '{}': {}", column, value, e)))
}

fn decode_row(row: RequestRow) -> Result<LeaveRequest, StoreError> {
    let status = RequestStatus::parse(&row.status)
        .ok_or_else(|| StoreError::corruption(format!("unknown status '{}'", row.status)))?;
    let submitted_at = decode_timestamp(&row.submitted_at, "submitted_at")?;
    let processed_at = row
        .processed_at
        .as_deref()
        .map(|value| decode_timestamp(value, "processed_at"))
        .transpose()?;

    Ok(LeaveRequest {
        id: RequestId::from(NoticeId(row.id)),
        requester_id: UserId(row.requester_id),
        requester_name: row.requester_name,
        requester_avatar: row.requester_avatar,
        start_date: row.start_date,
        end_date: row.end_date,
        category: row.category,
        notes: row.notes,
        status,
        submitted_at,
        processed_by: row.processed_by.map(UserId),
        processed_at,
    })
}

#[async_trait]
impl RequestStore for SqliteStore {
    async fn create(&self, request: &LeaveRequest) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO leave_requests
                     (id, requester_id, requester_name, requester_avatar,
                      start_date, end_date, category, notes,
                      status, submitted_at, processed_by, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    request.id.as_str(),
                    request.requester_id.0,
                    request.requester_name,
                    request.requester_avatar,
                    request.start_date,
                    request.end_date,
                    request.category,
                    request.notes,
                    request.status.as_str(),
                    request.submitted_at.to_rfc3339(),
                    request.processed_by.as_ref().map(|id| id.0.clone()),
                    request.processed_at.map(|at| at.to_rfc3339()),
                ],
            )
            .map_err(|e| StoreError::storage("create", e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::storage("create", e.to_string()))?
    }

    async fn get(&self, id: &RequestId) -> Result<Option<LeaveRequest>, StoreError> {
        let conn = self.conn.clone();
        let id = id.as_str().to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let row: Option<RequestRow> = conn
                .query_row(
                    "SELECT id, requester_id, requester_name, requester_avatar,
                            start_date, end_date, category, notes,
                            status, submitted_at, processed_by, processed_at
                     FROM leave_requests WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(RequestRow {
                            id: row.get(0)?,
                            requester_id: row.get(1)?,
                            requester_name: row.get(2)?,
                            requester_avatar: row.get(3)?,
                            start_date: row.get(4)?,
                            end_date: row.get(5)?,
                            category: row.get(6)?,
                            notes: row.get(7)?,
                            status: row.get(8)?,
                            submitted_at: row.get(9)?,
                            processed_by: row.get(10)?,
                            processed_at: row.get(11)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::storage("get", e.to_string()))?;

            row.map(decode_row).transpose()
        })
        .await
        .map_err(|e| StoreError::storage("get", e.to_string()))?
    }

    async fn update_review(&self, id: &RequestId, update: &ReviewUpdate) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let id = id.as_str().to_string();
        let status = update.status.as_str();
        let processed_by = update.processed_by.0.clone();
        let processed_at = update.processed_at.to_rfc3339();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE leave_requests
                     SET status = ?1, processed_by = ?2, processed_at = ?3
                     WHERE id = ?4",
                    params![status, processed_by, processed_at, id],
                )
                .map_err(|e| StoreError::storage("update review", e.to_string()))?;

            if changed == 0 {
                return Err(StoreError::storage(
                    "update review",
                    format!("no stored request with id {}", id),
                ));
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::storage("update review", e.to_string()))?
    }
}
