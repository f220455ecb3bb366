// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every document-lifecycle
// attempt, success or failure. Entries are never updated or deleted.
//
// Schema:
//   audit_log(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     user_id       INTEGER NOT NULL,
//     action        TEXT    NOT NULL,   -- upload | download | delete | verify
//     document_name TEXT    NOT NULL,
//     status        TEXT    NOT NULL,   -- success | failed
//     details       TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use veridoc_core::error::{Result, VeridocError};
use veridoc_core::types::{AuditAction, AuditOutcome, UserId};

/// Convert a `rusqlite::Error` into a `VeridocError::Database`.
fn db_err(e: rusqlite::Error) -> VeridocError {
    VeridocError::Database(e.to_string())
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_id: i64,
    pub action: String,
    pub document_name: String,
    pub status: String,
    pub details: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
///
/// One record per upload/download/delete/verify attempt, written whether
/// the attempt succeeded or not. The log is a side channel: callers that
/// must not fail on audit problems use [`AuditLog::record_best_effort`].
pub struct AuditLog {
    conn: Connection,
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp     TEXT    NOT NULL,
        user_id       INTEGER NOT NULL,
        action        TEXT    NOT NULL,
        document_name TEXT    NOT NULL,
        status        TEXT    NOT NULL,
        details       TEXT
    );";

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// WAL mode is enabled for better concurrent-read performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Append a new audit entry.
    #[instrument(skip(self, details), fields(%user, action = action.as_str(), %document_name, status = outcome.as_str()))]
    pub fn record(
        &self,
        user: UserId,
        action: AuditAction,
        document_name: &str,
        outcome: AuditOutcome,
        details: Option<&str>,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, user_id, action, document_name, status, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    timestamp,
                    user.0,
                    action.as_str(),
                    document_name,
                    outcome.as_str(),
                    details
                ],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Append an entry, surfacing any write failure to operational
    /// logging only. The primary operation must never block or fail on
    /// the audit side channel.
    pub fn record_best_effort(
        &self,
        user: UserId,
        action: AuditAction,
        document_name: &str,
        outcome: AuditOutcome,
        details: Option<&str>,
    ) {
        if let Err(e) = self.record(user, action, document_name, outcome, details) {
            error!(
                action = action.as_str(),
                document_name, "audit record write failed: {e}"
            );
        }
    }

    /// All entries for one user, ordered oldest-first.
    pub fn entries_for_user(&self, user: UserId) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, user_id, action, document_name, status, details
                 FROM audit_log
                 WHERE user_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![user.0], map_entry_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// The most recent `limit` entries, newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, user_id, action, document_name, status, details
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt.query_map(params![limit], map_entry_row).map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Total number of entries in the audit log.
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        user_id: row.get(2)?,
        action: row.get(3)?,
        document_name: row.get(4)?,
        status: row.get(5)?,
        details: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);

        log.record(
            UserId(1),
            AuditAction::Upload,
            "report.pdf",
            AuditOutcome::Success,
            Some("Document uploaded successfully."),
        )
        .unwrap();
        log.record(
            UserId(1),
            AuditAction::Download,
            "report.pdf",
            AuditOutcome::Success,
            None,
        )
        .unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_are_user_scoped() {
        let log = make_log();
        log.record(UserId(1), AuditAction::Upload, "a.pdf", AuditOutcome::Success, None)
            .unwrap();
        log.record(UserId(2), AuditAction::Upload, "b.pdf", AuditOutcome::Success, None)
            .unwrap();
        log.record(
            UserId(1),
            AuditAction::Delete,
            "a.pdf",
            AuditOutcome::Failure,
            Some("Signature verification failed."),
        )
        .unwrap();

        let entries = log.entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "upload");
        assert_eq!(entries[1].action, "delete");
        assert_eq!(entries[1].status, "failed");
        assert_eq!(
            entries[1].details.as_deref(),
            Some("Signature verification failed.")
        );
    }

    #[test]
    fn recent_entries_ordering() {
        let log = make_log();
        for i in 0..5 {
            log.record(
                UserId(1),
                AuditAction::Verify,
                &format!("doc_{i}.pdf"),
                AuditOutcome::Success,
                None,
            )
            .unwrap();
        }

        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first — IDs should be descending.
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
    }

    #[test]
    fn failure_entries_are_recorded_too() {
        let log = make_log();
        log.record(
            UserId(7),
            AuditAction::Download,
            "secret.docx",
            AuditOutcome::Failure,
            Some("Document not found."),
        )
        .unwrap();

        let entries = log.entries_for_user(UserId(7)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "failed");
    }

    #[test]
    fn best_effort_record_does_not_panic() {
        let log = make_log();
        log.record_best_effort(
            UserId(1),
            AuditAction::Upload,
            "a.pdf",
            AuditOutcome::Success,
            None,
        );
        assert_eq!(log.count().unwrap(), 1);
    }
}
