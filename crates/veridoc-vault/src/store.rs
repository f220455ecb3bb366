// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document metadata store backed by SQLite. Document bytes live on disk;
// this table holds identity, ownership, paths, and fingerprints.
//
// Every query is owner-scoped: a document that exists but belongs to
// another user is indistinguishable from one that does not exist.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use veridoc_core::error::{Result, VeridocError};
use veridoc_core::types::{DocumentCategory, DocumentId, DocumentRecord, UserId};

/// SQLite schema for the documents table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id            TEXT PRIMARY KEY,
        user_id       INTEGER NOT NULL,
        name          TEXT NOT NULL,
        path          TEXT NOT NULL,
        category      TEXT NOT NULL,
        document_type TEXT NOT NULL,
        fingerprint   TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
"#;

fn db_err(e: rusqlite::Error) -> VeridocError {
    VeridocError::Database(e.to_string())
}

/// Persistent document metadata store.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the document database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        info!("document store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory document store opened");
        Ok(Self { conn })
    }

    /// Insert a new document record.
    #[instrument(skip(self, record), fields(id = %record.id, owner = %record.owner))]
    pub fn insert(&self, record: &DocumentRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO documents
                 (id, user_id, name, path, category, document_type, fingerprint, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.owner.0,
                    record.name,
                    record.path,
                    record.category.as_str(),
                    record.document_type,
                    record.fingerprint,
                    record.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

        debug!("document record inserted");
        Ok(())
    }

    /// Look up one document, scoped to its owner. Returns `None` both for
    /// absent ids and for ids owned by someone else.
    pub fn find_for_user(&self, id: DocumentId, user: UserId) -> Result<Option<DocumentRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, name, path, category, document_type, fingerprint, created_at
                 FROM documents
                 WHERE id = ?1 AND user_id = ?2",
            )
            .map_err(db_err)?;

        let mut rows = stmt
            .query_map(params![id.to_string(), user.0], map_record_row)
            .map_err(db_err)?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    /// All documents owned by `user`, oldest-first.
    pub fn list_for_user(&self, user: UserId) -> Result<Vec<DocumentRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, name, path, category, document_type, fingerprint, created_at
                 FROM documents
                 WHERE user_id = ?1
                 ORDER BY created_at ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![user.0], map_record_row)
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_err)?);
        }
        Ok(records)
    }

    /// Delete a document record, scoped to its owner. Returns whether a
    /// row was actually removed.
    #[instrument(skip(self), fields(%id, %user))]
    pub fn delete(&self, id: DocumentId, user: UserId) -> Result<bool> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user.0],
            )
            .map_err(db_err)?;

        debug!(affected, "document record deleted");
        Ok(affected > 0)
    }
}

fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let id_text: String = row.get(0)?;
    let id = Uuid::parse_str(&id_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_text: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    let category_text: String = row.get(4)?;

    Ok(DocumentRecord {
        id: DocumentId(id),
        owner: UserId(row.get(1)?),
        name: row.get(2)?,
        path: row.get(3)?,
        category: DocumentCategory::from_str_lossy(&category_text),
        document_type: row.get(5)?,
        fingerprint: row.get(6)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> DocumentStore {
        DocumentStore::open_in_memory().expect("open in-memory store")
    }

    fn make_record(owner: UserId, name: &str) -> DocumentRecord {
        DocumentRecord::new(
            owner,
            name.to_owned(),
            format!("documents/{name}"),
            DocumentCategory::Pdf,
            "contract".to_owned(),
            "fingerprint".to_owned(),
        )
    }

    #[test]
    fn insert_and_find_round_trip() {
        let store = make_store();
        let record = make_record(UserId(1), "report.pdf");
        store.insert(&record).unwrap();

        let found = store
            .find_for_user(record.id, UserId(1))
            .unwrap()
            .expect("record present");
        assert_eq!(found.id, record.id);
        assert_eq!(found.name, "report.pdf");
        assert_eq!(found.category, DocumentCategory::Pdf);
        assert_eq!(found.created_at.timestamp(), record.created_at.timestamp());
    }

    #[test]
    fn other_owner_sees_nothing() {
        let store = make_store();
        let record = make_record(UserId(1), "report.pdf");
        store.insert(&record).unwrap();

        assert!(store.find_for_user(record.id, UserId(2)).unwrap().is_none());
        assert!(store.list_for_user(UserId(2)).unwrap().is_empty());
    }

    #[test]
    fn list_is_owner_scoped() {
        let store = make_store();
        store.insert(&make_record(UserId(1), "a.pdf")).unwrap();
        store.insert(&make_record(UserId(1), "b.pdf")).unwrap();
        store.insert(&make_record(UserId(2), "c.pdf")).unwrap();

        let records = store.list_for_user(UserId(1)).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn delete_is_owner_scoped() {
        let store = make_store();
        let record = make_record(UserId(1), "report.pdf");
        store.insert(&record).unwrap();

        assert!(!store.delete(record.id, UserId(2)).unwrap());
        assert!(store.find_for_user(record.id, UserId(1)).unwrap().is_some());

        assert!(store.delete(record.id, UserId(1)).unwrap());
        assert!(store.find_for_user(record.id, UserId(1)).unwrap().is_none());
    }
}
