// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Veridoc document integrity toolkit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner reference for documents and audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared category of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCategory {
    Pdf,
    Image,
    Word,
    Other(String),
}

impl DocumentCategory {
    /// Infer the category from a file extension.
    ///
    /// Only the accepted upload extensions map to a category; anything
    /// else is rejected at validation time.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            "doc" | "docx" => Some(Self::Word),
            _ => None,
        }
    }

    /// MIME type string for download Content-Type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Image => "image/*",
            Self::Word => "application/msword",
            Self::Other(_) => "application/octet-stream",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Word => "word",
            Self::Other(s) => s,
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "pdf" => Self::Pdf,
            "image" => Self::Image,
            "word" => Self::Word,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Metadata record for one stored document.
///
/// The document bytes live on disk at `path` (relative to the data
/// directory); its detached signature, when present, is the sibling file
/// `<path>.sig`. A record whose signature artifact is missing is
/// tamper-suspect and fails verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub owner: UserId,
    /// Original display name as uploaded (e.g. `report.pdf`).
    pub name: String,
    /// Storage path relative to the data directory, e.g.
    /// `documents/report.pdf`.
    pub path: String,
    pub category: DocumentCategory,
    /// Free-form declared type supplied by the uploader.
    pub document_type: String,
    /// SHA-256 hex digest of the bytes at upload time.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(
        owner: UserId,
        name: String,
        path: String,
        category: DocumentCategory,
        document_type: String,
        fingerprint: String,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            owner,
            name,
            path,
            category,
            document_type,
            fingerprint,
            created_at: Utc::now(),
        }
    }

    /// Path of the detached signature artifact.
    pub fn signature_path(&self) -> String {
        format!("{}.sig", self.path)
    }
}

/// Integrity state of a document as observed by one access attempt.
///
/// `Rejected` is terminal for that access only — it is never persisted on
/// the record; the caller must re-attempt the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityStatus {
    /// No signature has been produced yet.
    Unsigned,
    /// A detached signature exists but has not been checked this access.
    Signed,
    /// Signature recomputed and valid for the current bytes.
    Verified,
    /// Signature missing or invalid for the current bytes.
    Rejected,
}

impl IntegrityStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Document-lifecycle actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Upload,
    Download,
    Delete,
    Verify,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Verify => "verify",
        }
    }
}

/// Outcome of an audited action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failed",
        }
    }
}

/// Verdict from a malware scan.
///
/// `Unavailable` is a distinct, explicitly handled outcome — never a
/// silent pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanVerdict {
    Clean,
    Infected,
    Unavailable,
}
