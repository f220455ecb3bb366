// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Veridoc.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured field-level validation errors.
///
/// Keyed by field name, each with one or more human-readable messages.
/// Serializes to the `{"field": ["message", ...]}` shape callers embed in
/// a 422 response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for msg in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {msg}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Top-level error type for all Veridoc operations.
#[derive(Debug, Error)]
pub enum VeridocError {
    // -- Client input --
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Document absent *or* owned by someone else — the two cases are
    /// deliberately indistinguishable so existence never leaks to
    /// non-owners.
    #[error("document not found")]
    NotFound,

    // -- Integrity --
    /// Signature missing or invalid — one class: absence of a `.sig`
    /// artifact is a verification failure, not "unsigned, allow".
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    // -- Key material / preconditions --
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// An on-disk precondition (private key, CSR) the operator must
    /// provision out-of-band is absent.
    #[error("missing precondition: {0}")]
    MissingPrecondition(String),

    // -- External services --
    #[error("certificate authority error ({status:?}): {body}")]
    Ca { status: Option<u16>, body: String },

    #[error("malware scanner error: {0}")]
    Scanner(String),

    #[error("malware detected: {0}")]
    Infected(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VeridocError {
    /// HTTP status an outward-facing handler should map this error to.
    ///
    /// Mirrors the original surface: 422 for malformed input, 404 for
    /// not-found-or-not-yours, 403 for integrity failures, 400 for absent
    /// operator-provisioned preconditions, 500 for everything
    /// infrastructural.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Infected(_) => 422,
            Self::NotFound => 404,
            Self::SignatureInvalid(_) => 403,
            Self::MissingPrecondition(_) => 400,
            Self::KeyMaterial(_)
            | Self::Ca { .. }
            | Self::Scanner(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_) => 500,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VeridocError>;
