// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload validation — field-level checks mirroring the original rules:
// accepted extensions pdf/jpg/jpeg/png/doc/docx, 2 MiB size cap, and a
// non-empty declared type of at most 50 characters.

use veridoc_core::error::{Result, ValidationErrors, VeridocError};
use veridoc_core::types::DocumentCategory;

/// Maximum length of the declared `document_type` field.
const MAX_TYPE_LEN: usize = 50;

/// A validated upload, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Category inferred from the file extension.
    pub category: DocumentCategory,
    /// Slugged storage file name, e.g. `quarterly-report.pdf`.
    pub storage_name: String,
}

/// Validate an upload request.
///
/// All failing fields are reported together so the caller gets one 422
/// with the complete field→messages map rather than the first failure.
pub fn validate_upload(
    file_name: &str,
    document_type: &str,
    size: u64,
    max_size: u64,
) -> Result<ValidatedUpload> {
    let mut errors = ValidationErrors::new();

    let (stem, extension) = split_name(file_name);
    let category = match extension.and_then(DocumentCategory::from_extension) {
        Some(category) => Some(category),
        None => {
            errors.add(
                "document",
                "must be a file of type: pdf, jpg, jpeg, png, doc, docx",
            );
            None
        }
    };

    if size == 0 {
        errors.add("document", "file is empty");
    } else if size > max_size {
        errors.add(
            "document",
            format!("file may not be greater than {max_size} bytes"),
        );
    }

    if document_type.trim().is_empty() {
        errors.add("document_type", "field is required");
    } else if document_type.len() > MAX_TYPE_LEN {
        errors.add(
            "document_type",
            format!("may not be greater than {MAX_TYPE_LEN} characters"),
        );
    }

    if !errors.is_empty() {
        return Err(VeridocError::Validation(errors));
    }

    // Unwrap is safe: a missing category already produced an error above.
    let category = category.expect("category checked");
    let extension = extension.expect("extension checked");
    let storage_name = format!("{}.{}", slugify(stem), extension.to_ascii_lowercase());

    Ok(ValidatedUpload {
        category,
        storage_name,
    })
}

/// Split a display name into (stem, extension).
fn split_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    }
}

/// Reduce a file stem to a safe storage slug: lowercase ASCII
/// alphanumerics with single dashes between runs.
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    let mut last_dash = true;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("document");
    }
    slug
}
