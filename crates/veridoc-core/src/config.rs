// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Veridoc configuration.
//
// All paths and the CA endpoint are injected here rather than read from
// the process environment inside the library. Key material lives under a
// fixed `ca/` layout in the data directory; uploaded documents under
// `documents/`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How uploaded documents obtain their detached signature.
///
/// The two trust models are alternatives, selected explicitly — a service
/// instance never mixes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningStrategy {
    /// Sign locally with the server-held private key.
    Local,
    /// Send the raw document to the CA and store the signature it returns.
    Delegated,
}

/// Subject fields for the certificate signing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrSubject {
    pub common_name: String,
    pub organization: String,
    pub country: String,
}

impl Default for CsrSubject {
    fn default() -> Self {
        Self {
            common_name: "veridoc-server.internal".to_owned(),
            organization: "Veridoc".to_owned(),
            country: "GB".to_owned(),
        }
    }
}

/// Certificate authority endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaConfig {
    /// Base URL of the CA service, e.g. `https://ca.internal:5000`.
    pub base_url: String,
    /// Name under which the server's certificate is published by the CA.
    pub server_name: String,
    /// Request timeout in seconds for each single-shot CA call.
    pub timeout_secs: u64,
    /// Subject of CSRs generated from the server key pair.
    pub csr_subject: CsrSubject,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_owned(),
            server_name: "veridoc_server".to_owned(),
            timeout_secs: 30,
            csr_subject: CsrSubject::default(),
        }
    }
}

/// On-disk layout rooted at `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding uploaded documents and their `.sig` siblings.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    /// RSA private signing key (PEM). Provisioned out-of-band; never
    /// generated implicitly.
    pub fn private_key_path(&self) -> PathBuf {
        self.data_dir.join("ca").join("server.key")
    }

    /// Certificate signing request (PEM).
    pub fn csr_path(&self) -> PathBuf {
        self.data_dir.join("ca").join("server.csr")
    }

    /// Public certificate used to verify document signatures (PEM).
    pub fn certificate_path(&self) -> PathBuf {
        self.data_dir.join("ca").join("server.crt")
    }

    /// SQLite database for the append-only audit trail.
    pub fn audit_db_path(&self) -> PathBuf {
        self.data_dir.join("audit.db")
    }

    /// SQLite database for document metadata.
    pub fn documents_db_path(&self) -> PathBuf {
        self.data_dir.join("documents.db")
    }

    /// Resolve a storage-relative path (e.g. `documents/report.pdf`).
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(relative)
    }
}

/// Malware scanning policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanConfig {
    /// When true, a scanner reporting `Unavailable` denies the upload;
    /// when false the upload proceeds and the audit record notes the
    /// skipped scan.
    pub required: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { required: false }
    }
}

/// Top-level settings injected into the Veridoc services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeridocConfig {
    pub ca: CaConfig,
    pub storage: StorageConfig,
    pub scan: ScanConfig,
    pub signing: SigningStrategy,
    /// Maximum accepted upload size in bytes (the original capped at 2 MiB).
    pub max_upload_bytes: u64,
}

impl VeridocConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            ca: CaConfig::default(),
            storage: StorageConfig::new(data_dir),
            scan: ScanConfig::default(),
            signing: SigningStrategy::Local,
            max_upload_bytes: 2 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_layout_is_fixed() {
        let storage = StorageConfig::new("/var/lib/veridoc");
        assert_eq!(
            storage.private_key_path(),
            PathBuf::from("/var/lib/veridoc/ca/server.key")
        );
        assert_eq!(
            storage.csr_path(),
            PathBuf::from("/var/lib/veridoc/ca/server.csr")
        );
        assert_eq!(
            storage.certificate_path(),
            PathBuf::from("/var/lib/veridoc/ca/server.crt")
        );
        assert_eq!(
            storage.documents_dir(),
            PathBuf::from("/var/lib/veridoc/documents")
        );
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let storage = StorageConfig::new("/data");
        assert_eq!(
            storage.resolve("documents/report.pdf"),
            PathBuf::from("/data/documents/report.pdf")
        );
    }

    #[test]
    fn defaults_pick_local_signing() {
        let config = VeridocConfig::new("/tmp/veridoc");
        assert_eq!(config.signing, SigningStrategy::Local);
        assert!(!config.scan.required);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }
}
