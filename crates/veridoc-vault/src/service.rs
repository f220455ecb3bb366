// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document service — the integrity-gated document lifecycle.
//
//   upload:   validate → scan → store bytes → sign → insert record
//   download: owner-scoped lookup → verify signature → read bytes
//   delete:   owner-scoped lookup → verify signature → remove everything
//
// Every attempt, successful or not, appends exactly one audit record.
// Audit writes are a best-effort side channel: they never block or fail
// the primary operation. A failed upload leaves no document bytes, no
// `.sig`, and no record behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use veridoc_ca::CaClient;
use veridoc_core::config::{SigningStrategy, VeridocConfig};
use veridoc_core::error::{Result, VeridocError};
use veridoc_core::types::{
    AuditAction, AuditOutcome, DocumentId, DocumentRecord, IntegrityStatus, ScanVerdict, UserId,
};
use veridoc_integrity::audit::AuditLog;
use veridoc_integrity::hash::hash_bytes;
use veridoc_integrity::keys::ServerKeyMaterial;
use veridoc_integrity::scanner::MalwareScanner;
use veridoc_integrity::signer::{Signer, signature_path};
use veridoc_integrity::verifier::Verifier;

use crate::store::DocumentStore;
use crate::validate::validate_upload;

/// Owner-scoped document lifecycle with signing on upload and
/// verification gating on download and delete.
pub struct DocumentService {
    config: VeridocConfig,
    signer: Signer,
    verifier: Verifier,
    ca: CaClient,
    store: DocumentStore,
    audit: AuditLog,
    scanner: Option<Box<dyn MalwareScanner>>,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService").finish_non_exhaustive()
    }
}

impl DocumentService {
    /// Initialise the service from configuration.
    ///
    /// Loads the server key material (fatal if the private key is not
    /// provisioned), opens the SQLite stores, and builds the CA client.
    #[instrument(skip_all, fields(data_dir = %config.storage.data_dir.display()))]
    pub fn new(config: VeridocConfig, scanner: Option<Box<dyn MalwareScanner>>) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;

        let keys = Arc::new(ServerKeyMaterial::load(&config.storage)?);
        let verifier = Verifier::new(&keys);
        let signer = Signer::new(keys);
        let ca = CaClient::new(&config.ca, &config.storage)?;
        let store = DocumentStore::open(config.storage.documents_db_path())?;
        let audit = AuditLog::open(config.storage.audit_db_path())?;

        info!("document service initialised");
        Ok(Self {
            config,
            signer,
            verifier,
            ca,
            store,
            audit,
            scanner,
        })
    }

    /// Validate, scan, store, sign, and record a new document.
    ///
    /// Atomic from the caller's view: any failure after the bytes hit
    /// disk removes both the file and any `.sig` before returning.
    #[instrument(skip(self, data), fields(%user, file_name, data_len = data.len()))]
    pub fn upload(
        &self,
        user: UserId,
        file_name: &str,
        document_type: &str,
        data: &[u8],
    ) -> Result<DocumentRecord> {
        let validated = match validate_upload(
            file_name,
            document_type,
            data.len() as u64,
            self.config.max_upload_bytes,
        ) {
            Ok(v) => v,
            Err(e) => {
                self.audit_failure(user, AuditAction::Upload, file_name, &e);
                return Err(e);
            }
        };

        // run_scan audits its own failures before returning them.
        let scan_note = self.run_scan(user, file_name, data)?;

        let relative = format!("documents/{}", validated.storage_name);
        let absolute = self.config.storage.resolve(&relative);
        let stored = std::fs::create_dir_all(self.config.storage.documents_dir())
            .and_then(|()| std::fs::write(&absolute, data));
        if let Err(e) = stored {
            let e = VeridocError::from(e);
            self.audit_failure(user, AuditAction::Upload, file_name, &e);
            return Err(e);
        }

        let signed = match self.config.signing {
            SigningStrategy::Local => self.signer.sign_file(&absolute),
            SigningStrategy::Delegated => self.ca.sign_document(&absolute),
        };
        if let Err(e) = signed {
            remove_artifacts(&absolute);
            self.audit_failure(user, AuditAction::Upload, file_name, &e);
            return Err(e);
        }

        let record = DocumentRecord::new(
            user,
            file_name.to_owned(),
            relative,
            validated.category,
            document_type.to_owned(),
            hash_bytes(data),
        );
        if let Err(e) = self.store.insert(&record) {
            remove_artifacts(&absolute);
            self.audit_failure(user, AuditAction::Upload, file_name, &e);
            return Err(e);
        }

        let details = match scan_note {
            Some(note) => format!("Document uploaded successfully. {note}"),
            None => "Document uploaded successfully.".to_owned(),
        };
        self.audit.record_best_effort(
            user,
            AuditAction::Upload,
            file_name,
            AuditOutcome::Success,
            Some(&details),
        );

        info!(id = %record.id, "document uploaded");
        Ok(record)
    }

    /// Return a document's bytes after verifying its detached signature.
    #[instrument(skip(self), fields(%user, %id))]
    pub fn download(&self, user: UserId, id: DocumentId) -> Result<(DocumentRecord, Vec<u8>)> {
        let record = self.find_gated(user, id, AuditAction::Download)?;

        let absolute = self.config.storage.resolve(&record.path);
        self.verify_gated(user, AuditAction::Download, &record, &absolute)?;

        let data = match std::fs::read(&absolute) {
            Ok(data) => data,
            Err(e) => {
                let e = VeridocError::from(e);
                self.audit_failure(user, AuditAction::Download, &record.name, &e);
                return Err(e);
            }
        };
        self.audit.record_best_effort(
            user,
            AuditAction::Download,
            &record.name,
            AuditOutcome::Success,
            Some("Document downloaded successfully."),
        );
        Ok((record, data))
    }

    /// Remove a document, its signature, and its record — only if the
    /// signature still verifies.
    #[instrument(skip(self), fields(%user, %id))]
    pub fn delete(&self, user: UserId, id: DocumentId) -> Result<()> {
        let record = self.find_gated(user, id, AuditAction::Delete)?;

        let absolute = self.config.storage.resolve(&record.path);
        self.verify_gated(user, AuditAction::Delete, &record, &absolute)?;

        let removed = std::fs::remove_file(&absolute)
            .map_err(VeridocError::from)
            .and_then(|()| {
                let _ = std::fs::remove_file(signature_path(&absolute));
                self.store.delete(record.id, user).map(|_| ())
            });
        if let Err(e) = removed {
            self.audit_failure(user, AuditAction::Delete, &record.name, &e);
            return Err(e);
        }

        self.audit.record_best_effort(
            user,
            AuditAction::Delete,
            &record.name,
            AuditOutcome::Success,
            Some("Document deleted successfully."),
        );
        info!(id = %record.id, "document deleted");
        Ok(())
    }

    /// All documents owned by `user`.
    pub fn list(&self, user: UserId) -> Result<Vec<DocumentRecord>> {
        self.store.list_for_user(user)
    }

    /// Explicitly verify one document's integrity, recording the attempt.
    #[instrument(skip(self), fields(%user, %id))]
    pub fn verify(&self, user: UserId, id: DocumentId) -> Result<IntegrityStatus> {
        let record = self.find_gated(user, id, AuditAction::Verify)?;

        let absolute = self.config.storage.resolve(&record.path);
        let status = match self.verifier.verify_file(&absolute) {
            Ok(status) => status,
            Err(e) => {
                self.audit_failure(user, AuditAction::Verify, &record.name, &e);
                return Err(e);
            }
        };

        let (outcome, details) = match status {
            IntegrityStatus::Verified => (AuditOutcome::Success, "Signature verified."),
            _ => (AuditOutcome::Failure, "Signature verification failed."),
        };
        self.audit
            .record_best_effort(user, AuditAction::Verify, &record.name, outcome, Some(details));

        Ok(status)
    }

    /// The audit trail (read access for operators and tests).
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// The metadata store (read access for tests).
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Absolute path of a record's stored bytes.
    pub fn document_path(&self, record: &DocumentRecord) -> PathBuf {
        self.config.storage.resolve(&record.path)
    }

    /// Owner-scoped lookup; a miss audits with the name "Unknown" and
    /// maps to `NotFound` (indistinguishable from non-ownership).
    fn find_gated(
        &self,
        user: UserId,
        id: DocumentId,
        action: AuditAction,
    ) -> Result<DocumentRecord> {
        match self.store.find_for_user(id, user)? {
            Some(record) => Ok(record),
            None => {
                self.audit.record_best_effort(
                    user,
                    action,
                    "Unknown",
                    AuditOutcome::Failure,
                    Some("Document not found."),
                );
                Err(VeridocError::NotFound)
            }
        }
    }

    /// Deny the gated action unless the signature verifies, recording the
    /// denial.
    fn verify_gated(
        &self,
        user: UserId,
        action: AuditAction,
        record: &DocumentRecord,
        absolute: &Path,
    ) -> Result<()> {
        let status = match self.verifier.verify_file(absolute) {
            Ok(status) => status,
            Err(e) => {
                self.audit_failure(user, action, &record.name, &e);
                return Err(e);
            }
        };

        if !status.is_verified() {
            self.audit.record_best_effort(
                user,
                action,
                &record.name,
                AuditOutcome::Failure,
                Some("Signature verification failed."),
            );
            return Err(VeridocError::SignatureInvalid(
                "Signature verification failed.".to_owned(),
            ));
        }
        Ok(())
    }

    /// Run the configured scanner, if any. Returns an optional note for
    /// the success audit record (e.g. a skipped scan).
    fn run_scan(&self, user: UserId, file_name: &str, data: &[u8]) -> Result<Option<String>> {
        let Some(scanner) = &self.scanner else {
            return Ok(None);
        };

        let verdict = match scanner.scan(data) {
            Ok(verdict) => verdict,
            Err(e) => {
                self.audit_failure(user, AuditAction::Upload, file_name, &e);
                return Err(e);
            }
        };

        match verdict {
            ScanVerdict::Clean => Ok(None),
            ScanVerdict::Infected => {
                let e = VeridocError::Infected(file_name.to_owned());
                self.audit_failure(user, AuditAction::Upload, file_name, &e);
                Err(e)
            }
            ScanVerdict::Unavailable if self.config.scan.required => {
                let e = VeridocError::Scanner(
                    "malware scanner unavailable and scanning is required".to_owned(),
                );
                self.audit_failure(user, AuditAction::Upload, file_name, &e);
                Err(e)
            }
            ScanVerdict::Unavailable => {
                warn!("malware scanner unavailable; proceeding per policy");
                Ok(Some("Malware scan skipped: scanner unavailable.".to_owned()))
            }
        }
    }

    fn audit_failure(
        &self,
        user: UserId,
        action: AuditAction,
        document_name: &str,
        error: &VeridocError,
    ) {
        let details = match error {
            // Field errors are recorded as their JSON map, like the 422 body.
            VeridocError::Validation(errors) => {
                serde_json::to_string(errors).unwrap_or_else(|_| error.to_string())
            }
            other => other.to_string(),
        };
        self.audit.record_best_effort(
            user,
            action,
            document_name,
            AuditOutcome::Failure,
            Some(&details),
        );
    }
}

/// Remove a stored document and its signature after a failed upload.
fn remove_artifacts(absolute: &Path) {
    let _ = std::fs::remove_file(signature_path(absolute));
    let _ = std::fs::remove_file(absolute);
}

#[cfg(test)]
mod tests {
    use super::*;
    use veridoc_core::config::ScanConfig;

    const SERVER_KEY: &str =
        include_str!("../../veridoc-integrity/testdata/server_key_pkcs8.pem");

    struct FixedScanner(ScanVerdict);

    impl MalwareScanner for FixedScanner {
        fn scan(&self, _data: &[u8]) -> Result<ScanVerdict> {
            Ok(self.0)
        }
    }

    fn make_config(dir: &Path) -> VeridocConfig {
        let mut config = VeridocConfig::new(dir);
        // Unroutable CA — local signing never talks to it.
        config.ca.base_url = "http://127.0.0.1:1".to_owned();
        config.ca.timeout_secs = 1;

        let storage = &config.storage;
        std::fs::create_dir_all(storage.private_key_path().parent().unwrap()).unwrap();
        std::fs::write(storage.private_key_path(), SERVER_KEY).unwrap();
        config
    }

    fn make_service(dir: &Path) -> DocumentService {
        DocumentService::new(make_config(dir), None).expect("service init")
    }

    #[test]
    fn upload_creates_record_signature_and_audit_entry() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "Quarterly Report.pdf", "report", b"%PDF-1.4 body")
            .expect("upload");

        assert_eq!(record.path, "documents/quarterly-report.pdf");
        assert_eq!(record.fingerprint, hash_bytes(b"%PDF-1.4 body"));

        let doc_path = service.document_path(&record);
        assert!(doc_path.exists());
        assert!(signature_path(&doc_path).exists());

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "upload");
        assert_eq!(entries[0].status, "success");
        assert_eq!(entries[0].document_name, "Quarterly Report.pdf");
    }

    #[test]
    fn upload_validation_failure_audits_and_returns_422() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let err = service
            .upload(UserId(1), "malware.exe", "report", b"MZ")
            .unwrap_err();
        assert_eq!(err.http_status(), 422);

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "failed");
        assert!(entries[0].details.as_deref().unwrap().contains("document"));
    }

    #[test]
    fn download_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        let (found, data) = service.download(UserId(1), record.id).expect("download");

        assert_eq!(data, b"contents");
        assert_eq!(found.name, "report.pdf");

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, "download");
        assert_eq!(entries[1].status, "success");
    }

    #[test]
    fn download_with_deleted_signature_is_denied_and_audited() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        std::fs::remove_file(signature_path(&service.document_path(&record))).unwrap();

        let err = service.download(UserId(1), record.id).unwrap_err();
        assert_eq!(err.http_status(), 403);

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        let last = entries.last().unwrap();
        assert_eq!(last.action, "download");
        assert_eq!(last.status, "failed");
        assert_eq!(
            last.details.as_deref(),
            Some("Signature verification failed.")
        );
    }

    #[test]
    fn tampered_document_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"original")
            .unwrap();
        std::fs::write(service.document_path(&record), b"tampered").unwrap();

        let err = service.download(UserId(1), record.id).unwrap_err();
        assert!(matches!(err, VeridocError::SignatureInvalid(_)));
    }

    #[test]
    fn delete_removes_file_signature_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        let doc_path = service.document_path(&record);

        service.delete(UserId(1), record.id).expect("delete");

        assert!(!doc_path.exists());
        assert!(!signature_path(&doc_path).exists());
        assert!(service.store().find_for_user(record.id, UserId(1)).unwrap().is_none());

        // A second attempt is a 404, audited as such.
        let err = service.delete(UserId(1), record.id).unwrap_err();
        assert!(matches!(err, VeridocError::NotFound));
    }

    #[test]
    fn delete_is_integrity_gated() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        let doc_path = service.document_path(&record);
        std::fs::remove_file(signature_path(&doc_path)).unwrap();

        let err = service.delete(UserId(1), record.id).unwrap_err();
        assert_eq!(err.http_status(), 403);
        // Nothing was removed.
        assert!(doc_path.exists());
        assert!(service.store().find_for_user(record.id, UserId(1)).unwrap().is_some());
    }

    #[test]
    fn non_owner_cannot_see_or_touch_documents() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();

        let err = service.download(UserId(2), record.id).unwrap_err();
        assert!(matches!(err, VeridocError::NotFound));
        assert_eq!(err.http_status(), 404);

        let entries = service.audit().entries_for_user(UserId(2)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].document_name, "Unknown");
        assert_eq!(entries[0].details.as_deref(), Some("Document not found."));

        assert!(service.list(UserId(2)).unwrap().is_empty());
    }

    #[test]
    fn every_attempt_produces_exactly_one_audit_record() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        let _ = service.download(UserId(1), record.id).unwrap();
        let _ = service.upload(UserId(1), "bad.exe", "x", b"MZ").unwrap_err();
        service.delete(UserId(1), record.id).unwrap();

        assert_eq!(service.audit().count().unwrap(), 4);
    }

    #[test]
    fn verify_reports_and_audits_status() {
        let dir = tempfile::tempdir().unwrap();
        let service = make_service(dir.path());

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"contents")
            .unwrap();
        assert_eq!(
            service.verify(UserId(1), record.id).unwrap(),
            IntegrityStatus::Verified
        );

        std::fs::write(service.document_path(&record), b"tampered").unwrap();
        assert_eq!(
            service.verify(UserId(1), record.id).unwrap(),
            IntegrityStatus::Rejected
        );

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        let verifies: Vec<_> = entries.iter().filter(|e| e.action == "verify").collect();
        assert_eq!(verifies.len(), 2);
        assert_eq!(verifies[0].status, "success");
        assert_eq!(verifies[1].status, "failed");
    }

    #[test]
    fn infected_upload_is_rejected_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = DocumentService::new(
            make_config(dir.path()),
            Some(Box::new(FixedScanner(ScanVerdict::Infected))),
        )
        .unwrap();

        let err = service
            .upload(UserId(1), "report.pdf", "report", b"EICAR")
            .unwrap_err();
        assert!(matches!(err, VeridocError::Infected(_)));
        assert!(service.list(UserId(1)).unwrap().is_empty());

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "failed");
    }

    #[test]
    fn unavailable_scanner_denies_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = make_config(dir.path());
        config.scan = ScanConfig { required: true };
        let service = DocumentService::new(
            config,
            Some(Box::new(FixedScanner(ScanVerdict::Unavailable))),
        )
        .unwrap();

        let err = service
            .upload(UserId(1), "report.pdf", "report", b"data")
            .unwrap_err();
        assert!(matches!(err, VeridocError::Scanner(_)));
        assert!(service.list(UserId(1)).unwrap().is_empty());
    }

    #[test]
    fn unavailable_scanner_proceeds_with_note_when_optional() {
        let dir = tempfile::tempdir().unwrap();
        let service = DocumentService::new(
            make_config(dir.path()),
            Some(Box::new(FixedScanner(ScanVerdict::Unavailable))),
        )
        .unwrap();

        let record = service
            .upload(UserId(1), "report.pdf", "report", b"data")
            .expect("upload proceeds");
        assert!(service.document_path(&record).exists());

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert!(entries[0]
            .details
            .as_deref()
            .unwrap()
            .contains("scanner unavailable"));
    }

    #[test]
    fn delegated_signing_failure_rolls_back_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = make_config(dir.path());
        config.signing = SigningStrategy::Delegated;
        let service = DocumentService::new(config, None).unwrap();

        // CA is unroutable — delegation must fail and leave nothing.
        let err = service
            .upload(UserId(1), "report.pdf", "report", b"data")
            .unwrap_err();
        assert!(matches!(err, VeridocError::Ca { .. }));
        assert_eq!(err.http_status(), 500);

        assert!(service.list(UserId(1)).unwrap().is_empty());
        let doc = dir.path().join("documents/report.pdf");
        assert!(!doc.exists());
        assert!(!signature_path(&doc).exists());

        let entries = service.audit().entries_for_user(UserId(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "upload");
        assert_eq!(entries[0].status, "failed");
    }

    #[test]
    fn missing_private_key_fails_initialisation() {
        let dir = tempfile::tempdir().unwrap();
        let config = VeridocConfig::new(dir.path());

        let err = DocumentService::new(config, None).unwrap_err();
        assert!(matches!(err, VeridocError::MissingPrecondition(_)));
    }
}
