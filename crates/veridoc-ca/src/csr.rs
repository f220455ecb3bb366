// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CSR generation — builds a certificate signing request from the
// server's existing RSA key pair. The private key itself is provisioned
// out-of-band; only the request is produced here.

use rcgen::{CertificateParams, DnType, KeyPair};
use tracing::{info, instrument};
use veridoc_core::config::{CsrSubject, StorageConfig};
use veridoc_core::error::{Result, VeridocError};

fn csr_err(e: rcgen::Error) -> VeridocError {
    VeridocError::KeyMaterial(format!("CSR generation failed: {e}"))
}

/// Generate a CSR from the private key at the well-known path and
/// persist it as `ca/server.csr` (PEM), returning the PEM text.
///
/// Overwrites any previous CSR: re-running after a subject change is the
/// intended way to refresh the request before the next `/sign` call.
#[instrument(skip_all, fields(csr = %storage.csr_path().display()))]
pub fn generate_csr(storage: &StorageConfig, subject: &CsrSubject) -> Result<String> {
    let key_path = storage.private_key_path();
    if !key_path.exists() {
        return Err(VeridocError::MissingPrecondition(format!(
            "private key not found at {}; generate it manually",
            key_path.display()
        )));
    }

    let key_pem = std::fs::read_to_string(&key_path)?;
    let key_pair = KeyPair::from_pem(&key_pem).map_err(csr_err)?;

    let mut params = CertificateParams::new(Vec::<String>::new()).map_err(csr_err)?;
    params
        .distinguished_name
        .push(DnType::CommonName, subject.common_name.clone());
    params
        .distinguished_name
        .push(DnType::OrganizationName, subject.organization.clone());
    params
        .distinguished_name
        .push(DnType::CountryName, subject.country.clone());

    let csr = params.serialize_request(&key_pair).map_err(csr_err)?;
    let pem = csr.pem().map_err(csr_err)?;

    let csr_path = storage.csr_path();
    if let Some(parent) = csr_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&csr_path, &pem)?;

    info!("CSR generated");
    Ok(pem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_KEY: &str =
        include_str!("../../veridoc-integrity/testdata/server_key_pkcs8.pem");

    #[test]
    fn generates_and_persists_pem_request() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::new(dir.path());
        std::fs::create_dir_all(storage.private_key_path().parent().unwrap()).unwrap();
        std::fs::write(storage.private_key_path(), SERVER_KEY).unwrap();

        let pem = generate_csr(&storage, &CsrSubject::default()).expect("generate");
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert_eq!(std::fs::read_to_string(storage.csr_path()).unwrap(), pem);
    }

    #[test]
    fn regeneration_overwrites_previous_request() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::new(dir.path());
        std::fs::create_dir_all(storage.private_key_path().parent().unwrap()).unwrap();
        std::fs::write(storage.private_key_path(), SERVER_KEY).unwrap();

        generate_csr(&storage, &CsrSubject::default()).unwrap();
        let subject = CsrSubject {
            common_name: "renamed.internal".to_owned(),
            ..CsrSubject::default()
        };
        let second = generate_csr(&storage, &subject).unwrap();
        assert_eq!(std::fs::read_to_string(storage.csr_path()).unwrap(), second);
    }

    #[test]
    fn missing_private_key_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::new(dir.path());

        let err = generate_csr(&storage, &CsrSubject::default()).unwrap_err();
        assert!(matches!(err, VeridocError::MissingPrecondition(_)));
        assert_eq!(err.http_status(), 400);
    }
}
