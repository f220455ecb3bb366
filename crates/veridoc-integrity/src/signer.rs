// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signer — detached RSA PKCS#1 v1.5 / SHA-256 signatures over document
// bytes, persisted as `<path>.sig` siblings.

use std::path::Path;
use std::sync::Arc;

use ring::rand::SystemRandom;
use ring::signature::RSA_PKCS1_SHA256;
use tracing::{debug, instrument};
use veridoc_core::error::{Result, VeridocError};

use crate::keys::ServerKeyMaterial;

/// Produces detached signatures with the server-held private key.
pub struct Signer {
    keys: Arc<ServerKeyMaterial>,
    rng: SystemRandom,
}

impl Signer {
    pub fn new(keys: Arc<ServerKeyMaterial>) -> Self {
        Self {
            keys,
            rng: SystemRandom::new(),
        }
    }

    /// Sign `data`, returning the raw signature bytes.
    #[instrument(skip_all, fields(data_len = data.len()))]
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key_pair = self.keys.key_pair();
        let mut signature = vec![0u8; key_pair.public().modulus_len()];

        key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, data, &mut signature)
            .map_err(|e| VeridocError::KeyMaterial(format!("signing failed: {e}")))?;

        debug!(signature_len = signature.len(), "document signed");
        Ok(signature)
    }

    /// Sign the file at `path` and persist the signature to `<path>.sig`.
    ///
    /// The signature is written to a temporary file in the same directory
    /// and renamed into place, so a crash or signing failure never leaves
    /// a partial `.sig` behind.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn sign_file(&self, path: &Path) -> Result<Vec<u8>> {
        let data = std::fs::read(path)?;
        let signature = self.sign(&data)?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let sig_path = signature_path(path);

        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        std::fs::write(tmp.path(), &signature)?;
        tmp.persist(&sig_path)
            .map_err(|e| VeridocError::Io(e.error))?;

        debug!(sig_path = %sig_path.display(), "signature persisted");
        Ok(signature)
    }
}

/// `<path>.sig` for a document path.
pub fn signature_path(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".sig");
    std::path::PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_KEY: &str = include_str!("../testdata/server_key_pkcs8.pem");

    fn make_signer() -> Signer {
        let keys = ServerKeyMaterial::from_pem(SERVER_KEY, None).expect("load key");
        Signer::new(Arc::new(keys))
    }

    #[test]
    fn signature_has_modulus_length() {
        let signer = make_signer();
        let sig = signer.sign(b"payload").expect("sign");
        assert_eq!(sig.len(), 256);
    }

    #[test]
    fn pkcs1_signing_is_deterministic() {
        let signer = make_signer();
        let a = signer.sign(b"same input").expect("sign a");
        let b = signer.sign(b"same input").expect("sign b");
        assert_eq!(a, b);
    }

    #[test]
    fn sign_file_writes_sig_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("report.pdf");
        std::fs::write(&doc, b"%PDF-1.4 test").unwrap();

        let signer = make_signer();
        let sig = signer.sign_file(&doc).expect("sign file");

        let sig_path = dir.path().join("report.pdf.sig");
        assert!(sig_path.exists());
        assert_eq!(std::fs::read(sig_path).unwrap(), sig);
    }

    #[test]
    fn sign_missing_file_fails_without_sig() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("ghost.pdf");

        let signer = make_signer();
        assert!(signer.sign_file(&doc).is_err());
        assert!(!dir.path().join("ghost.pdf.sig").exists());
    }
}
