// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verifier — recomputes detached-signature validity before any gated
// access. A missing `.sig` artifact is a verification failure, never an
// "unsigned, allow".

use std::path::Path;

use ring::signature::{RSA_PKCS1_2048_8192_SHA256, UnparsedPublicKey};
use tracing::{debug, instrument, warn};
use veridoc_core::error::Result;
use veridoc_core::types::IntegrityStatus;

use crate::keys::{self, ServerKeyMaterial};
use crate::signer::signature_path;

/// Validates detached signatures against the server's public certificate.
pub struct Verifier {
    verifying_key_der: Vec<u8>,
}

impl Verifier {
    /// Use the verifying key carried by the loaded key material.
    pub fn new(keys: &ServerKeyMaterial) -> Self {
        Self {
            verifying_key_der: keys.verifying_key_der().to_vec(),
        }
    }

    /// Build a verifier from a PEM certificate alone (no private key
    /// needed — e.g. from the cert fetched off the CA).
    pub fn from_certificate_pem(certificate_pem: &str) -> Result<Self> {
        Ok(Self {
            verifying_key_der: keys::verifying_key_from_pem(certificate_pem)?,
        })
    }

    /// Check `signature` over `data`. Returns `false` for any invalid or
    /// malformed signature.
    pub fn verify_bytes(&self, data: &[u8], signature: &[u8]) -> bool {
        let public_key =
            UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, &self.verifying_key_der);
        public_key.verify(data, signature).is_ok()
    }

    /// Verify the file at `path` against its `<path>.sig` sibling.
    ///
    /// Missing signature ⇒ `Rejected`. Invalid signature ⇒ `Rejected`.
    /// I/O failure reading the document itself is an error, not a
    /// rejection — the caller cannot conclude anything about integrity.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn verify_file(&self, path: &Path) -> Result<IntegrityStatus> {
        let sig_path = signature_path(path);
        let signature = match std::fs::read(&sig_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(sig_path = %sig_path.display(), "signature artifact missing");
                return Ok(IntegrityStatus::Rejected);
            }
            Err(e) => return Err(e.into()),
        };

        let data = std::fs::read(path)?;
        let status = if self.verify_bytes(&data, &signature) {
            IntegrityStatus::Verified
        } else {
            IntegrityStatus::Rejected
        };

        debug!(?status, "signature checked");
        Ok(status)
    }
}
