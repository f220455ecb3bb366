// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server key material — the RSA key pair and verifying certificate loaded
// once at startup and reused for every signing/verification operation.
//
// # Design note
//
// `ring` signs with PKCS#8/PKCS#1 private keys and verifies against the
// PKCS#1 `RSAPublicKey` encoding, but it ships no PEM or X.509 machinery.
// PEM framing is handled by the `pem` crate; for certificates that carry a
// `PUBLIC KEY` block (SubjectPublicKeyInfo, RFC 3279 §2.3.1) the embedded
// PKCS#1 key is unwrapped with a minimal DER walk below. Full X.509
// chain validation is the CA's concern, not this module's.

use std::path::Path;

use ring::signature::RsaKeyPair;
use tracing::{debug, instrument};
use veridoc_core::config::StorageConfig;
use veridoc_core::error::{Result, VeridocError};

/// Process-wide signing and verification key material.
///
/// The private key is provisioned out-of-band (never generated here); a
/// missing key file is a fatal precondition failure. The verifying key
/// comes from the persisted server certificate when present, otherwise
/// from the key pair's own public half so sign→verify works before the
/// first CA round-trip.
#[derive(Debug)]
pub struct ServerKeyMaterial {
    key_pair: RsaKeyPair,
    verifying_key_der: Vec<u8>,
}

impl ServerKeyMaterial {
    /// Load key material from the fixed storage layout.
    #[instrument(skip_all, fields(key = %storage.private_key_path().display()))]
    pub fn load(storage: &StorageConfig) -> Result<Self> {
        let key_path = storage.private_key_path();
        if !key_path.exists() {
            return Err(VeridocError::MissingPrecondition(format!(
                "private key not found at {}; generate it manually",
                key_path.display()
            )));
        }
        let private_pem = std::fs::read_to_string(&key_path)?;

        let cert_path = storage.certificate_path();
        let certificate_pem = match cert_path.exists() {
            true => Some(std::fs::read_to_string(&cert_path)?),
            false => None,
        };

        Self::from_pem(&private_pem, certificate_pem.as_deref())
    }

    /// Build key material from in-memory PEM documents.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> Result<Self> {
        let key_pair = parse_private_key(private_key_pem)?;

        let verifying_key_der = match certificate_pem {
            Some(pem) => verifying_key_from_pem(pem)?,
            None => key_pair.public().as_ref().to_vec(),
        };

        debug!(
            modulus_len = key_pair.public().modulus_len(),
            "server key material loaded"
        );

        Ok(Self {
            key_pair,
            verifying_key_der,
        })
    }

    /// The RSA key pair used for local signing.
    pub fn key_pair(&self) -> &RsaKeyPair {
        &self.key_pair
    }

    /// PKCS#1 `RSAPublicKey` DER used to verify document signatures.
    pub fn verifying_key_der(&self) -> &[u8] {
        &self.verifying_key_der
    }
}

/// Parse an RSA private key from PEM (`PRIVATE KEY` = PKCS#8,
/// `RSA PRIVATE KEY` = PKCS#1).
fn parse_private_key(private_key_pem: &str) -> Result<RsaKeyPair> {
    let block = pem::parse(private_key_pem)
        .map_err(|e| VeridocError::KeyMaterial(format!("private key PEM: {e}")))?;

    match block.tag() {
        "PRIVATE KEY" => RsaKeyPair::from_pkcs8(block.contents())
            .map_err(|e| VeridocError::KeyMaterial(format!("PKCS#8 key rejected: {e}"))),
        "RSA PRIVATE KEY" => RsaKeyPair::from_der(block.contents())
            .map_err(|e| VeridocError::KeyMaterial(format!("PKCS#1 key rejected: {e}"))),
        other => Err(VeridocError::KeyMaterial(format!(
            "unsupported private key PEM tag: {other}"
        ))),
    }
}

/// Extract the PKCS#1 `RSAPublicKey` DER from a PEM-encoded certificate
/// or public key file.
///
/// Accepts `RSA PUBLIC KEY` (already PKCS#1) and `PUBLIC KEY`
/// (SubjectPublicKeyInfo wrapping PKCS#1 in a BIT STRING).
pub fn verifying_key_from_pem(certificate_pem: &str) -> Result<Vec<u8>> {
    let block = pem::parse(certificate_pem)
        .map_err(|e| VeridocError::KeyMaterial(format!("certificate PEM: {e}")))?;

    match block.tag() {
        "RSA PUBLIC KEY" => Ok(block.contents().to_vec()),
        "PUBLIC KEY" => unwrap_spki(block.contents()).ok_or_else(|| {
            VeridocError::KeyMaterial("malformed SubjectPublicKeyInfo".to_owned())
        }),
        other => Err(VeridocError::KeyMaterial(format!(
            "unsupported certificate PEM tag: {other}"
        ))),
    }
}

/// Load the verifying key from a certificate file on disk.
///
/// A missing certificate is a precondition failure: verification without
/// trust material must deny, not default-allow.
pub fn verifying_key_from_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(VeridocError::MissingPrecondition(format!(
            "server certificate not found at {}",
            path.display()
        )));
    }
    verifying_key_from_pem(&std::fs::read_to_string(path)?)
}

/// Read one DER TLV, returning (tag, contents, remainder).
fn read_tlv(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, rest) = input.split_first()?;
    let (&first, rest) = rest.split_first()?;

    let (len, rest) = if first & 0x80 == 0 {
        (first as usize, rest)
    } else {
        let n = (first & 0x7f) as usize;
        if n == 0 || n > 4 || rest.len() < n {
            return None;
        }
        let mut len = 0usize;
        for &b in &rest[..n] {
            len = (len << 8) | b as usize;
        }
        (len, &rest[n..])
    };

    if rest.len() < len {
        return None;
    }
    Some((tag, &rest[..len], &rest[len..]))
}

/// SubjectPublicKeyInfo → the PKCS#1 `RSAPublicKey` inside its BIT STRING.
fn unwrap_spki(der: &[u8]) -> Option<Vec<u8>> {
    let (tag, body, _) = read_tlv(der)?;
    if tag != 0x30 {
        return None;
    }
    // AlgorithmIdentifier — skipped; ring rejects non-RSA keys on use.
    let (alg_tag, _alg, rest) = read_tlv(body)?;
    if alg_tag != 0x30 {
        return None;
    }
    let (bits_tag, bits, _) = read_tlv(rest)?;
    if bits_tag != 0x03 {
        return None;
    }
    let (&unused_bits, key) = bits.split_first()?;
    if unused_bits != 0 {
        return None;
    }
    Some(key.to_vec())
}
