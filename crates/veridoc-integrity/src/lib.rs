// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// veridoc-integrity — the cryptographic half of Veridoc.
//
// Holds the server's RSA key material, produces and checks detached
// document signatures, keeps the append-only audit trail, and wraps the
// external malware scanner behind a capability trait.

pub mod audit;
pub mod hash;
pub mod keys;
pub mod scanner;
pub mod signer;
pub mod verifier;

pub use audit::{AuditEntry, AuditLog};
pub use hash::hash_bytes;
pub use keys::ServerKeyMaterial;
pub use scanner::{CommandScanner, MalwareScanner};
pub use signer::Signer;
pub use verifier::Verifier;
