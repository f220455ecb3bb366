// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// veridoc-vault — owner-scoped document storage plus the service layer
// that ties validation, scanning, signing, verification, and audit
// recording into the upload/download/delete/verify operations.

pub mod service;
pub mod store;
pub mod validate;

pub use service::DocumentService;
pub use store::DocumentStore;
