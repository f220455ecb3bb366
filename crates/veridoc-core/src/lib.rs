// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// veridoc-core — shared types, errors, and configuration for the Veridoc
// document integrity toolkit.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CaConfig, CsrSubject, ScanConfig, SigningStrategy, StorageConfig, VeridocConfig};
pub use error::{Result, ValidationErrors, VeridocError};
