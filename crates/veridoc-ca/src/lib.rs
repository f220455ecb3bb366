// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// veridoc-ca — thin HTTP client for the external certificate authority.

pub mod client;
pub mod csr;

pub use client::CaClient;
pub use csr::generate_csr;
