// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CA client — single-shot, blocking HTTP calls to the certificate
// authority. No retries, no backoff; the client-level timeout is the only
// cancellation mechanism.
//
// Endpoints:
//   POST {base}/sign                    multipart `csr` part  → certificate PEM
//   POST {base}/sign_document          multipart `file` part → detached signature
//   GET  {base}/get_server_cert/{name}                       → certificate PEM

use std::path::{Path, PathBuf};

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use tracing::{debug, info, instrument};
use veridoc_core::config::{CaConfig, StorageConfig};
use veridoc_core::error::{Result, VeridocError};

/// Client for the external certificate authority.
pub struct CaClient {
    client: Client,
    base_url: String,
    server_name: String,
    csr_path: PathBuf,
    certificate_path: PathBuf,
}

impl CaClient {
    pub fn new(ca: &CaConfig, storage: &StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(ca.timeout_secs))
            .build()
            .map_err(transport_err)?;

        Ok(Self {
            client,
            base_url: ca.base_url.trim_end_matches('/').to_owned(),
            server_name: ca.server_name.clone(),
            csr_path: storage.csr_path(),
            certificate_path: storage.certificate_path(),
        })
    }

    /// Submit the on-disk CSR for signing and persist the returned
    /// certificate.
    ///
    /// Idempotent: an existing certificate short-circuits the whole
    /// workflow — its bytes are returned unchanged and no network request
    /// is made. The CSR must already exist (generated out-of-band with
    /// the private key); its absence is a precondition failure. On a
    /// non-2xx CA response nothing is written.
    #[instrument(skip(self))]
    pub fn request_certificate(&self) -> Result<Vec<u8>> {
        if self.certificate_path.exists() {
            info!(
                path = %self.certificate_path.display(),
                "server certificate already exists; skipping certificate request"
            );
            return Ok(std::fs::read(&self.certificate_path)?);
        }

        if !self.csr_path.exists() {
            return Err(VeridocError::MissingPrecondition(format!(
                "CSR not found at {}; generate it first",
                self.csr_path.display()
            )));
        }
        let csr = std::fs::read(&self.csr_path)?;

        let part = Part::bytes(csr).file_name("server.csr");
        let form = Form::new().part("csr", part);

        let response = self
            .client
            .post(format!("{}/sign", self.base_url))
            .multipart(form)
            .send()
            .map_err(transport_err)?;

        let status = response.status();
        let body = response.bytes().map_err(transport_err)?;

        if !status.is_success() {
            return Err(VeridocError::Ca {
                status: Some(status.as_u16()),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        // Persisted verbatim — the CA's PEM is the trust anchor.
        if let Some(parent) = self.certificate_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.certificate_path, &body)?;

        info!(
            path = %self.certificate_path.display(),
            "certificate received and stored"
        );
        Ok(body.to_vec())
    }

    /// Delegated trust model: send the raw document to the CA for signing
    /// and persist the returned detached signature as `<path>.sig`.
    #[instrument(skip(self), fields(path = %document_path.display()))]
    pub fn sign_document(&self, document_path: &Path) -> Result<Vec<u8>> {
        let data = std::fs::read(document_path)?;
        let file_name = document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned());

        let part = Part::bytes(data).file_name(file_name);
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/sign_document", self.base_url))
            .multipart(form)
            .send()
            .map_err(transport_err)?;

        let status = response.status();
        let body = response.bytes().map_err(transport_err)?;

        if !status.is_success() {
            return Err(VeridocError::Ca {
                status: Some(status.as_u16()),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let mut sig_path = document_path.as_os_str().to_owned();
        sig_path.push(".sig");
        std::fs::write(&sig_path, &body)?;

        debug!(signature_len = body.len(), "delegated signature stored");
        Ok(body.to_vec())
    }

    /// Fetch the server's public certificate from the CA and persist it
    /// to the well-known certificate path.
    #[instrument(skip(self))]
    pub fn fetch_server_cert(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(format!(
                "{}/get_server_cert/{}",
                self.base_url, self.server_name
            ))
            .send()
            .map_err(transport_err)?;

        let status = response.status();
        let body = response.bytes().map_err(transport_err)?;

        if !status.is_success() {
            return Err(VeridocError::Ca {
                status: Some(status.as_u16()),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if let Some(parent) = self.certificate_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.certificate_path, &body)?;

        debug!(cert_len = body.len(), "server certificate fetched");
        Ok(body.to_vec())
    }
}

/// Transport-level failures (connect, timeout, body read) carry no CA
/// status code.
fn transport_err(e: reqwest::Error) -> VeridocError {
    VeridocError::Ca {
        status: e.status().map(|s| s.as_u16()),
        body: e.to_string(),
    }
}
