// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Malware scanning — a capability trait over whatever antivirus binary the
// host provides. The scanner is pluggable; "unavailable" is a distinct
// verdict the upload policy handles explicitly, never a silent pass.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, instrument, warn};
use veridoc_core::error::{Result, VeridocError};
use veridoc_core::types::ScanVerdict;

/// Capability interface for malware scanning.
pub trait MalwareScanner: Send + Sync {
    /// Scan `data` and report a verdict. Implementations return
    /// `ScanVerdict::Unavailable` when the backing scanner cannot run at
    /// all, and reserve `Err` for unexpected I/O failures.
    fn scan(&self, data: &[u8]) -> Result<ScanVerdict>;
}

/// Scanner backend that shells out to an antivirus executable.
///
/// The configured arguments are passed first, then the path of a
/// temporary file holding the bytes under scan. A successful run whose
/// stdout contains `clean_marker` is `Clean`; any other completed run is
/// `Infected`; a missing executable is `Unavailable`.
pub struct CommandScanner {
    program: PathBuf,
    args: Vec<String>,
    clean_marker: String,
}

impl CommandScanner {
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = String>,
        clean_marker: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
            clean_marker: clean_marker.into(),
        }
    }

    /// Windows Defender invocation as used by the original deployment.
    pub fn windows_defender() -> Self {
        Self::new(
            r"C:\Program Files\Windows Defender\MpCmdRun.exe",
            ["-Scan", "-ScanType", "3", "-File"]
                .into_iter()
                .map(String::from),
            "No threats detected",
        )
    }
}

impl MalwareScanner for CommandScanner {
    #[instrument(skip_all, fields(program = %self.program.display(), data_len = data.len()))]
    fn scan(&self, data: &[u8]) -> Result<ScanVerdict> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(data)?;
        tmp.flush()?;

        let output = match Command::new(&self.program)
            .args(&self.args)
            .arg(tmp.path())
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("scanner executable not found");
                return Ok(ScanVerdict::Unavailable);
            }
            Err(e) => {
                return Err(VeridocError::Scanner(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let verdict = if output.status.success() && stdout.contains(&self.clean_marker) {
            ScanVerdict::Clean
        } else {
            ScanVerdict::Infected
        };

        debug!(?verdict, "scan complete");
        Ok(verdict)
    }
}
