//! Office documents to PDF through a headless office suite.
//!
//! The suite works on paths, so input is staged in scratch storage first and
//! the PDF is written next to it as `<stem>.pdf`. Each run is bounded by a
//! timeout. `soffice` is a launcher that forks the real worker, so the run
//! gets its own process group and the whole group is killed when it ends.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::OfficeConfig;
use crate::error::{Error, Result};

/// Source formats accepted for office conversion.
pub const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "odt", "rtf", "txt", "xls", "xlsx", "ods", "ppt", "pptx", "odp",
];

/// Extension assumed when the caller does not name one.
pub const DEFAULT_OFFICE_EXTENSION: &str = "docx";

/// Normalize a caller-supplied extension and check it is supported.
pub fn source_extension(requested: Option<&str>) -> Result<&'static str> {
    let Some(requested) = requested else {
        return Ok(DEFAULT_OFFICE_EXTENSION);
    };
    let normalized = requested.trim().trim_start_matches('.').to_ascii_lowercase();

    OFFICE_EXTENSIONS
        .iter()
        .find(|&&ext| ext == normalized)
        .copied()
        .ok_or_else(|| Error::Decoding(format!("unsupported office format '{requested}'")))
}

/// Path a backend must write for `input`: `<outdir>/<input stem>.pdf`.
pub fn expected_output(input: &Path, outdir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    outdir.join(stem).with_extension("pdf")
}

/// Something that turns an office document on disk into a PDF on disk.
#[async_trait]
pub trait OfficeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Convert `input`, writing [`expected_output`] inside `outdir`, and
    /// return that path.
    async fn convert(&self, input: &Path, outdir: &Path) -> Result<PathBuf>;
}

/// LibreOffice (`soffice`) in headless mode.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    binary: String,
    binary_args: Vec<String>,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(config: &OfficeConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            binary_args: config.binary_args.clone(),
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn launch_error(&self, e: &io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Error::ToolMissing(
                format!("cannot launch '{}': {e}. Is LibreOffice installed and on PATH?", self.binary),
            ),
            _ => Error::Conversion(format!("failed to launch '{}': {e}", self.binary)),
        }
    }
}

#[async_trait]
impl OfficeBackend for OfficeConverter {
    fn name(&self) -> &'static str {
        "soffice"
    }

    async fn convert(&self, input: &Path, outdir: &Path) -> Result<PathBuf> {
        // Concurrent instances sharing one user profile block each other,
        // so every run gets its own, removed when `profile` drops.
        let profile = tempfile::Builder::new()
            .prefix("profile-")
            .tempdir_in(outdir)
            .map_err(|source| Error::IoWrite {
                path: outdir.to_path_buf(),
                source,
            })?;
        let profile_path =
            std::path::absolute(profile.path()).map_err(|source| Error::IoWrite {
                path: profile.path().to_path_buf(),
                source,
            })?;

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(&self.binary_args)
            .arg("--headless")
            .arg(format!(
                "-env:UserInstallation=file://{}",
                profile_path.display()
            ))
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(outdir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        debug!("Running {} on {}", self.binary, input.display());

        let child = command.spawn().map_err(|e| self.launch_error(&e))?;
        let _group = ProcessGroup(child.id());

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::Conversion(format!(
                    "failed waiting for '{}': {e}",
                    self.binary
                )));
            }
            Err(_) => {
                warn!(
                    "{} did not finish within {:?} on {}",
                    self.binary,
                    self.timeout,
                    input.display()
                );
                return Err(Error::ConversionTimeout {
                    timeout: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let expected = expected_output(input, outdir);
        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(Error::Conversion(format!(
                "{} produced no output for {}: {}",
                self.binary,
                input.display(),
                stderr.trim()
            )));
        }

        Ok(expected)
    }
}

/// Process group led by a spawned child, killed with everything in it on
/// drop. Already exited groups are ignored.
struct ProcessGroup(Option<u32>);

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(leader) = self.0.and_then(|pid| i32::try_from(pid).ok()) {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Err(e) = killpg(Pid::from_raw(leader), Signal::SIGKILL)
                && e != nix::errno::Errno::ESRCH
            {
                warn!("Failed to kill process group {}: {}", leader, e);
            }
        }
    }
}
