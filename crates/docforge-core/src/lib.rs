//! Document to PDF conversion core.
//!
//! This library provides everything behind the conversion endpoints:
//! - Base64 payload codec
//! - Scratch storage with guaranteed cleanup
//! - Converters: PDF merge, office documents, raster images, HTML
//! - [`DocumentConverter`], which ties them together per request

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod scratch;
pub mod util;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, HtmlConfig, ImageConfig, OfficeConfig, ScratchConfig, ServerConfig};
pub use convert::{HtmlConverter, ImageConverter, OfficeBackend, OfficeConverter};
pub use error::{Error, ErrorClass, Result};
pub use scratch::{ScratchDir, StagedFile};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::convert::office;

/// Runs conversions on behalf of a request: decode, convert, encode, all
/// within one time budget.
///
/// Cheap to share behind an `Arc`; requests only have the scratch
/// directory in common.
pub struct DocumentConverter {
    scratch: ScratchDir,
    office: Arc<dyn OfficeBackend>,
    image: ImageConverter,
    html: HtmlConverter,
    request_timeout: Duration,
}

impl DocumentConverter {
    /// Create a converter using LibreOffice for office documents
    pub fn new(config: &AppConfig) -> Self {
        Self::with_office_backend(config, Arc::new(OfficeConverter::new(&config.office)))
    }

    /// Create with a custom office backend
    pub fn with_office_backend(config: &AppConfig, office: Arc<dyn OfficeBackend>) -> Self {
        Self {
            scratch: ScratchDir::new(&config.scratch.dir),
            office,
            image: ImageConverter::new(config.image.clone()),
            html: HtmlConverter::new(config.html.clone()),
            request_timeout: config.server.request_timeout(),
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub const fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    pub fn office_backend(&self) -> &'static str {
        self.office.name()
    }

    // ------------------------------------------------------------------
    // Base64 in, base64 out
    // ------------------------------------------------------------------

    /// Merge base64 PDFs, in order, into one base64 PDF.
    pub async fn merge_pdfs(&self, files: &[String]) -> Result<String> {
        let documents = files
            .iter()
            .map(|file| codec::decode_payload(file))
            .collect::<Result<Vec<_>>>()?;
        let pdf = self.merge(documents).await?;
        Ok(codec::encode(&pdf))
    }

    /// Convert a base64 office document. `extension` names the source
    /// format and defaults to `docx`.
    pub async fn office_to_pdf(&self, payload: &str, extension: Option<&str>) -> Result<String> {
        let bytes = codec::decode_payload(payload)?;
        let pdf = self.office(&bytes, extension).await?;
        Ok(codec::encode(&pdf))
    }

    pub async fn image_to_pdf(&self, payload: &str) -> Result<String> {
        let bytes = codec::decode_payload(payload)?;
        let pdf = self.image(bytes).await?;
        Ok(codec::encode(&pdf))
    }

    pub async fn html_to_pdf(&self, payload: &str) -> Result<String> {
        let bytes = codec::decode_payload(payload)?;
        let pdf = self.html(bytes).await?;
        Ok(codec::encode(&pdf))
    }

    // ------------------------------------------------------------------
    // Bytes in, bytes out
    // ------------------------------------------------------------------

    pub async fn merge(&self, documents: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        let count = documents.len();
        self.bounded(&format!("merge of {count} documents"), async move {
            blocking(move || convert::merge(&documents)).await
        })
        .await
    }

    pub async fn office(&self, bytes: &[u8], extension: Option<&str>) -> Result<Vec<u8>> {
        let extension = office::source_extension(extension)?;
        self.bounded(&format!("{extension} conversion"), async {
            let input = self.scratch.stage(bytes, extension).await?;
            // Owned before the backend runs so a partial output is removed too
            let output = self.scratch.adopt(input.id(), "pdf");

            let produced = self.office.convert(input.path(), self.scratch.root()).await?;
            if produced != output.path() {
                debug!(
                    "{} wrote {} instead of {}",
                    self.office.name(),
                    produced.display(),
                    output.path().display()
                );
            }
            self.scratch.read(&produced).await
        })
        .await
    }

    pub async fn image(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let converter = self.image.clone();
        self.bounded("image conversion", async move {
            blocking(move || converter.convert(&bytes)).await
        })
        .await
    }

    pub async fn html(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let converter = self.html.clone();
        self.bounded("HTML rendering", async move {
            blocking(move || converter.convert(&bytes)).await
        })
        .await
    }

    /// Run `work` under the request timeout and log the outcome.
    async fn bounded<T>(&self, label: &str, work: impl Future<Output = Result<T>>) -> Result<T> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConversionTimeout {
                timeout: self.request_timeout,
            }),
        };

        match &result {
            Ok(_) => info!("{} finished in {:?}", label, started.elapsed()),
            Err(e) => warn!("{} failed after {:?}: {}", label, started.elapsed(), e),
        }
        result
    }
}

/// Run CPU-bound work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Conversion(format!("conversion task failed: {e}")))?
}
