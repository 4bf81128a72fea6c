//! HTTP route handlers.
//!
//! Every conversion endpoint takes and returns JSON with base64 payloads.

mod convert;
mod health;

pub use convert::{html_to_pdf, image_to_pdf, merge_pdfs, office_to_pdf};
pub use health::health;

use serde::{Deserialize, Serialize};

/// Body of `POST /pdf/to/merge`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Base64 PDFs, merged in this order
    pub files: Vec<String>,
}

/// Body of `POST /docx/to/pdf`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OfficeRequest {
    pub file_base64: String,
    /// Source format such as `odt` or `xlsx`; `docx` when absent
    #[serde(default)]
    pub extension: Option<String>,
}

/// Body of `POST /image/to/pdf` and `POST /html/to/pdf`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileRequest {
    pub file_base64: String,
}

/// Successful conversion.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub file_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
