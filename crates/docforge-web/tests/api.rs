//! HTTP tests for the conversion endpoints, driven through the router
//! without binding a socket.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use docforge_core::convert::office::expected_output;
use docforge_core::{AppConfig, DocumentConverter, Error, OfficeBackend, Result};
use docforge_web::helpers::ErrorBody;
use docforge_web::routes::{FileResponse, HealthResponse};
use docforge_web::{AppState, router};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use lopdf::{Dictionary, Document, Object};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

// =============================================================================
// Fixtures
// =============================================================================

/// Blank PDF with `pages` pages of the given width.
fn blank_pdf(pages: usize, width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(width),
                        Object::Integer(300),
                    ]),
                ),
            ]));
            Object::Reference(page_id)
        })
        .collect();

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Page widths of a PDF, in page order.
fn page_widths(pdf: &[u8]) -> Vec<f32> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_float()
                .unwrap()
        })
        .collect()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([9, 9, 9])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Office backend that answers with a fixed PDF, or fails.
struct CannedOffice {
    result: std::result::Result<Vec<u8>, &'static str>,
    delay: Duration,
}

#[async_trait]
impl OfficeBackend for CannedOffice {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn convert(&self, input: &Path, outdir: &Path) -> Result<PathBuf> {
        tokio::time::sleep(self.delay).await;
        match &self.result {
            Ok(pdf) => {
                let output = expected_output(input, outdir);
                tokio::fs::write(&output, pdf).await.unwrap();
                Ok(output)
            }
            Err(message) => Err(Error::Conversion((*message).to_string())),
        }
    }
}

struct TestApp {
    _dir: TempDir,
    router: Router,
}

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.scratch.dir = dir.path().join("temp");
    config
}

fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(config_in(&dir));
    TestApp {
        router: router(Arc::new(state)),
        _dir: dir,
    }
}

fn app_with_office(office: CannedOffice, request_timeout: Duration) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let converter = DocumentConverter::with_office_backend(&config, Arc::new(office))
        .with_request_timeout(request_timeout);
    let state = AppState::with_converter(config, converter);
    TestApp {
        router: router(Arc::new(state)),
        _dir: dir,
    }
}

async fn post(app: &TestApp, uri: &str, body: &Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn pdf_from(body: &[u8]) -> Vec<u8> {
    let response: FileResponse = serde_json::from_slice(body).unwrap();
    STANDARD.decode(response.file_base64).unwrap()
}

fn error_code(body: &[u8]) -> String {
    let error: ErrorBody = serde_json::from_slice(body).unwrap();
    error.error
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
}

// =============================================================================
// Merge
// =============================================================================

#[tokio::test]
async fn test_merge_success() {
    let app = app();
    let body = json!({
        "files": [
            STANDARD.encode(blank_pdf(2, 100)),
            STANDARD.encode(blank_pdf(1, 200)),
        ]
    });

    let (status, body) = post(&app, "/pdf/to/merge", &body).await;
    assert_eq!(status, StatusCode::OK);
    let widths = page_widths(&pdf_from(&body));
    assert_eq!(widths.len(), 3);
    assert!((widths[0] - 100.0).abs() < 0.01);
    assert!((widths[2] - 200.0).abs() < 0.01);
}

#[tokio::test]
async fn test_merge_empty_list() {
    let app = app();
    let (status, body) = post(&app, "/pdf/to/merge", &json!({ "files": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "empty_merge");
}

#[tokio::test]
async fn test_merge_bad_base64() {
    let app = app();
    let (status, body) = post(&app, "/pdf/to/merge", &json!({ "files": ["!@#"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "decoding_error");
}

#[tokio::test]
async fn test_merge_unparsable_pdf() {
    let app = app();
    let body = json!({ "files": [STANDARD.encode(blank_pdf(1, 100)), STANDARD.encode("nope")] });
    let (status, body) = post(&app, "/pdf/to/merge", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "decoding_error");
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/pdf/to/merge")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"files\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

// =============================================================================
// Office
// =============================================================================

#[tokio::test]
async fn test_office_success() {
    let app = app_with_office(
        CannedOffice {
            result: Ok(blank_pdf(1, 612)),
            delay: Duration::ZERO,
        },
        Duration::from_secs(10),
    );
    let body = json!({ "file_base64": STANDARD.encode(b"PK fake docx") });

    let (status, body) = post(&app, "/docx/to/pdf", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page_widths(&pdf_from(&body)).len(), 1);
}

#[tokio::test]
async fn test_office_conversion_failure() {
    let app = app_with_office(
        CannedOffice {
            result: Err("source file could not be loaded"),
            delay: Duration::ZERO,
        },
        Duration::from_secs(10),
    );
    let body = json!({ "file_base64": STANDARD.encode(b"garbage"), "extension": "odt" });

    let (status, body) = post(&app, "/docx/to/pdf", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "conversion_failure");
}

#[tokio::test]
async fn test_office_timeout() {
    let app = app_with_office(
        CannedOffice {
            result: Ok(blank_pdf(1, 612)),
            delay: Duration::from_secs(5),
        },
        Duration::from_millis(50),
    );
    let body = json!({ "file_base64": STANDARD.encode(b"slow") });

    let (status, body) = post(&app, "/docx/to/pdf", &body).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_code(&body), "conversion_timeout");
}

#[tokio::test]
async fn test_office_suite_missing() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.office.binary = "docforge-no-such-binary".to_string();
    let app = TestApp {
        router: router(Arc::new(AppState::new(config))),
        _dir: dir,
    };
    let body = json!({ "file_base64": STANDARD.encode(b"PK") });

    let (status, body) = post(&app, "/docx/to/pdf", &body).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "environment_error");
}

// =============================================================================
// Image
// =============================================================================

#[tokio::test]
async fn test_image_success() {
    let app = app();
    let body = json!({ "file_base64": STANDARD.encode(png(2400, 1200)) });

    let (status, body) = post(&app, "/image/to/pdf", &body).await;
    assert_eq!(status, StatusCode::OK);
    let widths = page_widths(&pdf_from(&body));
    assert_eq!(widths.len(), 1);
    assert!((widths[0] - 1200.0).abs() < 0.01);
}

#[tokio::test]
async fn test_image_undecodable() {
    let app = app();
    let body = json!({ "file_base64": STANDARD.encode(b"not an image") });
    let (status, body) = post(&app, "/image/to/pdf", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "decoding_error");
}

// =============================================================================
// HTML
// =============================================================================

#[tokio::test]
async fn test_html_success() {
    let app = app();
    let body = json!({ "file_base64": STANDARD.encode("<h1>Hello</h1><p>World</p>") });
    let (status, body) = post(&app, "/html/to/pdf", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page_widths(&pdf_from(&body)).len(), 1);
}

#[tokio::test]
async fn test_html_with_omitted_head_end_tag() {
    let app = app();
    let html = "<html><head><title>T</title><body><p>Visible body text</p></body></html>";
    let body = json!({ "file_base64": STANDARD.encode(html) });
    let (status, body) = post(&app, "/html/to/pdf", &body).await;
    assert_eq!(status, StatusCode::OK);

    let doc = Document::load_mem(&pdf_from(&body)).unwrap();
    let pages = doc.get_pages();
    let content = doc.get_page_content(pages[&1]).unwrap();
    assert!(String::from_utf8_lossy(&content).contains("(Visible body text) Tj"));
}

#[tokio::test]
async fn test_html_not_utf8() {
    let app = app();
    let body = json!({ "file_base64": STANDARD.encode([0xC3_u8, 0x28]) });
    let (status, body) = post(&app, "/html/to/pdf", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "decoding_error");
}

#[tokio::test]
async fn test_html_render_failure() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.html.max_pages = 1;
    let app = TestApp {
        router: router(Arc::new(AppState::new(config))),
        _dir: dir,
    };

    let html = "<p>paragraph</p>".repeat(200);
    let body = json!({ "file_base64": STANDARD.encode(html) });
    let (status, body) = post(&app, "/html/to/pdf", &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "rendering_error");
}
