//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::Path;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use convhub_api::{AppState, build_router};
use convhub_core::config::{AppConfig, FailurePolicy};

const BOUNDARY: &str = "convhub-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    /// Owns the storage roots for the lifetime of the test
    _root: TempDir,
}

/// A buffered response
pub struct TestResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl TestApp {
    /// Create a new test application with the isolate policy
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a test application with the given failure policy
    pub fn with_policy(policy: FailurePolicy) -> Self {
        Self::with_config(|config| config.conversion.failure_policy = policy)
    }

    /// Create a test application after adjusting the default config
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.converted_dir = root.path().join("converted");
        config.conversion.timeout_seconds = 60;
        adjust(&mut config);

        let router = build_router(AppState::new(config.clone()));

        Self {
            router,
            config,
            _root: root,
        }
    }

    /// Send a request and buffer the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        self.request(request).await
    }

    /// POST a conversion form to `/api/convert`
    pub async fn convert(
        &self,
        conversion_type: Option<&str>,
        files: &[(&str, &[u8])],
    ) -> TestResponse {
        self.post_form("/api/convert", conversion_type, files).await
    }

    /// POST a conversion form to `path`
    pub async fn post_form(
        &self,
        path: &str,
        conversion_type: Option<&str>,
        files: &[(&str, &[u8])],
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(conversion_type, files)))
            .expect("Failed to build request");
        self.request(request).await
    }

    /// Number of regular files left under the converted root
    pub fn converted_file_count(&self) -> usize {
        count_files(&self.config.storage.converted_dir)
    }

    /// Number of regular files left under the upload root
    pub fn uploaded_file_count(&self) -> usize {
        count_files(&self.config.storage.upload_dir)
    }
}

impl TestResponse {
    /// Body as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("Body is not UTF-8")
    }

    /// Body as JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Body is not JSON")
    }

    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Entries of a ZIP body, in archive order
    pub fn zip_entries(&self) -> Vec<(String, Vec<u8>)> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(self.body.to_vec())).expect("Body is not a ZIP");
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).expect("Failed to open entry");
            let mut content = Vec::new();
            file.read_to_end(&mut content).expect("Failed to read entry");
            entries.push((file.name().to_string(), content));
        }
        entries
    }
}

/// Build a multipart body with an optional `conversion_type` field and one
/// `files` part per file
pub fn multipart_body(conversion_type: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(value) = conversion_type {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"conversion_type\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Encode a small RGB PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 40) as u8, (y * 40) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}
