//! Batch conversion endpoint: multipart upload in, converted file or
//! `converted_files.zip` out.

use std::fmt::Write;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use convhub_convert::{Batch, ConversionRequest, UploadedFile};
use convhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Number of files converted in the batch.
pub const CONVERTED_FILES_HEADER: &str = "x-converted-files";
/// Number of files that failed in the batch.
pub const FAILED_FILES_HEADER: &str = "x-failed-files";

/// Raw form values before validation.
#[derive(Debug, Default)]
struct ConversionForm {
    conversion_type: Option<String>,
    files: Vec<UploadedFile>,
}

/// POST / and POST /api/convert
pub async fn convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    let request = ConversionRequest::parse(form.conversion_type.as_deref(), form.files)?;

    let limit = state.config.server.request_timeout_seconds;
    let batch = tokio::time::timeout(
        Duration::from_secs(limit),
        state.dispatcher.dispatch(request),
    )
    .await
    .map_err(|_| AppError::service_unavailable(format!("Conversion exceeded {limit}s")))??;

    let response = respond(&state, &batch).await;
    state.dispatcher.release(&batch).await;
    response
}

async fn read_form(mut multipart: Multipart) -> Result<ConversionForm, AppError> {
    let mut form = ConversionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") | Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
                if file_name.trim().is_empty() {
                    // Browsers send an empty part when no file was picked.
                    continue;
                }
                form.files.push(UploadedFile::new(file_name, data));
            }
            Some("conversion_type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid conversion_type: {e}")))?;
                form.conversion_type = Some(value);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

async fn respond(state: &AppState, batch: &Batch) -> Result<Response, ApiError> {
    let package = state.packager.package(batch).await?;
    let body = tokio::fs::read(package.path()).await?;

    tracing::info!(
        batch_id = %batch.id,
        file = %package.download_name(),
        bytes = body.len(),
        converted = batch.converted_count(),
        failed = batch.failed_count(),
        "Sending conversion result"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, package.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(package.download_name()),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .header(CONVERTED_FILES_HEADER, batch.converted_count())
        .header(FAILED_FILES_HEADER, batch.failed_count())
        .body(Body::from(body))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

/// `attachment` disposition. Names outside printable ASCII get an ASCII
/// fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(file_name)
        )
    }
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}
