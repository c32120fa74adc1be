//! Multipart submission client for the attendance backend.
//!
//! Owns transport details only: form construction, timeout and HTTP
//! error mapping, and JSON decoding of the backend's `message` payload.
//! Validation happens before any network activity; a request that fails
//! validation is never sent.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use rollcall_hw::CapturedImage;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server rejected submission: status {status}: {detail}")]
    ServerRejected { status: u16, detail: String },
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

/// Parsed backend acknowledgment, minimally `{ "message": string }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionResult {
    pub message: String,
}

/// HTTP client bound to one backend origin.
pub struct SubmissionClient {
    http: Client,
    base_url: Url,
}

impl SubmissionClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Register a face under a name: multipart POST of `name` and
    /// `image` to `/register`.
    ///
    /// The backend's register response schema is unspecified, so any
    /// 2xx is treated as an acknowledgment; a `{ "message": ... }`
    /// body is surfaced when present.
    pub async fn register(
        &self,
        name: &str,
        image: &CapturedImage,
    ) -> Result<SubmissionResult, SubmissionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SubmissionError::Validation("name must not be empty".into()));
        }
        validate_image(image)?;

        let form = Form::new()
            .text("name", name.to_owned())
            .part("image", jpeg_part(image)?);

        let body = self.post_multipart("register", form).await?;
        tracing::info!(name, "registration acknowledged");

        Ok(serde_json::from_slice(&body).unwrap_or(SubmissionResult {
            message: "registered".to_string(),
        }))
    }

    /// Attempt recognition and log attendance: multipart POST of
    /// `image` to `/attendance`. The backend answers
    /// `{ "message": string }` and the message is surfaced verbatim.
    pub async fn mark_attendance(
        &self,
        image: &CapturedImage,
    ) -> Result<SubmissionResult, SubmissionError> {
        validate_image(image)?;

        let form = Form::new().part("image", jpeg_part(image)?);
        let body = self.post_multipart("attendance", form).await?;

        let result: SubmissionResult = serde_json::from_slice(&body)
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;
        tracing::info!(message = %result.message, "attendance response");
        Ok(result)
    }

    async fn post_multipart(&self, path: &str, form: Form) -> Result<Vec<u8>, SubmissionError> {
        let mut url = self.base_url.clone();
        url.set_path(path);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }
}

fn validate_image(image: &CapturedImage) -> Result<(), SubmissionError> {
    if image.jpeg.is_empty() {
        return Err(SubmissionError::Validation(
            "no captured image to submit".into(),
        ));
    }
    Ok(())
}

fn jpeg_part(image: &CapturedImage) -> Result<Part, SubmissionError> {
    Part::bytes(image.jpeg.clone())
        .file_name("capture.jpg")
        .mime_str("image/jpeg")
        .map_err(|e| SubmissionError::Validation(format!("invalid image part: {e}")))
}

fn map_transport_error(error: reqwest::Error) -> SubmissionError {
    if error.is_timeout() {
        SubmissionError::Network(format!("request timed out: {error}"))
    } else {
        SubmissionError::Network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SubmissionError {
    SubmissionError::ServerRejected {
        status: status.as_u16(),
        detail: body_preview(body),
    }
}

/// Compact whitespace and truncate a response body for error display.
fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> CapturedImage {
        CapturedImage {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 8,
            height: 4,
        }
    }

    fn empty_image() -> CapturedImage {
        CapturedImage {
            jpeg: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Points at a closed local port; validation failures must error
    /// out before this address is ever contacted.
    fn client() -> SubmissionClient {
        SubmissionClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name_without_network() {
        let err = client().register("   ", &image()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_missing_image_without_network() {
        let err = client().register("Alice", &empty_image()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_attendance_rejects_missing_image_without_network() {
        let err = client().mark_attendance(&empty_image()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_maps_to_network_error() {
        let err = client().register("Alice", &image()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Network(_)));
    }

    #[test]
    fn test_non_success_status_maps_to_server_rejected() {
        let err = map_status_error(StatusCode::INTERNAL_SERVER_ERROR, b"boom");
        match err {
            SubmissionError::ServerRejected { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "boom");
            }
            other => panic!("expected ServerRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_body_preview_truncates_long_bodies() {
        let body = "x".repeat(500);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= 163);
    }

    #[test]
    fn test_attendance_message_decodes_verbatim() {
        let result: SubmissionResult =
            serde_json::from_slice(br#"{"message":"No match found"}"#).unwrap();
        assert_eq!(result.message, "No match found");
    }
}
