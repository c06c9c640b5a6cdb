//! Imgur upload transport
//!
//! Uploads an image (by URL or by raw bytes) to the Imgur API and parses
//! its response payload. Also tracks the remaining upload credits the
//! API reports through rate-limit headers, which is what pushes the
//! dialog into its no-credits state.
//!
//! API reference: <https://apidocs.imgur.com/>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.imgur.com";
const GENERIC_UPLOAD_ERROR: &str = "the upload failed; the image host gave no details";

/// A user-facing upload failure.
///
/// These never leave the dialog: they are rendered as status text and
/// the dialog stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("that image is too large to upload")]
    TooLarge,

    #[error("couldn't read the image file")]
    Unreadable,

    #[error("{message}")]
    Transport { message: String },

    #[error("the image host returned an unrecognised response")]
    BadResponse,
}

impl UploadError {
    /// Build a transport error, recovering a structured message from the
    /// response payload when one is attached.
    #[must_use]
    pub fn transport(payload: Option<&Value>) -> Self {
        Self::Transport {
            message: error_message_from_payload(payload),
        }
    }
}

/// The Imgur upload response envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub data: Option<UploadData>,
}

impl UploadResponse {
    /// Error text for an unsuccessful response, falling back to a
    /// generic message when the payload carries none.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.data
            .as_ref()
            .and_then(|data| data.error.as_ref())
            .and_then(message_from_error_field)
            .unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string())
    }
}

/// The `data` object of an upload response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadData {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub gifv: Option<String>,
    #[serde(default)]
    pub mp4: Option<String>,
    /// Error detail on failures; either a plain string or an object
    /// carrying a `message` field.
    #[serde(default)]
    pub error: Option<Value>,
}

impl UploadData {
    /// The hosted video variant, `gifv` preferred over `mp4`, first
    /// non-blank wins.
    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.gifv
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.mp4.as_deref().filter(|url| !url.trim().is_empty()))
    }
}

/// Remaining upload allowance, refreshed from rate-limit headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadCredits {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Something that can host an uploaded image.
///
/// Implemented by [`ImgurClient`]; test doubles implement it to drive
/// the dialog without a network.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Upload an image the host fetches itself from a URL.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] when the request cannot be sent or the
    /// host rejects it.
    async fn upload_url(&self, image_url: &str) -> std::result::Result<UploadResponse, UploadError>;

    /// Upload raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] when the request cannot be sent or the
    /// host rejects it.
    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> std::result::Result<UploadResponse, UploadError>;

    /// Last known remaining upload credits, if the host reported any.
    fn remaining_credits(&self) -> Option<u32>;
}

/// Imgur API client for anonymous image uploads.
pub struct ImgurClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    credits: Mutex<UploadCredits>,
}

impl ImgurClient {
    /// Create a client using the given registered application id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(client_id: impl Into<String>) -> crate::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: DEFAULT_API_BASE.to_string(),
            client_id: client_id.into(),
            credits: Mutex::new(UploadCredits::default()),
        })
    }

    /// Point the client at a different API base URL (used by tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Last credits reading along with when the allowance resets.
    #[must_use]
    pub fn credits(&self) -> UploadCredits {
        self.credits
            .lock()
            .map(|credits| *credits)
            .unwrap_or_default()
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<UploadResponse, UploadError> {
        let response = request.send().await.map_err(|e| {
            warn!("upload transport error: {e}");
            UploadError::transport(None)
        })?;

        self.record_credits(response.headers());
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|_| UploadError::transport(None))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                warn!("unparseable upload response: {e}");
                UploadError::BadResponse
            })
        } else {
            debug!("upload rejected with HTTP {status}");
            let payload: Option<Value> = serde_json::from_str(&body).ok();
            Err(UploadError::transport(payload.as_ref()))
        }
    }

    fn record_credits(&self, headers: &HeaderMap) {
        let remaining = headers
            .get("X-RateLimit-ClientRemaining")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u32>().ok());
        let reset_at = headers
            .get("X-RateLimit-UserReset")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        if let Ok(mut credits) = self.credits.lock() {
            if remaining.is_some() {
                credits.remaining = remaining;
            }
            if reset_at.is_some() {
                credits.reset_at = reset_at;
            }
        }
    }

    fn authorization(&self) -> String {
        format!("Client-ID {}", self.client_id)
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/3/image", self.api_base)
    }
}

#[async_trait]
impl UploadTransport for ImgurClient {
    async fn upload_url(&self, image_url: &str) -> std::result::Result<UploadResponse, UploadError> {
        debug!("uploading image by URL");
        let body = serde_json::json!({ "image": image_url, "type": "url" });
        let request = self
            .http
            .post(self.upload_endpoint())
            .header(AUTHORIZATION, self.authorization())
            .json(&body);
        self.execute(request).await
    }

    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> std::result::Result<UploadResponse, UploadError> {
        debug!("uploading image file ({} bytes)", bytes.len());
        let mut part = Part::bytes(bytes);
        if let Some(name) = file_name {
            part = part.file_name(name);
        }
        let form = Form::new().part("image", part);
        let request = self
            .http
            .post(self.upload_endpoint())
            .header(AUTHORIZATION, self.authorization())
            .multipart(form);
        self.execute(request).await
    }

    fn remaining_credits(&self) -> Option<u32> {
        self.credits().remaining
    }
}

/// Pull an error message out of an error response payload.
///
/// Imgur's error JSON is inconsistent: `data.error` is either a plain
/// string or an object with a `message` field, checked in that order.
/// Anything else falls back to a generic message.
fn error_message_from_payload(payload: Option<&Value>) -> String {
    payload
        .and_then(|value| value.get("data"))
        .and_then(|data| data.get("error"))
        .and_then(message_from_error_field)
        .unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string())
}

fn message_from_error_field(error: &Value) -> Option<String> {
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    }
}
