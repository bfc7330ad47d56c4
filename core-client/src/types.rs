//! Request options and response types crossing the facade boundary.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Timeout applied when a request config does not set one. A configured
/// timeout of 0 also maps here; "no timeout" is never an option.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header marking a payload as encrypted with the client pass phrase.
pub const ENCRYPTED_HEADER: &str = "x-payload-encrypted";

/// Header carrying the configured client identifier.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Per-request transport options.
///
/// Deserialized from the caller's option map; unrecognized keys are
/// ignored, not rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestConfig {
    /// Extra headers merged into the request
    pub headers: HashMap<String, String>,
    /// Query parameters appended to the request URL
    pub query: HashMap<String, String>,
    /// Request timeout in milliseconds; 0 or absent selects the default
    pub timeout_ms: Option<u64>,
    /// How the caller wants the response body treated
    pub response_type: Option<ResponseType>,
}

impl RequestConfig {
    /// Effective timeout for this request.
    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            None | Some(0) => DEFAULT_TIMEOUT,
            Some(ms) => Duration::from_millis(ms),
        }
    }
}

/// Response body handling requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Body must be valid UTF-8; a binary body is an error
    Text,
    /// Body is passed through untouched (the default behavior)
    Binary,
}

/// Response handed back by the execute operations.
///
/// HTTP error statuses are surfaced here rather than as errors; only
/// transport-level failures reject the operation.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl ClientResponse {
    /// Check if the status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the body as a UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ClientError::Network(format!("response body is not valid UTF-8: {}", e)))
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::Network(format!("malformed JSON response: {}", e)))
    }
}

/// File payload descriptor for the upload operation.
///
/// The file at `file_path` is streamed from disk as a multipart part; it is
/// never buffered in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    /// Path of the file on the host filesystem
    pub file_path: PathBuf,
    /// Multipart field name; defaults to "file"
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// File name reported to the server
    #[serde(default)]
    pub file_name: Option<String>,
    /// MIME type of the content
    #[serde(default)]
    pub mime_type: Option<String>,
}

fn default_field_name() -> String {
    "file".to_string()
}

/// Outcome of a download operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    /// Where the body was written
    pub destination: PathBuf,
    /// Number of body bytes written
    pub bytes_written: u64,
}
