//! HTTP Transport Abstraction
//!
//! Provides async HTTP operations with auth header injection, streaming
//! bodies, and TLS support.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// A streaming response body.
pub type ByteStream = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)
            .map_err(|e| BridgeError::Transport(format!("JSON serialization failed: {}", e)))?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Description of a file to be streamed as a multipart upload part.
///
/// The transport opens and streams the file itself; callers never buffer the
/// content in memory.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Path of the file on the host filesystem
    pub path: PathBuf,
    /// Multipart field name the file is attached under
    pub field_name: String,
    /// File name reported to the server (defaults to the path's file name)
    pub file_name: Option<String>,
    /// MIME type of the content, if known
    pub mime_type: Option<String>,
}

impl FilePart {
    pub fn new(path: impl Into<PathBuf>, field_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field_name: field_name.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Transport(format!("JSON deserialization failed: {}", e)))
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::Transport(format!("Invalid UTF-8: {}", e)))
    }

    /// Look up a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Async HTTP transport trait
///
/// This trait abstracts HTTP operations to allow platform-specific
/// implementations. Implementations should handle:
/// - TLS certificate validation
/// - Connection pooling and keep-alive
/// - Per-request timeouts
///
/// Retry policy deliberately does not live here; transport failures are
/// surfaced to the caller exactly once.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpTransport, HttpRequest, HttpMethod};
///
/// async fn fetch_data(transport: &dyn HttpTransport) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com/data")
///         .bearer_token("token");
///
///     let response = transport.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute an HTTP request, buffering the full response body.
    ///
    /// # Errors
    ///
    /// Returns error if the network connection fails, TLS validation fails,
    /// or the request times out. HTTP error statuses are NOT errors; they
    /// are returned in the [`HttpResponse`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute a multipart POST streaming `part` from disk as the body.
    ///
    /// Any body set on `request` is ignored; the multipart form is the body.
    async fn upload(&self, request: HttpRequest, part: FilePart) -> Result<HttpResponse>;

    /// Execute a request and return the response body as a byte stream.
    ///
    /// This is useful for large files that should not be loaded entirely
    /// into memory. Unlike [`execute`](Self::execute), a non-2xx status is
    /// reported as a transport error since there is no buffered response to
    /// hand back.
    async fn fetch_stream(&self, request: HttpRequest) -> Result<ByteStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com")
            .header("User-Agent", "test")
            .bearer_token("secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert!(request.headers.contains_key("Authorization"));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_http_request_json_body() {
        let request = HttpRequest::new(HttpMethod::Post, "https://example.com")
            .json(&serde_json::json!({"key": "value"}))
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn test_http_response_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("X-Payload-Encrypted".to_string(), "1".to_string());
        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        };

        assert_eq!(response.header("x-payload-encrypted"), Some("1"));
        assert_eq!(response.header("X-PAYLOAD-ENCRYPTED"), Some("1"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_file_part_builder() {
        let part = FilePart::new("/tmp/report.pdf", "file")
            .file_name("report.pdf")
            .mime_type("application/pdf");

        assert_eq!(part.field_name, "file");
        assert_eq!(part.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(part.mime_type.as_deref(), Some("application/pdf"));
    }
}
