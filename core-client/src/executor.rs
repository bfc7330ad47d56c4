//! Request assembly and execution: buffered GET/POST, streaming uploads and
//! downloads, optional payload encryption.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bridge_traits::http::{FilePart, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crypto::CryptoCodec;
use crate::error::{ClientError, Result};
use crate::registry::run_until_cancelled;
use crate::session::SessionStore;
use crate::types::{
    ClientResponse, DownloadResult, RequestConfig, ResponseType, UploadBody, CLIENT_ID_HEADER,
    ENCRYPTED_HEADER,
};

/// Issues the client's HTTP operations.
///
/// Built once per successful initialization; holds the resolved base URL,
/// the optional payload codec, and the shared session state. Operations on
/// distinct request ids may run concurrently; each takes the cancellation
/// token of its registry entry and resolves `Cancelled` when it fires
/// first.
pub struct HttpExecutor {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    base_url: Url,
    client_id: String,
    codec: Option<CryptoCodec>,
}

impl HttpExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        base_url: Url,
        client_id: String,
        codec: Option<CryptoCodec>,
    ) -> Self {
        Self {
            transport,
            session,
            base_url,
            client_id,
            codec,
        }
    }

    /// Resolve a per-call URL: absolute URLs pass through, relative ones are
    /// joined against the configured base. Query parameters from the request
    /// config are appended.
    pub(crate) fn resolve_url(&self, url: &str, config: &RequestConfig) -> Result<Url> {
        let mut resolved = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.base_url.join(url).map_err(|e| {
                    ClientError::InvalidConfig(format!("invalid request URL '{}': {}", url, e))
                })?
            }
            Err(e) => {
                return Err(ClientError::InvalidConfig(format!(
                    "invalid request URL '{}': {}",
                    url, e
                )))
            }
        };

        if !config.query.is_empty() {
            let mut pairs = resolved.query_pairs_mut();
            for (key, value) in &config.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(resolved)
    }

    /// Assemble a transport request with config headers, the client
    /// identifier, and the current session token when one exists.
    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        config: &RequestConfig,
    ) -> Result<HttpRequest> {
        let resolved = self.resolve_url(url, config)?;

        let mut request = HttpRequest::new(method, resolved.as_str()).timeout(config.timeout());
        for (key, value) in &config.headers {
            request = request.header(key.clone(), value.clone());
        }
        request = request.header(CLIENT_ID_HEADER, self.client_id.clone());

        if let Some(token) = self.session.current() {
            request = request.bearer_token(token.value());
        }

        Ok(request)
    }

    /// Attach a JSON body, encrypting it when the codec is configured.
    fn encode_body(&self, request: HttpRequest, body: &Value) -> Result<HttpRequest> {
        match &self.codec {
            Some(codec) => {
                let plaintext = serde_json::to_vec(body).map_err(|e| {
                    ClientError::EncryptionFailed(format!("body serialization failed: {}", e))
                })?;
                let ciphertext = codec.encode(&plaintext)?;
                Ok(request
                    .header("Content-Type", "application/octet-stream")
                    .header(ENCRYPTED_HEADER, "1")
                    .body(ciphertext))
            }
            None => Ok(request.json(body)?),
        }
    }

    /// Decode a transport response: decrypt when the server marks the
    /// payload encrypted, then apply the requested response handling.
    fn finish_response(
        &self,
        response: HttpResponse,
        config: &RequestConfig,
    ) -> Result<ClientResponse> {
        let encrypted = response
            .header(ENCRYPTED_HEADER)
            .map_or(false, |v| v != "0");

        let HttpResponse {
            status,
            headers,
            body,
        } = response;

        let body = if encrypted {
            match &self.codec {
                Some(codec) => codec.decode(&body)?,
                None => {
                    warn!("Response marked encrypted but encryption is not configured");
                    return Err(ClientError::DecryptionFailed);
                }
            }
        } else {
            body
        };

        if config.response_type == Some(ResponseType::Text)
            && std::str::from_utf8(&body).is_err()
        {
            return Err(ClientError::Network(
                "response body is not valid UTF-8".to_string(),
            ));
        }

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_checked(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.transport.execute(request).await?)
    }

    #[instrument(skip(self, config, token), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<ClientResponse> {
        let request = self.build_request(HttpMethod::Get, url, config)?;
        let response = run_until_cancelled(token, self.execute_checked(request)).await?;
        self.finish_response(response, config)
    }

    #[instrument(skip(self, body, config, token), fields(url = %url))]
    pub async fn post(
        &self,
        url: &str,
        body: &Value,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<ClientResponse> {
        let request = self.build_request(HttpMethod::Post, url, config)?;
        let request = self.encode_body(request, body)?;
        let response = run_until_cancelled(token, self.execute_checked(request)).await?;
        self.finish_response(response, config)
    }

    /// Stream the file described by `body` as a multipart POST.
    ///
    /// The file goes over the wire as-is; payload encryption applies to the
    /// buffered JSON operations only.
    #[instrument(skip(self, body, token), fields(url = %url, path = ?body.file_path))]
    pub async fn upload(
        &self,
        url: &str,
        body: &UploadBody,
        token: &CancellationToken,
    ) -> Result<ClientResponse> {
        let config = RequestConfig::default();
        let request = self.build_request(HttpMethod::Post, url, &config)?;

        let mut part = FilePart::new(body.file_path.clone(), body.field_name.clone());
        if let Some(name) = &body.file_name {
            part = part.file_name(name.clone());
        }
        if let Some(mime) = &body.mime_type {
            part = part.mime_type(mime.clone());
        }

        let response = run_until_cancelled(token, async {
            Ok(self.transport.upload(request, part).await?)
        })
        .await?;
        self.finish_response(response, &config)
    }

    /// Stream a GET response body to `destination`.
    #[instrument(skip(self, body, config, token), fields(url = %url, destination = ?destination))]
    pub async fn download(
        &self,
        url: &str,
        body: Option<&Value>,
        config: &RequestConfig,
        destination: &Path,
        token: &CancellationToken,
    ) -> Result<DownloadResult> {
        let mut request = self.build_request(HttpMethod::Get, url, config)?;
        if let Some(body) = body {
            request = request.json(body)?;
        }
        self.stream_to_file(request, destination, token).await
    }

    /// Download initiated via POST. The interface carries no destination for
    /// this operation, so the body is written to a uniquely named file under
    /// the OS temp directory, returned in the result.
    #[instrument(skip(self, body, config, token), fields(url = %url))]
    pub async fn download_with_post(
        &self,
        url: &str,
        body: &Value,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<DownloadResult> {
        let request = self.build_request(HttpMethod::Post, url, config)?;
        let request = self.encode_body(request, body)?;

        let destination = std::env::temp_dir().join(format!("download-{}", uuid::Uuid::new_v4()));
        self.stream_to_file(request, &destination, token).await
    }

    /// Buffered GET returning the entire body base64-encoded.
    ///
    /// The whole payload is accumulated in memory; callers are responsible
    /// for only using this for small payloads.
    #[instrument(skip(self, config, token), fields(url = %url))]
    pub async fn download_base64(
        &self,
        url: &str,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<String> {
        let request = self.build_request(HttpMethod::Get, url, config)?;
        let response = run_until_cancelled(token, self.execute_checked(request)).await?;
        let response = self.finish_response(response, config)?;

        if !response.is_success() {
            return Err(ClientError::Network(format!(
                "download endpoint returned {}",
                response.status
            )));
        }

        Ok(BASE64.encode(&response.body))
    }

    async fn stream_to_file(
        &self,
        request: HttpRequest,
        destination: &Path,
        token: &CancellationToken,
    ) -> Result<DownloadResult> {
        let transfer = async {
            let mut reader = self.transport.fetch_stream(request).await?;
            let mut file = tokio::fs::File::create(destination).await?;
            let bytes_written = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            Ok(bytes_written)
        };

        match run_until_cancelled(token, transfer).await {
            Ok(bytes_written) => {
                debug!(bytes_written, "Download complete");
                Ok(DownloadResult {
                    destination: destination.to_path_buf(),
                    bytes_written,
                })
            }
            Err(err) => {
                // Partial files are deleted, not left behind marked incomplete.
                if let Err(cleanup) = tokio::fs::remove_file(destination).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(error = %cleanup, "Failed to remove partial download");
                    }
                }
                Err(err)
            }
        }
    }
}
