//! Public client facade composing configuration, session, registry, crypto,
//! and transport.

use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use bridge_traits::http::HttpTransport;

use crate::config::ClientConfig;
use crate::crypto::CryptoCodec;
use crate::error::{ClientError, Result};
use crate::executor::HttpExecutor;
use crate::registry::{run_until_cancelled, RequestKind, RequestRegistry};
use crate::session::{Authenticator, Credentials, SessionStore, SessionToken};
use crate::types::{ClientResponse, DownloadResult, RequestConfig, UploadBody};

/// Everything derived from a successful `initialize`.
struct ClientState {
    config: ClientConfig,
    executor: HttpExecutor,
    authenticator: Authenticator,
}

/// Public entry point for the authenticated HTTP client.
///
/// Each instance owns its configuration, session, and in-flight request
/// table, so multiple clients coexist without shared ambient state. Every
/// network operation takes a caller-chosen `request_id` used for
/// correlation and cancellation; ids are unique only while in flight.
///
/// All operations other than [`initialize`](Self::initialize) fail with
/// `NotInitialized` until the client is configured.
pub struct AuthClient {
    transport: Arc<dyn HttpTransport>,
    registry: Arc<RequestRegistry>,
    session: Arc<SessionStore>,
    state: RwLock<Option<Arc<ClientState>>>,
}

impl AuthClient {
    /// Create a client over the given transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            registry: Arc::new(RequestRegistry::new()),
            session: Arc::new(SessionStore::new()),
            state: RwLock::new(None),
        }
    }

    /// Create a client over the default desktop transport.
    #[cfg(feature = "desktop-shims")]
    pub fn with_default_transport() -> Self {
        Self::new(Arc::new(bridge_desktop::ReqwestHttpTransport::new()))
    }

    /// Configure the client.
    ///
    /// Idempotent for an identical configuration; a differing configuration
    /// after the first call fails with `AlreadyInitialized` (the client does
    /// not support reconfiguration). Local and synchronous: `request_id` is
    /// a correlation field only and does not occupy the request table.
    #[instrument(skip(self, config), fields(request_id = %request_id))]
    pub fn initialize(&self, config: ClientConfig, request_id: &str) -> Result<()> {
        let base_url = config.validate()?;

        let mut state = self.state.write();
        if let Some(existing) = state.as_ref() {
            if existing.config == config {
                debug!("Client re-initialized with identical configuration");
                return Ok(());
            }
            return Err(ClientError::AlreadyInitialized);
        }

        let codec = if config.is_encryption_required {
            config.pass_phrase.as_deref().map(CryptoCodec::new)
        } else {
            None
        };

        let executor = HttpExecutor::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            base_url,
            config.client_id.clone(),
            codec,
        );
        let authenticator = Authenticator::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            config.client_id.clone(),
        );

        info!(
            base_url = %config.base_url,
            encrypted = config.is_encryption_required,
            "Client initialized"
        );
        *state = Some(Arc::new(ClientState {
            config,
            executor,
            authenticator,
        }));
        Ok(())
    }

    /// Snapshot of the configuration supplied at initialization.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub fn client_init_info(&self, request_id: &str) -> Result<ClientConfig> {
        Ok(self.state()?.config.clone())
    }

    /// Authenticate with username and password, installing the session.
    #[instrument(skip(self, password), fields(request_id = %request_id))]
    pub async fn authenticate(
        &self,
        url: &str,
        username: &str,
        password: &str,
        request_id: &str,
    ) -> Result<SessionToken> {
        let state = self.state()?;
        let url = state.executor.resolve_url(url, &RequestConfig::default())?;
        let guard = self.registry.register(request_id, RequestKind::Auth)?;
        let credentials = Credentials::Password {
            username: username.to_string(),
            password: password.to_string(),
        };
        run_until_cancelled(
            guard.token(),
            state.authenticator.authenticate(url.as_str(), credentials),
        )
        .await
    }

    /// Authenticate with a federated identity token; same contract as
    /// [`authenticate`](Self::authenticate).
    #[instrument(skip(self, id_token), fields(request_id = %request_id))]
    pub async fn google_authenticate(
        &self,
        url: &str,
        username: &str,
        id_token: &str,
        request_id: &str,
    ) -> Result<SessionToken> {
        let state = self.state()?;
        let url = state.executor.resolve_url(url, &RequestConfig::default())?;
        let guard = self.registry.register(request_id, RequestKind::Auth)?;
        let credentials = Credentials::Federated {
            username: username.to_string(),
            id_token: id_token.to_string(),
        };
        run_until_cancelled(
            guard.token(),
            state.authenticator.authenticate(url.as_str(), credentials),
        )
        .await
    }

    /// Invalidate the session and notify the remote endpoint.
    ///
    /// The local session is cleared even when the remote notification
    /// fails; the failure is reported but never resurrects the session.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn logout(&self, url: &str, request_id: &str) -> Result<()> {
        let state = self.state()?;
        let url = state.executor.resolve_url(url, &RequestConfig::default())?;
        let guard = self.registry.register(request_id, RequestKind::Logout)?;
        run_until_cancelled(guard.token(), state.authenticator.logout(url.as_str())).await
    }

    /// Execute a GET request.
    #[instrument(skip(self, config), fields(request_id = %request_id))]
    pub async fn execute_get(
        &self,
        url: &str,
        config: RequestConfig,
        request_id: &str,
    ) -> Result<ClientResponse> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Get)?;
        state.executor.get(url, &config, guard.token()).await
    }

    /// Execute a POST request with a JSON body.
    #[instrument(skip(self, body, config), fields(request_id = %request_id))]
    pub async fn execute_post(
        &self,
        url: &str,
        body: Value,
        config: RequestConfig,
        request_id: &str,
    ) -> Result<ClientResponse> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Post)?;
        state.executor.post(url, &body, &config, guard.token()).await
    }

    /// Stream the file described by `body` to the server.
    #[instrument(skip(self, body), fields(request_id = %request_id))]
    pub async fn upload_file(
        &self,
        url: &str,
        body: UploadBody,
        request_id: &str,
    ) -> Result<ClientResponse> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Upload)?;
        state.executor.upload(url, &body, guard.token()).await
    }

    /// Stream a response body to `destination`.
    ///
    /// On failure or cancellation the partially written destination is
    /// deleted.
    #[instrument(skip(self, body, config, destination), fields(request_id = %request_id))]
    pub async fn download_file(
        &self,
        url: &str,
        body: Option<Value>,
        config: RequestConfig,
        destination: impl AsRef<Path>,
        request_id: &str,
    ) -> Result<DownloadResult> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Download)?;
        state
            .executor
            .download(url, body.as_ref(), &config, destination.as_ref(), guard.token())
            .await
    }

    /// Download a response fully into memory and return it base64-encoded.
    #[instrument(skip(self, config), fields(request_id = %request_id))]
    pub async fn download_file_in_base64(
        &self,
        url: &str,
        config: RequestConfig,
        request_id: &str,
    ) -> Result<String> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Download)?;
        state
            .executor
            .download_base64(url, &config, guard.token())
            .await
    }

    /// Download initiated via a POST body; the result names the temp file
    /// the body was written to.
    #[instrument(skip(self, body, config), fields(request_id = %request_id))]
    pub async fn download_file_with_post(
        &self,
        url: &str,
        body: Value,
        config: RequestConfig,
        request_id: &str,
    ) -> Result<DownloadResult> {
        let state = self.state()?;
        let guard = self.registry.register(request_id, RequestKind::Download)?;
        state
            .executor
            .download_with_post(url, &body, &config, guard.token())
            .await
    }

    /// Cancel a single in-flight request; unknown or completed ids are a
    /// no-op.
    pub fn cancel_request(&self, request_id: &str) {
        self.registry.cancel(request_id);
    }

    /// Cancel every in-flight request. Requests registered after this call
    /// begins are unaffected.
    pub fn cancel_all_requests(&self) {
        self.registry.cancel_all();
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }

    /// Whether a valid session is currently active.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    fn state(&self) -> Result<Arc<ClientState>> {
        self.state
            .read()
            .as_ref()
            .cloned()
            .ok_or(ClientError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{ByteStream, FilePart, HttpRequest, HttpResponse};

    struct UnusedTransport;

    #[async_trait]
    impl HttpTransport for UnusedTransport {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::Transport("unused".to_string()))
        }

        async fn upload(
            &self,
            _request: HttpRequest,
            _part: FilePart,
        ) -> BridgeResult<HttpResponse> {
            Err(BridgeError::Transport("unused".to_string()))
        }

        async fn fetch_stream(&self, _request: HttpRequest) -> BridgeResult<ByteStream> {
            Err(BridgeError::Transport("unused".to_string()))
        }
    }

    fn client() -> AuthClient {
        AuthClient::new(Arc::new(UnusedTransport))
    }

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "https://api.example.com".to_string(),
            is_encryption_required: false,
            client_id: "client-1".to_string(),
            pass_phrase: None,
        }
    }

    #[test]
    fn test_initialize_then_info_returns_same_config() {
        let client = client();
        client.initialize(config(), "req-1").unwrap();
        assert_eq!(client.client_init_info("req-2").unwrap(), config());
    }

    #[test]
    fn test_info_before_initialize_fails() {
        assert!(matches!(
            client().client_init_info("req-1"),
            Err(ClientError::NotInitialized)
        ));
    }

    #[test]
    fn test_reinitialize_identical_is_idempotent() {
        let client = client();
        client.initialize(config(), "req-1").unwrap();
        client.initialize(config(), "req-2").unwrap();
    }

    #[test]
    fn test_reinitialize_differing_fails() {
        let client = client();
        client.initialize(config(), "req-1").unwrap();

        let differing = ClientConfig {
            base_url: "https://other.example.com".to_string(),
            ..config()
        };
        assert!(matches!(
            client.initialize(differing, "req-2"),
            Err(ClientError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_first_initialize_never_already_initialized() {
        // A bad config is InvalidConfig, not AlreadyInitialized
        let client = client();
        let bad = ClientConfig {
            base_url: "nope".to_string(),
            ..config()
        };
        assert!(matches!(
            client.initialize(bad, "req-1"),
            Err(ClientError::InvalidConfig(_))
        ));
        // And the client stays uninitialized
        assert!(matches!(
            client.client_init_info("req-2"),
            Err(ClientError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let client = client();
        assert!(matches!(
            client
                .execute_get("https://api.example.com/data", RequestConfig::default(), "req-1")
                .await,
            Err(ClientError::NotInitialized)
        ));
        assert!(matches!(
            client.authenticate("https://a", "u", "p", "req-2").await,
            Err(ClientError::NotInitialized)
        ));
    }

    #[test]
    fn test_cancel_unknown_request_is_noop() {
        let client = client();
        client.cancel_request("missing");
        client.cancel_all_requests();
        assert_eq!(client.in_flight(), 0);
    }
}
