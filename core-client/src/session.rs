//! Session state and credential exchange.
//!
//! A client holds at most one active session. The session token is shared,
//! mutably, across every in-flight operation: logout clears it immediately,
//! but operations that already captured the old token are best-effort and
//! may still complete against it.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpTransport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{ClientError, Result};
use crate::types::{CLIENT_ID_HEADER, DEFAULT_TIMEOUT};

/// Opaque session token issued by the authentication endpoint.
///
/// # Security
///
/// The token value must never be logged; the `Debug` implementation
/// redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionToken {
    value: String,
    established_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn new(value: String, expires_in: Option<i64>) -> Self {
        let established_at = Utc::now();
        Self {
            value,
            established_at,
            expires_at: expires_in.map(|seconds| established_at + chrono::Duration::seconds(seconds)),
        }
    }

    /// The raw token value, attached to authorized calls as a bearer token.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is still valid. Tokens without an expiry never
    /// expire locally; the server remains the authority.
    pub fn is_valid(&self) -> bool {
        self.expires_at.map_or(true, |at| Utc::now() < at)
    }
}

// Custom Debug implementation to avoid logging the token
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"[REDACTED]")
            .field("established_at", &self.established_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credential kinds accepted by the authentication endpoints.
///
/// Serialized camelCase as the JSON body of the credential-exchange POST.
#[derive(Clone, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Username and password
    Password { username: String, password: String },
    /// Username and a federated identity token
    #[serde(rename_all = "camelCase")]
    Federated { username: String, id_token: String },
}

// Custom Debug implementation to avoid logging secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Federated { username, .. } => f
                .debug_struct("Federated")
                .field("username", username)
                .field("id_token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Shared holder of the current session token.
#[derive(Default)]
pub struct SessionStore {
    current: RwLock<Option<SessionToken>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new session, replacing any previous one.
    pub fn set(&self, token: SessionToken) {
        *self.current.write() = Some(token);
    }

    /// Drop the current session. Returns whether one existed.
    pub fn clear(&self) -> bool {
        self.current.write().take().is_some()
    }

    /// Snapshot of the current session token.
    pub fn current(&self) -> Option<SessionToken> {
        self.current.read().clone()
    }

    /// Whether a valid session is active.
    pub fn is_authenticated(&self) -> bool {
        self.current.read().as_ref().map_or(false, |t| t.is_valid())
    }
}

/// Token response from the authentication endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(alias = "accessToken", alias = "access_token", alias = "sessionToken")]
    token: String,
    #[serde(default, alias = "expires_in")]
    expires_in: Option<i64>,
}

/// Performs credential exchange and logout against remote auth endpoints.
pub struct Authenticator {
    transport: Arc<dyn HttpTransport>,
    store: Arc<SessionStore>,
    client_id: String,
}

impl Authenticator {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<SessionStore>,
        client_id: String,
    ) -> Self {
        Self {
            transport,
            store,
            client_id,
        }
    }

    /// Exchange credentials for a session token and install it.
    ///
    /// # Errors
    ///
    /// - `AuthRejected` with the status code on a 4xx/5xx response
    /// - `Network`/`Timeout` on transport failure
    #[instrument(skip(self, credentials), fields(url = %url))]
    pub async fn authenticate(&self, url: &str, credentials: Credentials) -> Result<SessionToken> {
        let request = HttpRequest::new(HttpMethod::Post, url)
            .header(CLIENT_ID_HEADER, self.client_id.clone())
            .json(&credentials)?
            .timeout(DEFAULT_TIMEOUT);

        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Credential exchange rejected");
            return Err(ClientError::AuthRejected {
                status: response.status,
            });
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| ClientError::Network(format!("malformed token response: {}", e)))?;

        let token = SessionToken::new(token_response.token, token_response.expires_in);
        self.store.set(token.clone());
        debug!("Session established");

        Ok(token)
    }

    /// Invalidate the session and notify the remote endpoint.
    ///
    /// The local session is cleared before the remote notification is sent
    /// and stays cleared whatever the remote answers: a notification failure
    /// is reported to the caller but never resurrects the session.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn logout(&self, url: &str) -> Result<()> {
        let previous = self.store.current();
        self.store.clear();

        let mut request = HttpRequest::new(HttpMethod::Post, url)
            .header(CLIENT_ID_HEADER, self.client_id.clone())
            .timeout(DEFAULT_TIMEOUT);
        if let Some(token) = previous {
            request = request.bearer_token(token.value());
        }

        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => {
                debug!("Session terminated");
                Ok(())
            }
            Ok(response) => {
                warn!(
                    status = response.status,
                    "Remote logout rejected; session stays cleared"
                );
                Err(ClientError::Network(format!(
                    "logout endpoint returned {}",
                    response.status
                )))
            }
            Err(e) => {
                warn!(error = %e, "Remote logout notification failed; session stays cleared");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{ByteStream, FilePart, HttpResponse};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    /// Queues canned results and records every request it sees.
    #[derive(Default)]
    struct StubTransport {
        responses: Mutex<VecDeque<BridgeResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl StubTransport {
        fn push_status(&self, status: u16, body: &str) {
            self.responses.lock().push_back(Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            }));
        }

        fn push_error(&self, err: BridgeError) {
            self.responses.lock().push_back(Err(err));
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(BridgeError::Transport("no scripted response".to_string())))
        }

        async fn upload(&self, request: HttpRequest, _part: FilePart) -> BridgeResult<HttpResponse> {
            self.execute(request).await
        }

        async fn fetch_stream(&self, _request: HttpRequest) -> BridgeResult<ByteStream> {
            Err(BridgeError::Transport("not scripted".to_string()))
        }
    }

    fn authenticator(transport: Arc<StubTransport>) -> (Authenticator, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new());
        (
            Authenticator::new(transport, Arc::clone(&store), "client-1".to_string()),
            store,
        )
    }

    fn password_credentials() -> Credentials {
        Credentials::Password {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    #[test]
    fn test_session_store_set_clear() {
        let store = SessionStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_authenticated());

        store.set(SessionToken::new("tok".to_string(), None));
        assert!(store.is_authenticated());
        assert_eq!(store.current().unwrap().value(), "tok");

        assert!(store.clear());
        assert!(!store.clear());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_token_expiry() {
        let fresh = SessionToken::new("tok".to_string(), Some(3600));
        assert!(fresh.is_valid());
        assert!(fresh.expires_at().is_some());

        let expired = SessionToken::new("tok".to_string(), Some(-10));
        assert!(!expired.is_valid());

        let unbounded = SessionToken::new("tok".to_string(), None);
        assert!(unbounded.is_valid());
    }

    #[test]
    fn test_token_debug_redacts_value() {
        let token = SessionToken::new("secret-token".to_string(), None);
        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret-token"));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let debug_str = format!("{:?}", password_credentials());
        assert!(debug_str.contains("user"));
        assert!(!debug_str.contains("pass\""));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_credentials_wire_shape() {
        let password = serde_json::to_value(password_credentials()).unwrap();
        assert_eq!(password["username"], "user");
        assert_eq!(password["password"], "pass");

        let federated = serde_json::to_value(Credentials::Federated {
            username: "user".to_string(),
            id_token: "id-tok".to_string(),
        })
        .unwrap();
        assert_eq!(federated["idToken"], "id-tok");
    }

    #[tokio::test]
    async fn test_authenticate_success_installs_token() {
        let transport = Arc::new(StubTransport::default());
        transport.push_status(200, r#"{"token":"tok-1","expiresIn":3600}"#);
        let (auth, store) = authenticator(Arc::clone(&transport));

        let token = auth
            .authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap();

        assert_eq!(token.value(), "tok-1");
        assert!(store.is_authenticated());

        let seen = transport.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(
            seen[0].headers.get(CLIENT_ID_HEADER),
            Some(&"client-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_authenticate_accepts_access_token_key() {
        let transport = Arc::new(StubTransport::default());
        transport.push_status(200, r#"{"accessToken":"tok-2"}"#);
        let (auth, _store) = authenticator(Arc::clone(&transport));

        let token = auth
            .authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap();
        assert_eq!(token.value(), "tok-2");
    }

    #[tokio::test]
    async fn test_authenticate_rejected_carries_status() {
        let transport = Arc::new(StubTransport::default());
        transport.push_status(401, r#"{"error":"bad credentials"}"#);
        let (auth, store) = authenticator(Arc::clone(&transport));

        let err = auth
            .authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::AuthRejected { status: 401 }));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_transport_failure_is_network() {
        let transport = Arc::new(StubTransport::default());
        transport.push_error(BridgeError::Connect("refused".to_string()));
        let (auth, _store) = authenticator(Arc::clone(&transport));

        let err = auth
            .authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_session_despite_remote_failure() {
        let transport = Arc::new(StubTransport::default());
        transport.push_status(200, r#"{"token":"tok-1"}"#);
        transport.push_error(BridgeError::Transport("reset".to_string()));
        let (auth, store) = authenticator(Arc::clone(&transport));

        auth.authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap();

        let err = auth
            .logout("https://auth.example.com/logout")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert!(!store.is_authenticated(), "session must stay cleared");
    }

    #[tokio::test]
    async fn test_logout_attaches_previous_token() {
        let transport = Arc::new(StubTransport::default());
        transport.push_status(200, r#"{"token":"tok-1"}"#);
        transport.push_status(200, "{}");
        let (auth, store) = authenticator(Arc::clone(&transport));

        auth.authenticate("https://auth.example.com/login", password_credentials())
            .await
            .unwrap();
        auth.logout("https://auth.example.com/logout").await.unwrap();

        let seen = transport.seen();
        assert_eq!(
            seen[1].headers.get("Authorization"),
            Some(&"Bearer tok-1".to_string())
        );
        assert!(store.current().is_none());
    }
}
