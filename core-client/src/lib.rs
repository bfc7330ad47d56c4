//! # Auth Client Core
//!
//! Cancellable, per-request-tracked authenticated HTTP client with optional
//! payload encryption.
//!
//! ## Overview
//!
//! This crate is the core behind a host-facing client bridge: the host
//! supplies a caller-chosen request identifier with every operation and can
//! cancel any operation (or all of them) by that identifier while it is in
//! flight. The client holds at most one authenticated session at a time and
//! attaches it to every subsequent call.
//!
//! ## Components
//!
//! - [`AuthClient`] - public facade enforcing initialize-before-use
//! - [`session`] - session token state and credential exchange
//! - [`registry`] - in-flight request table with cooperative cancellation
//! - [`executor`] - request assembly and buffered/streaming execution
//! - [`crypto`] - AES-256-GCM payload codec keyed by the client pass phrase
//!
//! ## Usage
//!
//! ```ignore
//! use core_client::{AuthClient, ClientConfig};
//!
//! let client = AuthClient::with_default_transport();
//! client.initialize(ClientConfig {
//!     base_url: "https://api.example.com".into(),
//!     is_encryption_required: false,
//!     client_id: "client-1".into(),
//!     pass_phrase: None,
//! }, "req-1")?;
//!
//! let token = client.authenticate("/auth", "user", "pass", "req-2").await?;
//! let response = client.execute_get("/data", Default::default(), "req-3").await?;
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod executor;
pub mod logging;
pub mod registry;
pub mod session;
pub mod types;

pub use client::AuthClient;
pub use config::ClientConfig;
pub use crypto::CryptoCodec;
pub use error::{ClientError, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use registry::{RequestKind, RequestRegistry};
pub use session::{Credentials, SessionStore, SessionToken};
pub use types::{ClientResponse, DownloadResult, RequestConfig, ResponseType, UploadBody};
