//! # Host Bridge Traits
//!
//! Transport abstraction the auth client core is built against.
//!
//! ## Overview
//!
//! This crate defines the contract between the client core and
//! platform-specific transport implementations. The core never talks to a
//! concrete HTTP stack; it holds an `Arc<dyn HttpTransport>` and issues
//! [`HttpRequest`](http::HttpRequest)s through it. Each supported host ships
//! its own adapter (desktop uses `bridge-desktop`, mobile hosts inject their
//! platform-native stack).
//!
//! ## Traits
//!
//! - [`HttpTransport`](http::HttpTransport) - buffered execution, streaming
//!   multipart uploads, and streaming downloads over TLS
//!
//! ## Error Handling
//!
//! All transport operations return [`BridgeError`](error::BridgeError).
//! Timeouts and connection failures are distinct variants so the core can
//! map them onto its own taxonomy without string matching.

pub mod error;
pub mod http;

pub use error::{BridgeError, Result};
pub use http::{ByteStream, FilePart, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
