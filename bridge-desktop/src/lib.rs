//! # Desktop Bridge Implementations
//!
//! Default implementation of the transport bridge for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides a production-ready implementation of
//! `bridge_traits::HttpTransport` using desktop-appropriate libraries:
//! - Buffered and streaming requests via `reqwest` with rustls TLS
//! - Multipart uploads streamed from disk with `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpTransport;
//! use bridge_traits::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = ReqwestHttpTransport::new();
//!     // Hand to the client core as Arc<dyn HttpTransport>
//! }
//! ```

mod http;

pub use http::ReqwestHttpTransport;
