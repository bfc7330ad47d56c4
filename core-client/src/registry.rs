//! In-flight request tracking and cooperative cancellation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ClientError, Result};

/// The kind of operation a request handle tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Post,
    Upload,
    Download,
    Auth,
    Logout,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Get => "get",
            RequestKind::Post => "post",
            RequestKind::Upload => "upload",
            RequestKind::Download => "download",
            RequestKind::Auth => "auth",
            RequestKind::Logout => "logout",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
struct RequestHandle {
    kind: RequestKind,
    seq: u64,
    token: CancellationToken,
}

/// Tracks in-flight operations by caller-supplied request identifier.
///
/// Identifier uniqueness is scoped to "currently in flight": an id may be
/// reused once its previous handle has been removed. Entries are removed on
/// every terminal outcome through the RAII [`InFlightGuard`], so the table
/// never leaks.
#[derive(Debug)]
pub struct RequestRegistry {
    entries: Mutex<HashMap<String, RequestHandle>>,
    next_seq: AtomicU64,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register an operation under `request_id`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRequestId` if the id is still in flight.
    pub fn register(self: &Arc<Self>, request_id: &str, kind: RequestKind) -> Result<InFlightGuard> {
        let mut entries = self.entries.lock();
        if entries.contains_key(request_id) {
            return Err(ClientError::DuplicateRequestId(request_id.to_string()));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        entries.insert(
            request_id.to_string(),
            RequestHandle {
                kind,
                seq,
                token: token.clone(),
            },
        );
        debug!(request_id, kind = %kind, "Registered in-flight request");

        Ok(InFlightGuard {
            registry: Arc::clone(self),
            request_id: request_id.to_string(),
            seq,
            token,
        })
    }

    /// Cancel a single request.
    ///
    /// Unknown or already-completed ids are a no-op, never an error.
    pub fn cancel(&self, request_id: &str) {
        let handle = self.entries.lock().remove(request_id);
        if let Some(handle) = handle {
            debug!(request_id, kind = %handle.kind, "Cancelling request");
            handle.token.cancel();
        }
    }

    /// Cancel every currently tracked request.
    ///
    /// Registrations racing in after the sweep starts are unaffected.
    pub fn cancel_all(&self) {
        let drained: Vec<(String, RequestHandle)> = self.entries.lock().drain().collect();
        for (request_id, handle) in drained {
            debug!(request_id = %request_id, kind = %handle.kind, "Cancelling request");
            handle.token.cancel();
        }
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight() == 0
    }

    /// Remove an entry, but only if it still belongs to the guard that is
    /// releasing it. A cancelled id may have been reused by a newer
    /// registration; the stale guard must not evict that one.
    fn release(&self, request_id: &str, seq: u64) {
        let mut entries = self.entries.lock();
        if entries.get(request_id).map(|h| h.seq) == Some(seq) {
            entries.remove(request_id);
        }
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle for a registered request; deregisters on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<RequestRegistry>,
    request_id: String,
    seq: u64,
    token: CancellationToken,
}

impl InFlightGuard {
    /// Token signalled when this request is cancelled.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.request_id, self.seq);
    }
}

/// Run `operation` until it resolves or `token` fires, whichever happens
/// first.
///
/// Cancellation past the point of no return (the future already resolved)
/// delivers the original result.
pub async fn run_until_cancelled<T, F>(token: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(ClientError::Cancelled),
        result = operation => result,
    }
}
