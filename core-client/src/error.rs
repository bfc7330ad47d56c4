use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration rejected before any network activity.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("client is not initialized")]
    NotInitialized,

    #[error("client is already initialized with a different configuration")]
    AlreadyInitialized,

    /// The authentication endpoint rejected the supplied credentials.
    #[error("authentication rejected with status {status}")]
    AuthRejected { status: u16 },

    #[error("network failure: {0}")]
    Network(String),

    /// Request ids are unique while in flight; the id may be reused once its
    /// prior operation resolves.
    #[error("request id '{0}' is already in flight")]
    DuplicateRequestId(String),

    #[error("request timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("payload decryption failed")]
    DecryptionFailed,

    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<BridgeError> for ClientError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout => ClientError::Timeout,
            BridgeError::Connect(message) | BridgeError::Transport(message) => {
                ClientError::Network(message)
            }
            BridgeError::Io(e) => ClientError::Io(e),
        }
    }
}
