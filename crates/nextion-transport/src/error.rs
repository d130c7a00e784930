/// Errors that can occur while establishing or using a link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint '{0}' (expected tcp://HOST:PORT or unix:PATH)")]
    InvalidEndpoint(String),

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
