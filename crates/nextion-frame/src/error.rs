/// Errors that can occur while reading or writing frames.
///
/// An incomplete frame is not an error: the framer simply reports that more
/// bytes are needed.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended while a partial frame was still buffered.
    #[error("connection closed ({buffered} bytes of an incomplete frame buffered)")]
    ConnectionClosed { buffered: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
