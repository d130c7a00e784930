use std::time::Duration;

use nextion_message::ResponseCode;

use crate::state::ConnectionState;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session cannot accept requests in its current state.
    #[error("session not ready (state: {state})")]
    NotReady { state: ConnectionState },

    /// No Response arrived within the request window. The session remains usable.
    #[error("request '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The link failed or closed; fatal to the session.
    #[error("link failed: {reason}")]
    Link { reason: String },

    /// A device-setup command failed during binding.
    #[error("device configuration failed at '{command}': {reason}")]
    Configuration { command: String, reason: String },

    /// The device answered a value query with an error Response.
    #[error("'{command}' rejected by device: {code}")]
    Rejected { command: String, code: ResponseCode },

    /// A caller-supplied argument was rejected before anything was written.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Frame-level error on the write path.
    #[error("frame error: {0}")]
    Frame(#[from] nextion_frame::FrameError),

    /// Failed to establish the link.
    #[error("transport error: {0}")]
    Transport(#[from] nextion_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
