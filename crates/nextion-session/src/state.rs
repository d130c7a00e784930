use std::fmt;

use nextion_message::Response;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable link. Terminal for a given session.
    Disconnected,
    /// Link established; device configuration in progress.
    Binding,
    /// Configured and accepting requests.
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Binding => "binding",
            ConnectionState::Ready => "ready",
        })
    }
}

/// Lifecycle notification published to every [`Session::notices`](crate::Session::notices) receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Device configured; requests are accepted.
    Ready,
    /// The link is gone; pending requests were failed.
    Disconnected { reason: String },
    /// A non-fatal problem on the inbound path, or the fatal error preceding `Disconnected`.
    Error { message: String },
    /// A Response arrived with no written request waiting for it and was discarded.
    UnmatchedResponse(Response),
}
