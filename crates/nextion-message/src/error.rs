use bytes::Bytes;

use crate::code::EventCode;

/// Errors that can occur while decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The frame had no code byte.
    #[error("empty frame")]
    Empty,

    /// The leading byte is neither a response nor an event code.
    #[error("unknown code 0x{code:02x} ({} byte frame)", frame.len())]
    UnknownCode { code: u8, frame: Bytes },

    /// The payload is shorter than the event's layout.
    #[error("truncated {event} payload ({actual} bytes, expected {expected})")]
    Truncated {
        event: EventCode,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, MessageError>;
