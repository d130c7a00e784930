//! Delimiter framing for the Nextion serial protocol.
//!
//! Every message, in both directions, is terminated by the fixed 3-byte
//! sequence `0xFF 0xFF 0xFF`. There is no length prefix and no escaping:
//! a payload that itself contains three consecutive `0xFF` bytes will be
//! split early. That is a property of the wire protocol and is reproduced
//! here as-is.
//!
//! - [`DelimiterFramer`] turns arbitrarily chunked input into frames
//! - [`encode_command`] terminates an outbound command
//! - [`FrameReader`] / [`FrameWriter`] do the same over blocking `std::io`
//! - `DelimiterCodec` (feature `async`) plugs into `tokio_util::codec`

#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::DelimiterCodec;
pub use error::{FrameError, Result};
pub use framer::{
    encode_command, DelimiterFramer, Frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE, DELIMITER,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
