use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::framer::{encode_command, DelimiterFramer, Frame, FrameConfig};

/// `tokio_util` codec for delimiter-terminated frames.
///
/// Decodes inbound bytes into [`Frame`]s and encodes outbound commands
/// (`&str`, `&[u8]` or `String`) with the trailing delimiter.
#[derive(Debug, Clone, Default)]
pub struct DelimiterCodec {
    framer: DelimiterFramer,
}

impl DelimiterCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            framer: DelimiterFramer::with_config(config),
        }
    }
}

impl Decoder for DelimiterCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        Ok(self.framer.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.framer.decode(src) {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let buffered = src.len();
        src.clear();
        self.framer.reset();
        Err(FrameError::ConnectionClosed { buffered })
    }
}

impl Encoder<&[u8]> for DelimiterCodec {
    type Error = FrameError;

    fn encode(&mut self, command: &[u8], dst: &mut BytesMut) -> Result<()> {
        trace!(command = %String::from_utf8_lossy(command), "encoding command");
        encode_command(command, dst);
        Ok(())
    }
}

impl Encoder<&str> for DelimiterCodec {
    type Error = FrameError;

    fn encode(&mut self, command: &str, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&[u8]>::encode(self, command.as_bytes(), dst)
    }
}

impl Encoder<String> for DelimiterCodec {
    type Error = FrameError;

    fn encode(&mut self, command: String, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&[u8]>::encode(self, command.as_bytes(), dst)
    }
}
