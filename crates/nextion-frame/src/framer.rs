use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

/// Terminator of every message in both directions.
pub const DELIMITER: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Default cap on buffered frame content: 64 KiB.
///
/// Real device frames are a few bytes (string replies are the longest);
/// anything past this is line noise or a desynchronised stream.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// One inbound message with the delimiter stripped.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Create a frame from raw (already delimiter-stripped) bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// The leading code byte, if the frame is not empty.
    pub fn code(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Bytes following the code byte.
    pub fn payload(&self) -> &[u8] {
        self.data.get(1..).unwrap_or_default()
    }

    /// The whole frame, code byte included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame(")?;
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Configuration for frame reading.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum buffered frame content in bytes. Default: 64 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Incremental delimiter scanner.
///
/// Holds only scan state; the accumulation buffer belongs to the caller so
/// the same framer drives a blocking reader, a `tokio_util` codec, or a
/// hand-fed `BytesMut`. Bytes are examined once each no matter how the
/// input was chunked.
#[derive(Debug, Clone)]
pub struct DelimiterFramer {
    /// Bytes of `src` already examined.
    scanned: usize,
    /// Consecutive delimiter bytes at the tail of the scanned region.
    matched: usize,
    /// The current frame outgrew `max_frame_size`; drop it at the next delimiter.
    overflowed: bool,
    max_frame_size: usize,
}

impl Default for DelimiterFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimiterFramer {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            scanned: 0,
            matched: 0,
            overflowed: false,
            max_frame_size: config.max_frame_size,
        }
    }

    /// Decode the next frame from `src`.
    ///
    /// Returns `None` if `src` doesn't contain a complete frame yet. On
    /// success, consumes the frame and its delimiter from `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Option<Frame> {
        while self.scanned < src.len() {
            let byte = src[self.scanned];
            self.scanned += 1;
            self.matched = advance(self.matched, byte);

            if self.matched == DELIMITER.len() {
                let mut data = src.split_to(self.scanned);
                data.truncate(data.len() - DELIMITER.len());
                self.scanned = 0;
                self.matched = 0;

                if std::mem::take(&mut self.overflowed) {
                    warn!(
                        tail = data.len(),
                        "dropped oversized frame; resynchronised at delimiter"
                    );
                    continue;
                }

                trace!(frame = ?data.as_ref(), "parsed frame");
                return Some(Frame::new(data.freeze()));
            }

            let content = self.scanned - self.matched;
            if content > self.max_frame_size {
                // Keep any partial delimiter; it may complete with the next byte.
                src.advance(content);
                self.scanned = self.matched;
                if !self.overflowed {
                    warn!(max = self.max_frame_size, "frame exceeds maximum size");
                    self.overflowed = true;
                }
            }
        }
        None
    }

    /// Iterate over every complete frame currently in `src`.
    pub fn frames<'a>(&'a mut self, src: &'a mut BytesMut) -> Frames<'a> {
        Frames { framer: self, src }
    }

    /// Forget all scan state. The caller must clear its buffer as well.
    pub fn reset(&mut self) {
        self.scanned = 0;
        self.matched = 0;
        self.overflowed = false;
    }

    /// Number of consecutive delimiter bytes seen at the end of the buffer.
    pub fn partial_delimiter(&self) -> usize {
        self.matched
    }
}

/// Frames available in a buffer; see [`DelimiterFramer::frames`].
pub struct Frames<'a> {
    framer: &'a mut DelimiterFramer,
    src: &'a mut BytesMut,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.framer.decode(self.src)
    }
}

fn advance(matched: usize, byte: u8) -> usize {
    if byte == DELIMITER[matched] {
        matched + 1
    } else if byte == DELIMITER[0] {
        1
    } else {
        0
    }
}

/// Encode an outbound command: the raw command bytes followed by the delimiter.
///
/// Commands are ASCII text, so they can never contain `0xFF` themselves.
pub fn encode_command(command: &[u8], dst: &mut BytesMut) {
    dst.reserve(command.len() + DELIMITER.len());
    dst.put_slice(command);
    dst.put_slice(&DELIMITER);
}
