use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::error::{FrameError, Result};
use crate::framer::{DelimiterFramer, Frame, FrameConfig};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    framer: DelimiterFramer,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            framer: DelimiterFramer::with_config(&config),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached;
    /// `buffered` is zero if the stream ended on a frame boundary.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.framer.decode(&mut self.buf) {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed {
                    buffered: self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until a clean EOF; a truncated tail is yielded as an error.
    fn next(&mut self) -> Option<Result<Frame>> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed { buffered: 0 }) => None,
            Err(err) => {
                self.buf.clear();
                self.framer.reset();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::framer::DELIMITER;

    fn wire(frames: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for frame in frames {
            out.extend_from_slice(frame);
            out.extend_from_slice(&DELIMITER);
        }
        out
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[&[0x01]])));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_bytes(), &[0x01]);
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = wire(&[&[0x66, 0x02], &[0x86], b"\x70text"]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().as_bytes(), &[0x66, 0x02]);
        assert_eq!(reader.read_frame().unwrap().as_bytes(), &[0x86]);
        assert_eq!(reader.read_frame().unwrap().as_bytes(), b"\x70text");
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[&[0x65, 0x00, 0x02, 0x01]]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_bytes(), &[0x65, 0x00, 0x02, 0x01]);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed { buffered: 0 }));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x70, b'a', 0xFF, 0xFF]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed { buffered: 4 }));
    }

    #[test]
    fn iterator_stops_at_clean_eof() {
        let reader = FrameReader::new(Cursor::new(wire(&[&[0x88], &[0x01]])));
        let frames: Vec<Frame> = reader.map(|frame| frame.unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), &[0x88]);
    }

    #[test]
    fn iterator_surfaces_truncated_tail() {
        let mut bytes = wire(&[&[0x88]]);
        bytes.extend_from_slice(&[0x01, 0xFF]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(
            reader.next(),
            Some(Err(FrameError::ConnectionClosed { buffered: 2 }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire(&[&[0x01]])),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().as_bytes(), &[0x01]);
    }

    #[test]
    fn accessors_and_into_inner() {
        let reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.get_ref().position(), 0);
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
