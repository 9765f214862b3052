use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::codec::EnvelopeFrame;
use crate::error::{FrameError, Result};
use crate::framer::{EnvelopeFramer, FramerConfig};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete envelope frames from any `Read` stream.
///
/// Used for capture files and other finite sources. Handles partial reads
/// internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    framer: EnvelopeFramer,
    pending: VecDeque<EnvelopeFrame>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, &FramerConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: &FramerConfig) -> Self {
        Self {
            inner,
            framer: EnvelopeFramer::with_config(config),
            pending: VecDeque::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` at end of stream. Trailing bytes that never formed
    /// a complete frame are dropped.
    pub fn read_frame(&mut self) -> Result<Option<EnvelopeFrame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.framer.buffered() > 0 {
                    debug!(
                        bytes = self.framer.buffered(),
                        "end of stream inside an incomplete frame"
                    );
                }
                return Ok(None);
            }

            self.pending.extend(self.framer.feed(&chunk[..read]));
        }
    }

    /// The framer driving this reader, for resync statistics.
    pub fn framer(&self) -> &EnvelopeFramer {
        &self.framer
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
    type Item = Result<EnvelopeFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(0x95, b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap().unwrap();

        assert_eq!(frame.message_id, 0x95);
        assert_eq!(frame.payload.as_ref(), b"hello");
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(0x95, b"one", &mut wire).unwrap();
        encode_frame(0x96, b"two", &mut wire).unwrap();
        encode_frame(0x97, b"three", &mut wire).unwrap();

        let reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frames: Vec<EnvelopeFrame> = reader.map(|f| f.unwrap()).collect();

        let ids: Vec<u8> = frames.iter().map(|f| f.message_id).collect();
        assert_eq!(ids, vec![0x95, 0x96, 0x97]);
        assert_eq!(frames[2].payload.as_ref(), b"three");
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_frame(0x96, b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.message_id, 0x96);
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn eof_mid_frame_yields_none() {
        let mut wire = BytesMut::new();
        encode_frame(0x96, b"truncated", &mut wire).unwrap();
        wire.truncate(wire.len() - 3);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert!(reader.read_frame().unwrap().is_none());
        assert!(reader.framer().buffered() > 0);
    }

    #[test]
    fn empty_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(0x98, &[0x00, 0x20], &mut wire).unwrap();

        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire.to_vec()),
        });
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.message_id, 0x98);
    }

    #[test]
    fn io_error_propagates() {
        let mut reader = FrameReader::new(FailingReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn accessors_and_into_inner() {
        let reader = FrameReader::new(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(reader.get_ref().get_ref().len(), 3);
        let inner = reader.into_inner();
        assert_eq!(inner.into_inner(), vec![1, 2, 3]);
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

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
