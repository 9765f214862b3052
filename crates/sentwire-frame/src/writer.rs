use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::encode_frame;
use crate::error::{FrameError, Result};
use crate::message::{message_name, ChannelSelect, SENT_START, SENT_STOP};

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Writes envelope frames (host commands) to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send one frame (blocking).
    pub fn send(&mut self, message_id: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(message_id, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        debug!(
            message = message_name(message_id),
            len = payload.len(),
            "frame sent"
        );
        self.flush()
    }

    /// Ask the interface box to start SENT reception.
    pub fn send_start(&mut self, channel: ChannelSelect) -> Result<()> {
        self.send(SENT_START, &[channel.as_byte()])
    }

    /// Ask the interface box to stop SENT reception.
    pub fn send_stop(&mut self, channel: ChannelSelect) -> Result<()> {
        self.send(SENT_STOP, &[channel.as_byte()])
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
