use std::io::ErrorKind;

use crate::error::{Result, TransportError};

/// A source of raw bytes from the interface box.
///
/// `read_chunk` returns `Ok(0)` when nothing arrived within the transport's
/// read timeout. Callers treat an empty chunk as "try again", never as EOF.
/// A closed link is reported as [`TransportError::Closed`].
pub trait ByteSource {
    /// Read whatever is available into `buf`.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

/// Map a read result onto the empty-chunk-on-timeout contract.
pub(crate) fn timeout_as_empty(result: std::io::Result<usize>) -> Result<usize> {
    match result {
        Ok(n) => Ok(n),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        Err(err) => Err(TransportError::Io(err)),
    }
}
