/// Why a payload could not be decoded as its declared message kind.
///
/// Carried inside the record of that kind; never aborts the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Fewer bytes than the fixed part of the layout.
    #[error("payload too short ({len} bytes, need at least {min})")]
    TooShort { len: usize, min: usize },

    /// The nibble count implies more data bytes than the payload holds.
    #[error("payload length mismatch ({len} bytes, nibble count needs {expected})")]
    LengthMismatch { len: usize, expected: usize },
}
