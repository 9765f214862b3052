//! Byte-stream transports for the SENT interface box.
//!
//! The interface box is reachable either over a serial port or over TCP.
//! Both implement [`ByteSource`], which delivers whatever bytes are available
//! (possibly none), and [`std::io::Write`] for outbound command frames.
//!
//! This is the lowest layer of sentwire. Framing and decoding live in
//! `sentwire-frame` and `sentwire-decode` and never touch a transport directly.

pub mod error;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialTransport};
pub use tcp::{parse_endpoint, TcpConfig, TcpTransport, DEFAULT_TCP_PORT};
pub use traits::ByteSource;
