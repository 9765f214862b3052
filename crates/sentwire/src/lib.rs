//! SENT (SAE J2716) telemetry decoding for the Mach Systems interface box.
//!
//! sentwire reads the interface box's byte stream over serial or TCP, splits it
//! into envelope frames, and decodes the SENT fast/slow channel messages of the
//! i2s Dresden #803405 pressure sensor.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial and TCP byte sources
//! - [`frame`]: STX/ETX envelope framing, start/stop commands
//! - [`decode`]: typed records, sensor semantics, identity correlation

/// Re-export transport types.
pub mod transport {
    pub use sentwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sentwire_frame::*;
}

/// Re-export decode types.
pub mod decode {
    pub use sentwire_decode::*;
}
