//! Decoding of SENT messages relayed by the interface box.
//!
//! Turns envelope payloads into typed records with engineering units:
//! - [`decode`] dispatches on the message id and never fails; malformed
//!   payloads become records that carry a [`PayloadError`]
//! - [`sensor`] holds the #803405-specific transfer functions and tables
//! - [`CorrelationState`] assembles serial number and date code from slow
//!   messages seen over time

pub mod correlation;
pub mod decode;
pub mod error;
pub mod record;
pub mod sensor;

pub use correlation::CorrelationState;
pub use decode::{decode, decode_at, decode_envelope, DecodeOptions, NibbleOrder, TIMESTAMP_LEN};
pub use error::PayloadError;
pub use record::{
    CrcCheck, DecodedRecord, FastError, FastReception, FastSignal, InversionCheck, RecordBody,
    SlowError, SlowFrameType, SlowReception,
};
pub use sensor::{DateCode, PressureState, SlowField, SlowValue};
