//! Interface box message ids.
//!
//! Reception and error ids flow from the box to the host. Start and stop
//! are host commands and share the same envelope.

use bytes::{Bytes, BytesMut};

use crate::codec::{put_frame, HEADER_SIZE, TRAILER_SIZE};

/// Fast-channel SENT message received.
pub const FAST_RECEPTION: u8 = 0x95;

/// Slow-channel (serial) SENT message received.
pub const SLOW_RECEPTION: u8 = 0x96;

/// Fast-channel reception error.
pub const FAST_ERROR: u8 = 0x97;

/// Slow-channel reception error.
pub const SLOW_ERROR: u8 = 0x98;

/// Start SENT reception on a channel.
pub const SENT_START: u8 = 0x74;

/// Stop SENT reception on a channel.
pub const SENT_STOP: u8 = 0x75;

/// Channel byte addressing every channel at once.
pub const ALL_CHANNELS: u8 = 0xFF;

/// Returns a human-readable name for a message id.
pub fn message_name(id: u8) -> &'static str {
    match id {
        FAST_RECEPTION => "fast_rx",
        SLOW_RECEPTION => "slow_rx",
        FAST_ERROR => "fast_error",
        SLOW_ERROR => "slow_error",
        SENT_START => "sent_start",
        SENT_STOP => "sent_stop",
        _ => "other",
    }
}

/// Which channel a start/stop command targets.
///
/// Channels are 0-based on the wire even where vendor tools show 1..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelect {
    One(u8),
    All,
}

impl ChannelSelect {
    /// The channel byte sent in the command payload.
    pub fn as_byte(self) -> u8 {
        match self {
            ChannelSelect::One(ch) => ch,
            ChannelSelect::All => ALL_CHANNELS,
        }
    }
}

/// Encoded SENT_START command.
pub fn start_command(channel: ChannelSelect) -> Bytes {
    command(SENT_START, channel)
}

/// Encoded SENT_STOP command.
pub fn stop_command(channel: ChannelSelect) -> Bytes {
    command(SENT_STOP, channel)
}

fn command(message_id: u8, channel: ChannelSelect) -> Bytes {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + 1 + TRAILER_SIZE);
    put_frame(message_id, &[channel.as_byte()], &mut dst);
    dst.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(message_name(FAST_RECEPTION), "fast_rx");
        assert_eq!(message_name(SLOW_ERROR), "slow_error");
        assert_eq!(message_name(0x42), "other");
    }

    #[test]
    fn start_single_channel() {
        let wire = start_command(ChannelSelect::One(2));
        assert_eq!(wire.as_ref(), &[0x02, SENT_START, 0x01, 0x00, 0x02, 0x77, 0x03]);
    }

    #[test]
    fn stop_all_channels() {
        let wire = stop_command(ChannelSelect::All);
        // 0x75 + 1 + 0 + 0xFF = 0x175 -> 0x75
        assert_eq!(wire.as_ref(), &[0x02, SENT_STOP, 0x01, 0x00, 0xFF, 0x75, 0x03]);
    }
}
