use bytes::BytesMut;
use tracing::debug;

use crate::codec::{next_step, EnvelopeFrame, Step};

/// Configuration for the envelope framer.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Initial receive buffer capacity in bytes. Default: 8 KiB.
    pub initial_capacity: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8 * 1024,
        }
    }
}

/// Incremental envelope framer.
///
/// Feed it chunks as they arrive; it returns every frame completed by that
/// chunk and buffers the rest. Not synchronized: one instance per stream.
#[derive(Debug)]
pub struct EnvelopeFramer {
    buf: BytesMut,
    resyncs: u64,
    skipped: u64,
}

impl EnvelopeFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: &FramerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.initial_capacity),
            resyncs: 0,
            skipped: 0,
        }
    }

    /// Append `chunk` and extract every complete frame, in stream order.
    ///
    /// An empty chunk is valid and only drains what is already buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<EnvelopeFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match next_step(&mut self.buf) {
                Step::Frame(frame) => {
                    debug!(
                        message_id = frame.message_id,
                        len = frame.payload.len(),
                        checksum_ok = frame.checksum_ok,
                        "frame extracted"
                    );
                    frames.push(frame);
                }
                Step::Skipped(n) => self.skipped += n as u64,
                Step::Resync => {
                    self.resyncs += 1;
                    self.skipped += 1;
                }
                Step::Incomplete => break,
            }
        }
        frames
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Number of single-byte resyncs after a missing end marker.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    /// Total bytes discarded as noise or during resync.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }
}

impl Default for EnvelopeFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{build_frame, ETX, STX};

    fn wire(frames: &[(u8, &[u8])]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(id, payload)| build_frame(*id, payload).unwrap().to_vec())
            .collect()
    }

    #[test]
    fn single_frame() {
        let mut framer = EnvelopeFramer::new();
        let frames = framer.feed(&wire(&[(0x95, &[0x00, 0x63, 0x80, 0x0C, 0x05, 0x77])]));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 0x95);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut framer = EnvelopeFramer::new();
        let frames = framer.feed(&wire(&[(0x95, b"first"), (0x96, b"second"), (0x97, b"")]));

        let ids: Vec<u8> = frames.iter().map(|f| f.message_id).collect();
        assert_eq!(ids, vec![0x95, 0x96, 0x97]);
        assert_eq!(frames[1].payload.as_ref(), b"second");
    }

    #[test]
    fn noise_before_frame_is_skipped() {
        let mut stream = vec![0x55, 0xAA, 0x00, 0x03, 0xFF];
        stream.extend(wire(&[(0x96, &[0x00, 0x01, 0x00, 0x00, 0x40, 0x00])]));

        let mut framer = EnvelopeFramer::new();
        let frames = framer.feed(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 0x96);
        assert_eq!(framer.skipped_bytes(), 5);
        assert_eq!(framer.resync_count(), 0);
    }

    #[test]
    fn pure_noise_is_discarded() {
        let mut framer = EnvelopeFramer::new();
        assert!(framer.feed(&[0x11, 0x22, 0x33, 0x44]).is_empty());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn corrupted_terminator_then_valid_frame() {
        let mut bad = wire(&[(0x95, &[0x00, 0x31, 0x07, 0x00])]);
        let last = bad.len() - 1;
        bad[last] = 0x7E;
        let mut stream = bad;
        stream.extend(wire(&[(0x96, b"good")]));

        let mut framer = EnvelopeFramer::new();
        let frames = framer.feed(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 0x96);
        assert_eq!(frames[0].payload.as_ref(), b"good");
        assert!(framer.resync_count() >= 1);
    }

    #[test]
    fn start_marker_inside_corrupt_frame_is_not_lost() {
        // Corrupt candidate whose data contains a real frame.
        let inner = wire(&[(0x97, &[0x01, 0x12])]);
        let mut stream = vec![STX, 0x95, inner.len() as u8, 0x00];
        stream.extend(&inner);
        stream.extend([0x00, 0x00]); // checksum + bogus terminator

        let mut framer = EnvelopeFramer::new();
        let frames = framer.feed(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 0x97);
    }

    #[test]
    fn partial_frame_waits_for_more() {
        let stream = wire(&[(0x96, &[0x00, 0x23, 0xE8, 0x03, 0x40, 0x00])]);
        let mut framer = EnvelopeFramer::new();

        assert!(framer.feed(&stream[..3]).is_empty());
        assert_eq!(framer.buffered(), 3);
        assert!(framer.feed(&stream[3..stream.len() - 1]).is_empty());

        let frames = framer.feed(&stream[stream.len() - 1..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn empty_chunk_is_harmless() {
        let mut framer = EnvelopeFramer::new();
        assert!(framer.feed(&[]).is_empty());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn header_declaring_huge_length_waits() {
        let mut framer = EnvelopeFramer::new();
        assert!(framer.feed(&[STX, 0x95, 0xFF, 0xFF, 0x00, ETX]).is_empty());
        assert_eq!(framer.buffered(), 6);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Any split of a valid stream yields the same frames as one feed.
        #[test]
        fn prop_chunking_is_transparent(
            payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..40), 1..6),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let stream: Vec<u8> = payloads
                .iter()
                .enumerate()
                .flat_map(|(i, p)| build_frame(0x95 + (i % 4) as u8, p).unwrap().to_vec())
                .collect();

            let mut whole = EnvelopeFramer::new();
            let expected = whole.feed(&stream);
            prop_assert_eq!(expected.len(), payloads.len());

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(stream.len() + 1)).collect();
            points.sort_unstable();

            let mut split = EnvelopeFramer::new();
            let mut got = Vec::new();
            let mut start = 0;
            for point in points.into_iter().chain(std::iter::once(stream.len())) {
                got.extend(split.feed(&stream[start..point]));
                start = point;
            }

            prop_assert_eq!(got, expected);
            prop_assert_eq!(split.buffered(), 0);
        }

        /// build_frame then feed reproduces id and payload exactly.
        #[test]
        fn prop_roundtrip(id in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut framer = EnvelopeFramer::new();
            let frames = framer.feed(&build_frame(id, &payload).unwrap());

            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0].message_id, id);
            prop_assert_eq!(frames[0].payload.as_ref(), payload.as_slice());
            prop_assert!(frames[0].checksum_ok);
        }

        /// Noise free of start markers never hides the frame behind it.
        #[test]
        fn prop_noise_prefix_is_skipped(
            noise in proptest::collection::vec(any::<u8>().prop_filter("no STX", |b| *b != STX), 0..64),
            payload in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            let mut stream = noise.clone();
            stream.extend_from_slice(&build_frame(0x96, &payload).unwrap());

            let mut framer = EnvelopeFramer::new();
            let frames = framer.feed(&stream);

            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0].payload.as_ref(), payload.as_slice());
            prop_assert_eq!(framer.skipped_bytes(), noise.len() as u64);
        }

        /// Arbitrary input never panics and never grows past what was fed.
        #[test]
        fn prop_arbitrary_bytes_terminate(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let mut framer = EnvelopeFramer::new();
            let _ = framer.feed(&data);
            prop_assert!(framer.buffered() <= data.len());
        }
    }
}
