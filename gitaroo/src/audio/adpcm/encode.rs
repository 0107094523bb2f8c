use super::{
    scale, Context, FrameHeader, BYTES_PER_FRAME, END_FRAME, FLAG_LAST, FLAG_NORMAL, MAX_SHIFT,
    NUM_PREDICTORS, SAMPLES_PER_FRAME,
};
use crate::audio::nibble::pack_pair;
use arrayvec::ArrayVec;
use tracing::{instrument, trace};

const NUM_SHIFTS: usize = MAX_SHIFT as usize + 1;

/// Lists the values in `0..count` starting at `prev` and alternating outward from it, lower value
/// first: `prev, prev - 1, prev + 1, prev - 2, prev + 2, ...`.
fn search_order(prev: u8, count: usize) -> ArrayVec<u8, NUM_SHIFTS> {
    let mut order = ArrayVec::new();
    order.push(prev);
    let prev = usize::from(prev);
    for distance in 1..count {
        if let Some(below) = prev.checked_sub(distance) {
            order.push(below as u8);
        }
        if prev + distance < count {
            order.push((prev + distance) as u8);
        }
    }
    order
}

/// A complete encoding of one frame.
#[derive(Debug, Clone)]
struct Candidate {
    shift: u8,
    predictor: u8,
    nibbles: [i8; SAMPLES_PER_FRAME],
    context: Context,
    /// The largest difference between an input sample and its decoded value.
    worst: i32,
}

/// Encodes PCM samples into PS-ADPCM frames.
///
/// For every frame, each shift/predictor combination is tried in turn and the one whose worst
/// sample is closest to the input wins. Combinations near the previous frame's are tried first so
/// that poor candidates can be abandoned early. Ties go to whichever candidate was found first.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    context: Context,
    prev_shift: u8,
    prev_predictor: u8,
}

impl Encoder {
    /// Creates a new `Encoder` with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes up to 28 samples into a frame with the given flag. Short input is padded with
    /// silence.
    pub fn encode_frame(&mut self, samples: &[i16], flag: u8) -> [u8; BYTES_PER_FRAME] {
        debug_assert!(samples.len() <= SAMPLES_PER_FRAME);
        let mut padded = [0i16; SAMPLES_PER_FRAME];
        padded[..samples.len()].copy_from_slice(samples);

        if padded.iter().all(|&s| s == 0) {
            self.context = Context::new();
            let mut frame = [0u8; BYTES_PER_FRAME];
            frame[..2].copy_from_slice(&FrameHeader { predictor: 0, shift: 0, flag }.to_bytes());
            return frame;
        }

        // Any completed candidate beats this one
        let mut best = Candidate {
            shift: 0,
            predictor: 0,
            nibbles: [0; SAMPLES_PER_FRAME],
            context: self.context,
            worst: i32::MAX,
        };
        for shift in search_order(self.prev_shift, NUM_SHIFTS) {
            for predictor in search_order(self.prev_predictor, NUM_PREDICTORS) {
                if let Some(candidate) = self.try_candidate(&padded, shift, predictor, best.worst) {
                    best = candidate;
                }
            }
        }

        self.context = best.context;
        self.prev_shift = best.shift;
        self.prev_predictor = best.predictor;

        let mut frame = [0u8; BYTES_PER_FRAME];
        let header = FrameHeader { predictor: best.predictor, shift: best.shift, flag };
        frame[..2].copy_from_slice(&header.to_bytes());
        for (byte, pair) in frame[2..].iter_mut().zip(best.nibbles.chunks_exact(2)) {
            *byte = pack_pair(pair[0], pair[1]);
        }
        frame
    }

    /// Encodes `samples` using one shift/predictor combination. Returns `None` as soon as any
    /// sample is off by `to_beat` or more.
    fn try_candidate(
        &self,
        samples: &[i16; SAMPLES_PER_FRAME],
        shift: u8,
        predictor: u8,
        to_beat: i32,
    ) -> Option<Candidate> {
        let scale = scale(shift);
        let divisor = f64::from(scale);
        let mut candidate = Candidate {
            shift,
            predictor,
            nibbles: [0; SAMPLES_PER_FRAME],
            context: self.context,
            worst: 0,
        };
        for (&sample, nibble_out) in samples.iter().zip(&mut candidate.nibbles) {
            let predicted = candidate.context.predict(usize::from(predictor));
            let delta = (f64::from(sample) + 0.5 - predicted) / divisor;
            let nibble = if delta <= -8.0 {
                -8
            } else if delta >= 7.0 {
                7
            } else {
                delta.round_ties_even() as i8
            };
            let decoded = Context::reconstruct(nibble, scale, predicted);
            let diff = (i32::from(sample) - i32::from(decoded)).abs();
            if diff >= to_beat {
                return None;
            }
            candidate.worst = candidate.worst.max(diff);
            *nibble_out = nibble;
            candidate.context.push_sample(decoded);
        }
        Some(candidate)
    }
}

/// Encodes a channel of PCM samples. The result holds one frame per 28 samples (rounded up), with
/// the last of them flagged as the final audible frame, followed by an end marker frame.
#[instrument(level = "trace", skip_all)]
pub fn encode(samples: &[i16]) -> Vec<u8> {
    let num_frames = samples.len().div_ceil(SAMPLES_PER_FRAME);
    trace!("Encoding {} samples into {} ADPCM frames", samples.len(), num_frames + 1);

    let mut encoder = Encoder::new();
    let mut encoded = Vec::with_capacity((num_frames + 1) * BYTES_PER_FRAME);
    for (i, chunk) in samples.chunks(SAMPLES_PER_FRAME).enumerate() {
        let flag = if i + 1 == num_frames { FLAG_LAST } else { FLAG_NORMAL };
        encoded.extend(encoder.encode_frame(chunk, flag));
    }
    encoded.extend(END_FRAME);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::adpcm::decode;
    use crate::audio::Result;

    /// A signal which shift 0 / predictor 0 reproduces exactly.
    fn exact_signal(len: usize) -> Vec<i16> {
        (0..len).map(|i| ((i % 16) as i16 - 8) * 4096).collect()
    }

    fn sine(len: usize, amplitude: f64) -> Vec<i16> {
        (0..len)
            .map(|i| ((i as f64 * 0.05).sin() * amplitude).round() as i16)
            .collect()
    }

    #[test]
    fn test_search_order() {
        assert_eq!(search_order(2, 5).as_slice(), [2, 1, 3, 0, 4]);
        assert_eq!(search_order(0, 5).as_slice(), [0, 1, 2, 3, 4]);
        assert_eq!(search_order(4, 5).as_slice(), [4, 3, 2, 1, 0]);
        assert_eq!(search_order(1, 5).as_slice(), [1, 0, 2, 3, 4]);
        assert_eq!(search_order(11, 13).as_slice(), [11, 10, 12, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&[]), END_FRAME);
    }

    #[test]
    fn test_encode_silence() {
        let encoded = encode(&[0; 56]);
        assert_eq!(encoded.len(), 3 * BYTES_PER_FRAME);
        assert!(encoded[..16].iter().all(|&b| b == 0));
        assert_eq!(encoded[16], 0x00);
        assert_eq!(encoded[17], FLAG_LAST);
        assert!(encoded[18..32].iter().all(|&b| b == 0));
        assert_eq!(encoded[32..], END_FRAME);
    }

    #[test]
    fn test_encode_frame_count() {
        for len in [1, 27, 28, 29, 56, 57, 1000] {
            let encoded = encode(&sine(len, 1000.0));
            let expected = len.div_ceil(SAMPLES_PER_FRAME) + 1;
            assert_eq!(encoded.len(), expected * BYTES_PER_FRAME, "len = {}", len);
            assert_eq!(encoded[encoded.len() - 16..], END_FRAME);
            assert_eq!(encoded[encoded.len() - 31], FLAG_LAST);
        }
    }

    #[test]
    fn test_encode_exact_signal() -> Result<()> {
        let samples = exact_signal(56);
        let encoded = encode(&samples);
        assert_eq!(encoded[..2], [0x00, FLAG_NORMAL]);
        assert_eq!(encoded[2..4], [0x98, 0xba]);
        assert_eq!(encoded[16..18], [0x00, FLAG_LAST]);

        let decoded = decode(&encoded)?;
        assert_eq!(decoded[..56], samples);
        assert!(decoded[56..].iter().all(|&s| s == 0));
        Ok(())
    }

    #[test]
    fn test_reencode_is_stable() -> Result<()> {
        let samples = exact_signal(56);
        let encoded = encode(&samples);
        let decoded = decode(&encoded)?;
        assert_eq!(encode(&decoded[..samples.len()]), encoded);
        Ok(())
    }

    #[test]
    fn test_encode_sine_accuracy() -> Result<()> {
        let samples = sine(1000, 8000.0);
        let decoded = decode(&encode(&samples))?;
        for (i, (&expected, &actual)) in samples.iter().zip(&decoded).enumerate() {
            let diff = (i32::from(expected) - i32::from(actual)).abs();
            assert!(diff <= 1024, "sample {}: expected {}, got {}", i, expected, actual);
        }
        Ok(())
    }

    /// A jagged signal which no parameters reproduce exactly.
    fn lossy_signal(len: usize) -> Vec<i16> {
        (0..len as i64).map(|i| ((i * i * 37 + i * 1013) % 20001 - 10000) as i16).collect()
    }

    #[rustfmt::skip]
    const LOSSY_ENCODED: [u8; 64] = [
        0x01, 0x00, 0xcb, 0xdc, 0xed, 0xff, 0x10, 0x32, 0x54, 0xdc, 0xfe, 0x10, 0x42, 0xdb, 0xfe, 0x21,
        0x11, 0x00, 0x82, 0x11, 0x22, 0x91, 0x21, 0x22, 0x82, 0x22, 0x92, 0x21, 0x23, 0x29, 0x32, 0x29,
        0x01, 0x01, 0x41, 0xfd, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_encode_lossy_signal() -> Result<()> {
        let samples = lossy_signal(60);
        let encoded = encode(&samples);
        assert_eq!(encoded, LOSSY_ENCODED);

        let decoded = decode(&encoded)?;
        assert_eq!(decoded[..8], [-10240, -8192, -8192, -6144, -6144, -4096, -2048, -2048]);
        assert_eq!(decoded[28..34], [7936, -8944, -6337, -3892, 447, 4515]);
        assert_eq!(decoded[56..60], [2048, 8192, -6144, -2048]);
        Ok(())
    }

    #[test]
    fn test_reencode_lossy_signal_is_stable() -> Result<()> {
        let samples = lossy_signal(60);
        let encoded = encode(&samples);
        let decoded = decode(&encoded)?;
        assert_ne!(decoded[..samples.len()], samples);
        assert_eq!(encode(&decoded[..samples.len()]), encoded);
        Ok(())
    }

    #[test]
    fn test_silent_frame_resets_history() {
        let mut encoder = Encoder::new();
        encoder.encode_frame(&sine(28, 5000.0), FLAG_NORMAL);
        let (shift, predictor) = (encoder.prev_shift, encoder.prev_predictor);
        let frame = encoder.encode_frame(&[], FLAG_NORMAL);
        assert_eq!(frame, [0u8; BYTES_PER_FRAME]);
        assert_eq!(encoder.context, Context::new());
        assert_eq!((encoder.prev_shift, encoder.prev_predictor), (shift, predictor));
    }
}
