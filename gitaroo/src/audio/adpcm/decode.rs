use super::{Context, FrameHeader, BYTES_PER_FRAME, SAMPLES_PER_FRAME};
use crate::audio::nibble::Nibbles;
use crate::audio::{Error, Result};
use tracing::{instrument, trace};

/// Decodes PS-ADPCM frames into PCM, carrying the sample history from one frame to the next.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    context: Context,
    frame_index: usize,
}

impl Decoder {
    /// Creates a new `Decoder` with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one 16-byte frame and appends its 28 samples to `out`. On failure, nothing is
    /// appended and the history is left untouched.
    pub fn decode_frame(&mut self, frame: &[u8], out: &mut Vec<i16>) -> Result<()> {
        if frame.len() < BYTES_PER_FRAME {
            return Err(Error::MalformedLength(frame.len()));
        }
        let header = FrameHeader::parse(frame);
        if let Some(defects) = header.defects() {
            return Err(Error::CorruptFrame { frame: self.frame_index, defects });
        }

        let predictor = usize::from(header.predictor);
        let scale = header.scale();
        for nibble in Nibbles::new(&frame[2..BYTES_PER_FRAME], true) {
            let predicted = self.context.predict(predictor);
            let sample = Context::reconstruct(nibble, scale, predicted);
            out.push(sample);
            self.context.push_sample(sample);
        }
        self.frame_index += 1;
        Ok(())
    }

    /// The sample history after the most recently decoded frame.
    pub fn context(&self) -> Context {
        self.context
    }
}

/// Decodes a buffer of whole frames into PCM samples. Every frame is decoded, including any end
/// marker, so the output always holds 28 samples per frame.
#[instrument(level = "trace", skip_all)]
pub fn decode(data: &[u8]) -> Result<Vec<i16>> {
    let remainder = data.len() % BYTES_PER_FRAME;
    if remainder != 0 {
        return Err(Error::MalformedLength(remainder));
    }
    let num_frames = data.len() / BYTES_PER_FRAME;
    trace!("Decoding {} ADPCM frames", num_frames);

    let mut decoder = Decoder::new();
    let mut samples = Vec::with_capacity(num_frames * SAMPLES_PER_FRAME);
    for frame in data.chunks_exact(BYTES_PER_FRAME) {
        decoder.decode_frame(frame, &mut samples)?;
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::adpcm::END_FRAME;
    use crate::audio::FrameDefects;

    fn frame(header: [u8; 2], deltas: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; BYTES_PER_FRAME];
        frame[..2].copy_from_slice(&header);
        frame[2..(2 + deltas.len())].copy_from_slice(deltas);
        frame
    }

    #[test]
    fn test_decode_known_values() -> Result<()> {
        // predictor 1, shift 12
        let samples = decode(&frame([0x1c, 0x00], &[0x21]))?;
        assert_eq!(samples.len(), SAMPLES_PER_FRAME);
        assert_eq!(samples[..5], [1, 2, 1, 0, 0]);
        assert!(samples[5..].iter().all(|&s| s == 0));

        // Truncation is toward zero for negative samples too
        let samples = decode(&frame([0x1c, 0x00], &[0xef]))?;
        assert_eq!(samples[..5], [-1, -2, -1, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_decode_clamps() -> Result<()> {
        // predictor 0, shift 0: each delta is multiplied by 4096
        let samples = decode(&frame([0x00, 0x00], &[0x78]))?;
        assert_eq!(samples[..3], [i16::MIN, 28672, 0]);

        // predictor 4 overshoots after two large samples
        let samples = decode(&frame([0x40, 0x00], &[0x77, 0x07]))?;
        // 0.96875 * 32767 = 31743.03
        assert_eq!(samples[..4], [28672, i16::MAX, i16::MAX, 31743]);
        Ok(())
    }

    #[test]
    fn test_decode_carries_history() -> Result<()> {
        let mut deltas = [0u8; 14];
        deltas[13] = 0x30;
        let mut data = frame([0x0c, 0x00], &deltas);
        data.extend(frame([0x1c, 0x01], &[]));
        data.extend(END_FRAME);
        let samples = decode(&data)?;
        assert_eq!(samples.len(), 3 * SAMPLES_PER_FRAME);
        assert_eq!(samples[27], 3);
        // 3 * 0.9375 = 2.8125, then 2 * 0.9375 = 1.875
        assert_eq!(samples[28..31], [2, 1, 0]);
        assert!(samples[56..].iter().all(|&s| s == 0));
        Ok(())
    }

    #[test]
    fn test_decode_empty() -> Result<()> {
        assert!(decode(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_malformed_length() {
        assert!(matches!(decode(&[0u8; 20]), Err(Error::MalformedLength(4))));
    }

    #[test]
    fn test_decode_frame_too_short() {
        let mut decoder = Decoder::new();
        let mut out = vec![];
        let result = decoder.decode_frame(&[0u8; 10], &mut out);
        assert!(matches!(result, Err(Error::MalformedLength(10))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_corrupt_predictor() {
        let mut data = END_FRAME.to_vec();
        data.extend(END_FRAME);
        data.extend(frame([0x50, 0x00], &[]));
        match decode(&data) {
            Err(Error::CorruptFrame { frame, defects }) => {
                assert_eq!(frame, 2);
                assert_eq!(defects, FrameDefects { predictor: Some(5), shift: None, flag: None });
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_reports_all_defects() {
        let err = decode(&frame([0x6d, 0x09], &[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "frame 0 has invalid predictor 0x6 and invalid shift 0xd and invalid flag 0x9"
        );
    }

    #[test]
    fn test_decoder_leaves_state_on_error() -> Result<()> {
        let mut decoder = Decoder::new();
        let mut out = vec![];
        decoder.decode_frame(&frame([0x0c, 0x00], &[0x05]), &mut out)?;
        assert_eq!(decoder.context().last_samples, [0, 0]);
        assert!(decoder.decode_frame(&frame([0x0f, 0x00], &[]), &mut out).is_err());
        assert_eq!(out.len(), SAMPLES_PER_FRAME);
        assert_eq!(out[0], 5);
        Ok(())
    }
}
