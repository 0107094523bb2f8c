//! PS-ADPCM ("VAG") audio frames.
//!
//! Each frame is 16 bytes and encodes 28 samples:
//!
//! ```text
//! byte 0:      predictor (bits 4-7) | shift (bits 0-3)
//! byte 1:      flag (0x0 = normal, 0x1 = last audible frame, 0x7 = end + don't play)
//! bytes 2-15:  28 signed 4-bit deltas, low nibble first
//! ```

mod decode;
mod encode;

pub use decode::*;
pub use encode::*;

use crate::common::clamp_f64_to_i16;
use std::fmt;

/// The number of bytes in a frame.
pub const BYTES_PER_FRAME: usize = 16;
/// The number of samples encoded by a frame.
pub const SAMPLES_PER_FRAME: usize = 28;

/// The highest valid shift value.
pub const MAX_SHIFT: u8 = 12;
/// The number of predictors (coefficient pairs).
pub const NUM_PREDICTORS: usize = 5;

/// Flag for an ordinary audible frame.
pub const FLAG_NORMAL: u8 = 0x0;
/// Flag for the last audible frame.
pub const FLAG_LAST: u8 = 0x1;
/// Flag for the silent frame which marks the end of the audio.
pub const FLAG_END: u8 = 0x7;

/// The silent frame which ends every channel.
pub const END_FRAME: [u8; BYTES_PER_FRAME] = [
    0x00, FLAG_END, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// Predictor coefficients. Each pair is applied to the previous two decoded samples.
pub const COEFFICIENTS: [(f64, f64); NUM_PREDICTORS] = [
    (0.0, 0.0),
    (0.9375, 0.0),
    (1.796875, -0.8125),
    (1.53125, -0.859375),
    (1.90625, -0.9375),
];

/// The parameters stored in the first two bytes of a frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// The index into `COEFFICIENTS`.
    pub predictor: u8,
    /// Deltas are multiplied by `2^(12 - shift)`.
    pub shift: u8,
    /// Playback flag.
    pub flag: u8,
}

impl FrameHeader {
    /// Unpacks the header from the start of `frame`.
    pub fn parse(frame: &[u8]) -> Self {
        Self { predictor: frame[0] >> 4, shift: frame[0] & 0xf, flag: frame[1] }
    }

    /// Packs the header into its two-byte form.
    pub fn to_bytes(self) -> [u8; 2] {
        [(self.predictor << 4) | (self.shift & 0xf), self.flag]
    }

    /// Checks every field against its valid range, collecting all violations at once.
    pub fn defects(&self) -> Option<FrameDefects> {
        let defects = FrameDefects {
            predictor: (usize::from(self.predictor) >= NUM_PREDICTORS).then_some(self.predictor),
            shift: (self.shift > MAX_SHIFT).then_some(self.shift),
            flag: (self.flag > FLAG_END).then_some(self.flag),
        };
        defects.any().then_some(defects)
    }

    /// The multiplier applied to each delta.
    pub fn scale(&self) -> i32 {
        scale(self.shift)
    }
}

/// Out-of-range header fields found in a corrupt frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameDefects {
    pub predictor: Option<u8>,
    pub shift: Option<u8>,
    pub flag: Option<u8>,
}

impl FrameDefects {
    fn any(&self) -> bool {
        self.predictor.is_some() || self.shift.is_some() || self.flag.is_some()
    }
}

impl fmt::Display for FrameDefects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [("predictor", self.predictor), ("shift", self.shift), ("flag", self.flag)];
        let mut first = true;
        for (name, value) in fields {
            if let Some(value) = value {
                if !first {
                    f.write_str(" and ")?;
                }
                write!(f, "invalid {} {:#x}", name, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Calculates the delta multiplier for a shift value.
#[inline]
pub(crate) fn scale(shift: u8) -> i32 {
    1 << (MAX_SHIFT - shift)
}

/// ADPCM decoder history.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Previously-decoded samples, where `last_samples[1]` is the oldest. Use `push_sample()` to
    /// insert new samples into this.
    pub last_samples: [i16; 2],
}

impl Context {
    /// Creates an empty `Context`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicts the next sample from the history using the coefficients for `predictor`.
    #[inline]
    pub fn predict(&self, predictor: usize) -> f64 {
        let (c0, c1) = COEFFICIENTS[predictor];
        f64::from(self.last_samples[0]) * c0 + f64::from(self.last_samples[1]) * c1
    }

    /// Reconstructs a sample from a delta and a prediction.
    #[inline]
    pub fn reconstruct(nibble: i8, scale: i32, predicted: f64) -> i16 {
        clamp_f64_to_i16(f64::from(i32::from(nibble) * scale) + predicted)
    }

    /// Pushes a new sample into the sample history, pushing out the oldest sample.
    #[inline]
    pub fn push_sample(&mut self, sample: i16) {
        self.last_samples[1] = self.last_samples[0];
        self.last_samples[0] = sample;
    }
}
