pub mod adpcm;
pub mod channel;
pub mod imc;
pub mod nibble;
pub mod subsong;
pub mod transport;

pub use adpcm::FrameDefects;
pub use channel::{AdpcmChannel, Channel, ChannelData, PcmChannel};
pub use imc::{ContainerSubsong, ImcContainer};
pub use subsong::{BlockLayout, HeaderError, LoadMode, Subsong};

use std::io;
use thiserror::Error;

/// The result type for audio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for audio operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("channel index {0} is out of range (subsong has {1} channels)")]
    ChannelIndex(usize, usize),

    #[error("frame {frame} has {defects}")]
    CorruptFrame { frame: usize, defects: FrameDefects },

    #[error("invalid subsong header: {0}")]
    InvalidHeader(HeaderError),

    #[error("invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("invalid load mode: {0}")]
    InvalidLoadMode(u32),

    #[error("invalid RIFF data")]
    InvalidRiff,

    #[error("invalid sample rate {0} (must be between 22000 and 48000)")]
    InvalidSampleRate(u32),

    #[error("invalid subsong name {0:?}: must be 16 or fewer ASCII characters")]
    InvalidSubsongName(String),

    #[error("subsong {index} has an invalid offset: {offset:#x}")]
    InvalidSubsongOffset { index: usize, offset: u32 },

    #[error("invalid WAV data")]
    InvalidWav,

    #[error("ADPCM data is not a whole number of frames, last frame is only {0} bytes out of 16")]
    MalformedLength(usize),

    #[error("number of nibble values needs to be even, got {0}")]
    OddNibbleCount(usize),

    #[error("subsong header predicts {expected} bytes of data, but only {available} are available")]
    TruncatedData { expected: u64, available: u64 },

    #[error("unknown subsong type for {0:?} (expected .sub.imc or .wav)")]
    UnknownSubsongType(String),

    #[error("unsupported sample format: only 16-bit PCM is supported, got {0}-bit")]
    UnsupportedSampleFormat(u16),

    #[error(transparent)]
    Io(Box<io::Error>),
}

from_error_boxed!(Error::Io, io::Error);

impl From<HeaderError> for Error {
    fn from(err: HeaderError) -> Self {
        Self::InvalidHeader(err)
    }
}
