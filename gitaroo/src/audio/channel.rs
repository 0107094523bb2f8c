use super::adpcm::{self, BYTES_PER_FRAME, END_FRAME, FLAG_END, FLAG_LAST, SAMPLES_PER_FRAME};
use super::{Error, Result};
use std::borrow::Cow;
use tracing::trace;

/// Common interface for audio channels regardless of where their audio came from.
pub trait ChannelData {
    /// Returns the channel's audio as 16-bit PCM samples.
    fn pcm_samples(&self) -> Result<Cow<'_, [i16]>>;

    /// Returns the channel's audio as PS-ADPCM frames. The last audible frame is flagged as such
    /// and is followed by a single end marker frame.
    fn adpcm_frames(&self) -> Cow<'_, [u8]>;

    /// The number of frames that `adpcm_frames()` returns, without encoding anything.
    fn frame_count(&self) -> usize;
}

/// A channel of 16-bit PCM samples which encodes to PS-ADPCM on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmChannel {
    samples: Vec<i16>,
}

impl PcmChannel {
    /// Creates a new `PcmChannel` which holds `samples`.
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Returns the samples in the channel.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Consumes the channel and returns its samples.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl ChannelData for PcmChannel {
    fn pcm_samples(&self) -> Result<Cow<'_, [i16]>> {
        Ok(Cow::Borrowed(&self.samples))
    }

    fn adpcm_frames(&self) -> Cow<'_, [u8]> {
        Cow::Owned(adpcm::encode(&self.samples))
    }

    fn frame_count(&self) -> usize {
        self.samples.len().div_ceil(SAMPLES_PER_FRAME) + 1
    }
}

impl From<Vec<i16>> for PcmChannel {
    fn from(samples: Vec<i16>) -> Self {
        Self::new(samples)
    }
}

/// A channel of PS-ADPCM frames which decodes to PCM on demand.
///
/// The frame data is normalized on construction so that it always ends the same way the game's
/// own audio does: padding after the audio is dropped, the last audible frame is flagged, and a
/// single end marker frame follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdpcmChannel {
    data: Vec<u8>,
}

impl AdpcmChannel {
    /// Creates a new `AdpcmChannel` from raw frame data. Fails if `data` is not a whole number of
    /// frames.
    ///
    /// The first frame flagged as an end marker ends the audio, and it and everything after it is
    /// discarded. Without one, trailing all-zero frames are discarded instead. The marker (or a
    /// silent one if there was none) is then re-appended.
    pub fn new(mut data: Vec<u8>) -> Result<Self> {
        let remainder = data.len() % BYTES_PER_FRAME;
        if remainder != 0 {
            return Err(Error::MalformedLength(remainder));
        }

        let mut keep = 0;
        let mut end_frame = END_FRAME;
        for (i, frame) in data.chunks_exact(BYTES_PER_FRAME).enumerate() {
            if frame[1] == FLAG_END {
                keep = i;
                end_frame.copy_from_slice(frame);
                break;
            }
            if frame.iter().any(|&b| b != 0) {
                keep = i + 1;
            }
        }

        let original_len = data.len();
        data.truncate(keep * BYTES_PER_FRAME);
        if let Some(last) = data.len().checked_sub(BYTES_PER_FRAME) {
            data[last + 1] = FLAG_LAST;
        }
        data.extend(end_frame);
        if data.len() != original_len {
            trace!("Normalized ADPCM channel from {:#x} to {:#x} bytes", original_len, data.len());
        }
        Ok(Self { data })
    }

    /// Returns the normalized frame data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the channel and returns its frame data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl ChannelData for AdpcmChannel {
    fn pcm_samples(&self) -> Result<Cow<'_, [i16]>> {
        Ok(Cow::Owned(adpcm::decode(&self.data)?))
    }

    fn adpcm_frames(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }

    fn frame_count(&self) -> usize {
        self.data.len() / BYTES_PER_FRAME
    }
}

/// An audio channel in either representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Pcm(PcmChannel),
    Adpcm(AdpcmChannel),
}

impl Channel {
    /// Converts the channel into an `AdpcmChannel`, encoding it if necessary.
    pub fn into_adpcm(self) -> Result<AdpcmChannel> {
        match self {
            Self::Pcm(pcm) => AdpcmChannel::new(pcm.adpcm_frames().into_owned()),
            Self::Adpcm(adpcm) => Ok(adpcm),
        }
    }
}

impl ChannelData for Channel {
    fn pcm_samples(&self) -> Result<Cow<'_, [i16]>> {
        match self {
            Self::Pcm(pcm) => pcm.pcm_samples(),
            Self::Adpcm(adpcm) => adpcm.pcm_samples(),
        }
    }

    fn adpcm_frames(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Pcm(pcm) => pcm.adpcm_frames(),
            Self::Adpcm(adpcm) => adpcm.adpcm_frames(),
        }
    }

    fn frame_count(&self) -> usize {
        match self {
            Self::Pcm(pcm) => pcm.frame_count(),
            Self::Adpcm(adpcm) => adpcm.frame_count(),
        }
    }
}

impl From<PcmChannel> for Channel {
    fn from(pcm: PcmChannel) -> Self {
        Self::Pcm(pcm)
    }
}

impl From<AdpcmChannel> for Channel {
    fn from(adpcm: AdpcmChannel) -> Self {
        Self::Adpcm(adpcm)
    }
}
