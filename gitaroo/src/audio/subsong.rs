use super::adpcm::{BYTES_PER_FRAME, SAMPLES_PER_FRAME};
use super::{AdpcmChannel, Channel, ChannelData, Error, Result};
use crate::common::{ReadFrom, ReadSeek, WriteTo};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Read, SeekFrom, Write};
use tracing::{debug, instrument, trace};

/// The size of the subsong header in bytes.
pub const HEADER_SIZE: usize = 16;

/// The largest number of channels a subsong can have.
pub const MAX_CHANNELS: usize = 8;

/// The lowest sample rate a subsong can have.
pub const MIN_SAMPLE_RATE: u32 = 22000;
/// The highest sample rate a subsong can have.
pub const MAX_SAMPLE_RATE: u32 = 48000;

/// Frames per block for streamed subsongs.
const STREAM_FRAMES_PER_BLOCK: u32 = 768;
/// Upper limit on frames per block for subsongs which are loaded all at once.
const MAX_ENTIRE_FRAMES_PER_BLOCK: u64 = 32767;

/// How the game loads a subsong, which decides its block layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum LoadMode {
    /// The subsong is streamed in small blocks. Used for music and some sound effects.
    Stream = 0,
    /// The subsong is loaded in as few blocks as possible. Used for short sound effects.
    Entire = 2,
}

impl Default for LoadMode {
    fn default() -> Self {
        Self::Stream
    }
}

impl LoadMode {
    /// Returns a short lowercase name for the load mode.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Entire => "entire",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// How a subsong's channels are split into blocks and interleaved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockLayout {
    pub frames_per_block: u32,
    pub blocks_per_channel: u32,
}

impl BlockLayout {
    /// Creates a new `BlockLayout`.
    pub fn new(frames_per_block: u32, blocks_per_channel: u32) -> Self {
        Self { frames_per_block, blocks_per_channel }
    }

    /// Calculates the layout which holds `num_frames` in blocks of `frames_per_block`.
    pub fn fit(num_frames: usize, frames_per_block: u32) -> Self {
        let blocks = (num_frames as u64).div_ceil(u64::from(frames_per_block).max(1));
        Self::new(frames_per_block, blocks as u32)
    }

    /// Calculates the layout used for streaming `num_frames` frames.
    pub fn streaming(num_frames: usize) -> Self {
        Self::fit(num_frames, STREAM_FRAMES_PER_BLOCK)
    }

    /// Calculates the layout used for loading `num_frames` frames all at once. The frames are
    /// divided as evenly as possible into the fewest blocks that respect the block size limit.
    pub fn entire(num_frames: usize) -> Self {
        let num_frames = (num_frames as u64).max(1);
        let num_blocks = num_frames.div_ceil(MAX_ENTIRE_FRAMES_PER_BLOCK);
        Self::fit(num_frames as usize, num_frames.div_ceil(num_blocks) as u32)
    }

    /// The size of each block in bytes.
    pub fn block_size(&self) -> usize {
        self.frames_per_block as usize * BYTES_PER_FRAME
    }
}

/// A subsong header field which is out of range.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeaderError {
    #[error("invalid number of channels {0} (must be between 1 and 8)")]
    ChannelCount(u32),

    #[error("invalid sample rate {0} (must be between 22000 and 48000)")]
    SampleRate(u32),

    #[error("frames per block should not be 0")]
    ZeroFramesPerBlock,

    #[error("number of blocks should not be 0")]
    ZeroBlocks,

    #[error("number of channels ({channels}) does not divide evenly into number of blocks ({blocks})")]
    UnevenBlocks { channels: u32, blocks: u32 },
}

/// The header at the start of an interleaved subsong.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SubsongHeader {
    pub num_channels: u32,
    pub sample_rate: u32,
    pub frames_per_block: u32,
    /// The total number of blocks across all channels.
    pub num_blocks: u32,
}

impl SubsongHeader {
    /// Checks that every field is in range.
    pub fn validate(&self) -> std::result::Result<(), HeaderError> {
        if !(1..=MAX_CHANNELS as u32).contains(&self.num_channels) {
            return Err(HeaderError::ChannelCount(self.num_channels));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(HeaderError::SampleRate(self.sample_rate));
        }
        if self.frames_per_block == 0 {
            return Err(HeaderError::ZeroFramesPerBlock);
        }
        if self.num_blocks == 0 {
            return Err(HeaderError::ZeroBlocks);
        }
        if self.num_blocks % self.num_channels != 0 {
            return Err(HeaderError::UnevenBlocks {
                channels: self.num_channels,
                blocks: self.num_blocks,
            });
        }
        Ok(())
    }

    /// The number of data bytes the header says follow it.
    pub fn data_size(&self) -> u64 {
        BYTES_PER_FRAME as u64 * u64::from(self.frames_per_block) * u64::from(self.num_blocks)
    }

    /// The block layout of each channel.
    pub fn layout(&self) -> BlockLayout {
        BlockLayout::new(self.frames_per_block, self.num_blocks / self.num_channels.max(1))
    }
}

impl<R: Read + ?Sized> ReadFrom<R> for SubsongHeader {
    type Error = Error;
    fn read_from(reader: &mut R) -> Result<Self> {
        Ok(Self {
            num_channels: reader.read_u32::<LE>()?,
            sample_rate: reader.read_u32::<LE>()?,
            frames_per_block: reader.read_u32::<LE>()?,
            num_blocks: reader.read_u32::<LE>()?,
        })
    }
}

impl<W: Write + ?Sized> WriteTo<W> for SubsongHeader {
    type Error = Error;
    fn write_to(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LE>(self.num_channels)?;
        writer.write_u32::<LE>(self.sample_rate)?;
        writer.write_u32::<LE>(self.frames_per_block)?;
        writer.write_u32::<LE>(self.num_blocks)?;
        Ok(())
    }
}

/// A multi-channel audio stream.
///
/// On disk, a subsong is a `SubsongHeader` followed by each channel's PS-ADPCM frames split into
/// equally-sized blocks, interleaved one block per channel at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsong {
    channels: Vec<Channel>,
    sample_rate: u32,
    original_layout: Option<BlockLayout>,
}

impl Subsong {
    /// Creates a new `Subsong` from `channels`. Fails if the sample rate is out of range.
    pub fn new(channels: Vec<Channel>, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        Ok(Self { channels, sample_rate, original_layout: None })
    }

    /// Pins the block layout used when serializing. Subsongs read from interleaved data keep
    /// the layout they were read with so that rebuilding them changes as few bytes as possible.
    #[must_use]
    pub fn with_original_layout(mut self, layout: Option<BlockLayout>) -> Self {
        self.original_layout = layout;
        self
    }

    /// Returns the subsong's channels.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Consumes the subsong and returns its channels.
    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }

    /// The number of channels in the subsong.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Replaces the channel at `index`, returning the old channel.
    pub fn replace_channel(&mut self, index: usize, channel: Channel) -> Result<Channel> {
        let num_channels = self.channels.len();
        let slot = self.channels.get_mut(index).ok_or(Error::ChannelIndex(index, num_channels))?;
        Ok(std::mem::replace(slot, channel))
    }

    /// The number of samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Changes the sample rate. Fails if it is out of range.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        check_sample_rate(sample_rate)?;
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// The block layout the subsong was read with, if it is being kept.
    pub fn original_layout(&self) -> Option<BlockLayout> {
        self.original_layout
    }

    /// Sets or clears the block layout to use when serializing.
    pub fn set_original_layout(&mut self, layout: Option<BlockLayout>) {
        self.original_layout = layout;
    }

    /// The number of frames in the longest channel.
    pub fn frame_count(&self) -> usize {
        self.channels.iter().map(|c| c.frame_count()).max().unwrap_or(0)
    }

    /// The number of samples per channel when played back, which excludes the end marker frame.
    pub fn duration_samples(&self) -> u64 {
        let audible = self.frame_count().saturating_sub(1) as u64;
        audible * SAMPLES_PER_FRAME as u64
    }

    /// Decides the block layout for serializing. The original layout is preferred if there is
    /// one, otherwise the layout is calculated for `mode`.
    pub fn block_layout(&self, mode: LoadMode) -> BlockLayout {
        let num_frames = self.frame_count();
        if let Some(original) = self.original_layout.filter(|l| l.frames_per_block > 0) {
            let needed = BlockLayout::fit(num_frames, original.frames_per_block);
            if needed.blocks_per_channel > original.blocks_per_channel {
                debug!(
                    "Original layout has {} blocks per channel but {} are needed",
                    original.blocks_per_channel, needed.blocks_per_channel
                );
                return needed;
            }
            return original;
        }
        match mode {
            LoadMode::Stream => BlockLayout::streaming(num_frames),
            LoadMode::Entire => BlockLayout::entire(num_frames),
        }
    }

    /// Writes the interleaved subsong to `writer`.
    #[instrument(level = "trace", skip_all)]
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W, mode: LoadMode) -> Result<()> {
        let num_channels = self.channels.len();
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(Error::InvalidChannelCount(num_channels));
        }

        let layout = self.block_layout(mode);
        let header = SubsongHeader {
            num_channels: num_channels as u32,
            sample_rate: self.sample_rate,
            frames_per_block: layout.frames_per_block,
            num_blocks: layout.blocks_per_channel * num_channels as u32,
        };
        debug!(
            "Writing subsong: {} channel(s), {} Hz, {} frames per block, {} blocks",
            header.num_channels, header.sample_rate, header.frames_per_block, header.num_blocks
        );
        header.write_to(writer)?;

        let frames: Vec<Cow<'_, [u8]>> = self.channels.iter().map(|c| c.adpcm_frames()).collect();
        let block_size = layout.block_size();
        for block in 0..(layout.blocks_per_channel as usize) {
            let start = block * block_size;
            for data in &frames {
                let chunk = data.get(start..).unwrap_or_default();
                let chunk = &chunk[..chunk.len().min(block_size)];
                writer.write_all(chunk)?;
                write_zeros(writer, block_size - chunk.len())?;
            }
        }
        Ok(())
    }

    /// Serializes the subsong into a new buffer.
    pub fn serialize(&self, mode: LoadMode) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(vec![]);
        self.write_to(&mut cursor, mode)?;
        Ok(cursor.into_inner())
    }

    /// Reads an interleaved subsong from `reader`. `size` is the size of the subsong if it is
    /// known, otherwise the subsong is assumed to end at the end of the stream. On success, the
    /// reader is left right after the subsong's data.
    #[instrument(level = "trace", skip_all)]
    pub fn read_from<R: ReadSeek + ?Sized>(reader: &mut R, size: Option<u64>) -> Result<Self> {
        let available = match size {
            Some(size) => size,
            None => {
                let start = reader.stream_position()?;
                let end = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(start))?;
                end.saturating_sub(start)
            }
        };
        if available < HEADER_SIZE as u64 {
            return Err(Error::TruncatedData { expected: HEADER_SIZE as u64, available });
        }

        let header = SubsongHeader::read_from(reader)?;
        header.validate()?;
        let expected = header.data_size();
        let available = available - HEADER_SIZE as u64;
        if expected > available {
            return Err(Error::TruncatedData { expected, available });
        }
        debug!(
            "Reading subsong: {} channel(s), {} Hz, {} frames per block, {} blocks",
            header.num_channels, header.sample_rate, header.frames_per_block, header.num_blocks
        );

        let mut data = vec![0u8; expected as usize];
        reader.read_exact(&mut data)?;

        let layout = header.layout();
        let num_channels = header.num_channels as usize;
        let block_size = layout.block_size();
        let channel_size = block_size * layout.blocks_per_channel as usize;
        let mut channel_data: Vec<Vec<u8>> =
            (0..num_channels).map(|_| Vec::with_capacity(channel_size)).collect();
        for (i, block) in data.chunks_exact(block_size).enumerate() {
            channel_data[i % num_channels].extend_from_slice(block);
        }

        let channels = channel_data
            .into_iter()
            .map(|data| AdpcmChannel::new(data).map(Channel::from))
            .collect::<Result<Vec<_>>>()?;
        trace!("Deinterleaved {} blocks into {} channel(s)", header.num_blocks, num_channels);
        Ok(Self::new(channels, header.sample_rate)?.with_original_layout(Some(layout)))
    }

    /// Deserializes an interleaved subsong which takes up all of `bytes`.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(bytes), Some(bytes.len() as u64))
    }
}

fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(())
    } else {
        Err(Error::InvalidSampleRate(sample_rate))
    }
}

fn write_zeros<W: Write + ?Sized>(writer: &mut W, len: usize) -> io::Result<()> {
    io::copy(&mut io::repeat(0).take(len as u64), writer)?;
    Ok(())
}
