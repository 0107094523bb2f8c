use super::*;
use crate::audio::{Channel, Error, PcmChannel, Result, Subsong};
use crate::common::{align, ReadFrom, ReadSeek};
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, instrument, trace};

/// Walks the chunks inside a RIFF form.
struct RiffReader<'a> {
    /// The inner reader.
    reader: Box<dyn ReadSeek + 'a>,
    /// The RIFF data's form ID.
    form: u32,
    /// The offset of the next chunk header.
    next_offset: u64,
    /// The offset where the form's data ends.
    end_offset: u64,
}

impl<'a> RiffReader<'a> {
    /// Opens a RIFF form, reading the header from `reader`.
    fn open_form(mut reader: Box<dyn ReadSeek + 'a>) -> Result<Self> {
        let header = ChunkHeader::read_from(&mut reader)?;
        if header.id != ID_RIFF {
            return Err(Error::InvalidRiff);
        }
        let form = reader.read_u32::<LE>()?;
        let next_offset = reader.stream_position()?;
        // The form size includes the form ID
        let end_offset = next_offset - 4 + u64::from(header.size);
        Ok(Self { reader, form, next_offset, end_offset })
    }

    /// Reads the next chunk header and returns it along with the offset of the chunk's data.
    /// Returns `None` at the end of the form.
    fn next_chunk(&mut self) -> Result<Option<(ChunkHeader, u64)>> {
        if self.next_offset + CHUNK_HEADER_SIZE > self.end_offset {
            return Ok(None);
        }
        self.reader.seek(SeekFrom::Start(self.next_offset))?;
        let header = match ChunkHeader::read_from(&mut self.reader) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let data_offset = self.next_offset + CHUNK_HEADER_SIZE;
        self.next_offset = align(data_offset + u64::from(header.size), RIFF_ALIGN);
        Ok(Some((header, data_offset)))
    }

    /// Reads up to `size` bytes of chunk data at `offset`. Chunks which are cut off by the end of
    /// the stream are read up to the end.
    fn read_chunk(&mut self, offset: u64, size: u32) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut data = Vec::with_capacity(size as usize);
        (&mut self.reader).take(u64::from(size)).read_to_end(&mut data)?;
        if data.len() < size as usize {
            debug!(
                "Chunk at {:#x} is truncated: expected {:#x} bytes, got {:#x}",
                offset,
                size,
                data.len()
            );
        }
        Ok(data)
    }
}

/// Reads 16-bit PCM WAV data into a `Subsong`.
pub struct WavReader<'a> {
    /// The reader open on the RIFF form.
    riff: RiffReader<'a>,
    /// An id -> (offset, size) mapping for each chunk in the form.
    chunks: HashMap<u32, (u64, u32)>,
    /// The format of the audio data.
    format: FormatChunk,
}

impl<'a> WavReader<'a> {
    /// Opens the WAV data provided by `reader` and reads its header.
    pub fn new(reader: impl ReadSeek + 'a) -> Result<Self> {
        Self::new_impl(Box::from(reader))
    }

    #[instrument(level = "trace", skip_all)]
    fn new_impl(reader: Box<dyn ReadSeek + 'a>) -> Result<Self> {
        let riff = RiffReader::open_form(reader)?;
        if riff.form != ID_WAVE {
            return Err(Error::InvalidWav);
        }
        let mut wav = Self { riff, chunks: HashMap::new(), format: FormatChunk::default() };
        wav.read_chunks()?;
        wav.read_format()?;
        Ok(wav)
    }

    /// The number of channels in the audio data.
    pub fn channels(&self) -> usize {
        self.format.channels.into()
    }

    /// The audio's sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.format.samples_per_sec
    }

    /// Iterates over the chunks in the WAV data and builds the chunk offset map.
    fn read_chunks(&mut self) -> Result<()> {
        while let Some((header, offset)) = self.riff.next_chunk()? {
            trace!("Found chunk {:#x} at {:#x} ({:#x} bytes)", header.id, offset, header.size);
            if self.chunks.insert(header.id, (offset, header.size)).is_some() {
                debug!("Duplicate WAV chunk {:#x}", header.id);
                return Err(Error::InvalidWav);
            }
        }
        Ok(())
    }

    /// Reads and validates format parameters from the fmt chunk.
    fn read_format(&mut self) -> Result<()> {
        let Some(&(offset, size)) = self.chunks.get(&ID_FMT) else {
            debug!("WAV data is missing a fmt chunk");
            return Err(Error::InvalidWav);
        };
        let data = self.riff.read_chunk(offset, size)?;
        let format = FormatChunk::read_from(&mut data.as_slice())?;
        trace!("fmt chunk: {:?}", format);
        if format.format_tag != WAVE_FORMAT_PCM {
            debug!("Unsupported WAV audio format {:#x}", format.format_tag);
            return Err(Error::InvalidWav);
        }
        if format.bits_per_sample != 16 {
            return Err(Error::UnsupportedSampleFormat(format.bits_per_sample));
        }
        if format.channels == 0 {
            debug!("WAV data has no channels");
            return Err(Error::InvalidWav);
        }
        self.format = format;
        Ok(())
    }

    /// Reads the sample data and splits it into one `PcmChannel` per channel.
    #[instrument(level = "trace", skip_all)]
    pub fn read_subsong(mut self) -> Result<Subsong> {
        let Some(&(offset, size)) = self.chunks.get(&ID_DATA) else {
            debug!("WAV data is missing a data chunk");
            return Err(Error::InvalidWav);
        };
        let data = self.riff.read_chunk(offset, size)?;

        let num_channels = self.channels();
        let frame_size = num_channels * 2;
        let num_samples = data.len() / frame_size;
        let mut channels: Vec<Vec<i16>> =
            (0..num_channels).map(|_| Vec::with_capacity(num_samples)).collect();
        for frame in data.chunks_exact(frame_size) {
            for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(2)) {
                channel.push(i16::from_le_bytes([sample[0], sample[1]]));
            }
        }
        debug!(
            "Read {} samples from {} channel(s) of WAV data at {} Hz",
            num_samples,
            num_channels,
            self.sample_rate()
        );

        let channels = channels.into_iter().map(|c| Channel::from(PcmChannel::new(c))).collect();
        Subsong::new(channels, self.sample_rate())
    }
}
