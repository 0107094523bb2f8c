use super::*;
use crate::audio::subsong::MAX_CHANNELS;
use crate::audio::{ChannelData, Error, Result, Subsong};
use crate::common::WriteTo;
use byteorder::{WriteBytesExt, LE};
use std::borrow::Cow;
use std::io::{self, Seek, SeekFrom, Write};
use tracing::level_filters::STATIC_MAX_LEVEL;
use tracing::{debug, instrument, Level};

const DEFAULT_SOFTWARE_NAME: &str = concat!("gitaroo v", env!("CARGO_PKG_VERSION"));

/// Wraps a writer and provides methods for writing RIFF chunks.
struct RiffWriter<W: Write + Seek> {
    /// The inner writer.
    writer: W,
}

impl<W: Write + Seek> RiffWriter<W> {
    /// Creates a new `RiffWriter` which wraps `writer`.
    fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a RIFF form with type `form_type` whose chunks are written by `body`.
    fn write_form(
        &mut self,
        form_type: u32,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.write_chunk(ID_RIFF, |riff| {
            riff.writer.write_u32::<LE>(form_type)?;
            body(riff)
        })
    }

    /// Writes a chunk with ID `id` whose data is written by `body`.
    fn write_chunk(&mut self, id: u32, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        // Write a header with the size set to 0 for now and come back to it once the size is known
        let offset = self.writer.stream_position()?;
        ChunkHeader { id, size: 0 }.write_to(&mut self.writer)?;
        body(self)?;

        let end_offset = self.writer.stream_position()?;
        let Ok(size) = u32::try_from(end_offset - offset - CHUNK_HEADER_SIZE) else {
            debug!("Chunk {:#x} is too large for RIFF: {:#x} bytes", id, end_offset - offset);
            return Err(Error::InvalidWav);
        };
        self.writer.seek(SeekFrom::Start(offset))?;
        ChunkHeader { id, size }.write_to(&mut self.writer)?;

        self.writer.seek(SeekFrom::Start(end_offset))?;
        if end_offset % RIFF_ALIGN != 0 {
            // Chunks which are not word-aligned need a padding byte at the end
            self.writer.write_u8(0)?;
        }
        Ok(())
    }
}

impl<W: Write + Seek> Write for RiffWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Writes a subsong out as a 16-bit PCM WAV file.
///
/// Every channel is decoded to PCM first. Channels shorter than the longest one are padded with
/// silence so that all of them line up.
pub struct WavWriter<'a> {
    subsong: &'a Subsong,
    software_name: Cow<'static, str>,
}

impl<'a> WavWriter<'a> {
    /// Creates a new `WavWriter` which writes `subsong`.
    pub fn new(subsong: &'a Subsong) -> Self {
        Self { subsong, software_name: DEFAULT_SOFTWARE_NAME.into() }
    }

    /// Sets the software name to write to the `INFO` chunk.
    pub fn software_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.software_name = Cow::Owned(name.into());
        self
    }

    /// Prepares the final WAV file and writes it to `writer`.
    #[instrument(level = "trace", skip_all)]
    pub fn write_to(&self, writer: (impl Write + Seek)) -> Result<()> {
        let num_channels = self.subsong.num_channels();
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(Error::InvalidChannelCount(num_channels));
        }
        let channels =
            self.subsong.channels().iter().map(|c| c.pcm_samples()).collect::<Result<Vec<_>>>()?;

        let mut riff = RiffWriter::new(writer);
        riff.write_form(ID_WAVE, |riff| {
            self.write_format(riff)?;
            self.write_info(riff)?;
            self.write_data(riff, &channels)
        })
    }

    /// Writes the `fmt ` chunk.
    fn write_format(&self, riff: &mut RiffWriter<impl Write + Seek>) -> Result<()> {
        let channels = self.subsong.num_channels() as u16;
        let sample_rate = self.subsong.sample_rate();
        let block_align = channels * 2;
        let format = FormatChunk {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            samples_per_sec: sample_rate,
            avg_bytes_per_sec: sample_rate * u32::from(block_align),
            block_align,
            bits_per_sample: 16,
        };
        riff.write_chunk(ID_FMT, |riff| Ok(format.write_to(riff)?))
    }

    /// Writes an `INFO` chunk with our program name.
    fn write_info(&self, riff: &mut RiffWriter<impl Write + Seek>) -> Result<()> {
        riff.write_chunk(ID_LIST, |riff| {
            riff.write_u32::<LE>(ID_INFO)?;
            riff.write_chunk(ID_ISFT, |riff| {
                riff.write_all(self.software_name.as_bytes())?;
                riff.write_u8(0)?;
                Ok(())
            })
        })
    }

    /// Writes the `data` chunk, interleaving samples from each channel.
    fn write_data(
        &self,
        riff: &mut RiffWriter<impl Write + Seek>,
        channels: &[Cow<'_, [i16]>],
    ) -> Result<()> {
        let num_samples = channels.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut data = Vec::with_capacity(num_samples * channels.len() * 2);
        for i in 0..num_samples {
            for channel in channels {
                let sample = channel.get(i).copied().unwrap_or(0);
                data.extend(sample.to_le_bytes());
            }
        }
        riff.write_chunk(ID_DATA, |riff| Ok(riff.write_all(&data)?))?;

        if STATIC_MAX_LEVEL >= Level::DEBUG {
            let duration = (num_samples as f64) / f64::from(self.subsong.sample_rate());
            let hour = (duration as usize) / 60 / 60;
            let min = (duration as usize) / 60 % 60;
            let sec = (duration as usize) % 60;
            let msec = (duration.fract() * 1000.0).round() as usize;
            debug!(
                "Wrote {} samples from {} channel(s) to WAV ({:>02}:{:>02}:{:>02}.{:>03})",
                num_samples,
                channels.len(),
                hour,
                min,
                sec,
                msec
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::adpcm;
    use crate::audio::{AdpcmChannel, Channel, PcmChannel};
    use std::io::Cursor;

    #[rustfmt::skip]
    const EXPECTED_WAV: &[u8] = &[
        b'R', b'I', b'F', b'F', 0x4e, 0x00, 0x00, 0x00,
        b'W', b'A', b'V', b'E',

        b'f', b'm', b't', b' ', 0x10, 0x00, 0x00, 0x00,
        0x01, 0x00, // format_tag
        0x02, 0x00, // channels
        0x44, 0xac, 0x00, 0x00, // samples_per_sec
        0x10, 0xb1, 0x02, 0x00, // avg_bytes_per_sec
        0x04, 0x00, // block_align
        0x10, 0x00, // bits_per_sample

        b'L', b'I', b'S', b'T', 0x12, 0x00, 0x00, 0x00,
        b'I', b'N', b'F', b'O',
        b'I', b'S', b'F', b'T', 0x05, 0x00, 0x00, 0x00,
        b't', b'e', b's', b't', 0x00, 0x00, // software_name + padding

        b'd', b'a', b't', b'a', 0x10, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, // samples
        0x04, 0x00, 0x05, 0x00, 0x06, 0x00, 0x07, 0x00,
    ];

    fn pcm(samples: &[i16]) -> Channel {
        PcmChannel::new(samples.to_vec()).into()
    }

    #[test]
    fn test_write_wav() -> Result<()> {
        let subsong = Subsong::new(vec![pcm(&[0, 2, 4, 6]), pcm(&[1, 3, 5, 7])], 44100)?;
        let mut cursor = Cursor::new(Vec::<u8>::new());
        WavWriter::new(&subsong).software_name("test").write_to(&mut cursor)?;
        let bytes = cursor.into_inner();
        assert_eq!(bytes, EXPECTED_WAV);
        Ok(())
    }

    #[test]
    fn test_write_wav_pads_short_channels() -> Result<()> {
        let subsong = Subsong::new(vec![pcm(&[1, 2, 3]), pcm(&[-1])], 32000)?;
        let mut cursor = Cursor::new(Vec::<u8>::new());
        WavWriter::new(&subsong).write_to(&mut cursor)?;

        cursor.set_position(0);
        let read = WavReader::new(cursor)?.read_subsong()?;
        assert_eq!(read.sample_rate(), 32000);
        assert_eq!(read.channels()[0].pcm_samples()?, [1, 2, 3].as_slice());
        assert_eq!(read.channels()[1].pcm_samples()?, [-1, 0, 0].as_slice());
        Ok(())
    }

    #[test]
    fn test_write_wav_decodes_adpcm() -> Result<()> {
        let samples: Vec<i16> = (0..56).map(|i| ((i % 16) - 8) * 4096).collect();
        let channel = AdpcmChannel::new(adpcm::encode(&samples))?;
        let subsong = Subsong::new(vec![channel.into()], 48000)?;
        let mut cursor = Cursor::new(Vec::<u8>::new());
        WavWriter::new(&subsong).write_to(&mut cursor)?;

        cursor.set_position(0);
        let read = WavReader::new(cursor)?.read_subsong()?;
        let decoded = read.channels()[0].pcm_samples()?;
        // The end marker frame decodes to a frame of silence
        assert_eq!(decoded.len(), 56 + 28);
        assert_eq!(decoded[..56], samples);
        Ok(())
    }

    #[test]
    fn test_write_wav_no_channels() -> Result<()> {
        let subsong = Subsong::new(vec![], 44100)?;
        let result = WavWriter::new(&subsong).write_to(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(result, Err(Error::InvalidChannelCount(0))));
        Ok(())
    }
}
