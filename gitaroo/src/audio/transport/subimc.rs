//! Standalone `.sub.imc` files, which hold a single interleaved subsong.

use crate::audio::{LoadMode, Result, Subsong};
use crate::common::ReadSeek;
use std::io::Write;

/// Reads a `.sub.imc` subsong which extends to the end of `reader`.
pub fn read_subimc<R: ReadSeek + ?Sized>(reader: &mut R) -> Result<Subsong> {
    Subsong::read_from(reader, None)
}

/// Writes `subsong` as a `.sub.imc` file. Subsongs without an original block layout are laid out
/// for streaming.
pub fn write_subimc<W: Write + ?Sized>(subsong: &Subsong, writer: &mut W) -> Result<()> {
    subsong.write_to(writer, LoadMode::Stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::adpcm::{BYTES_PER_FRAME, END_FRAME};
    use crate::audio::{AdpcmChannel, BlockLayout, ChannelData, Error, PcmChannel};
    use std::io::{Cursor, Seek, SeekFrom};

    fn test_subsong() -> Result<Subsong> {
        let left = PcmChannel::new((0..100).map(|i| i * 100).collect());
        let right = PcmChannel::new((0..100).map(|i| i * -100).collect());
        Subsong::new(vec![left.into(), right.into()], 44100)
    }

    #[test]
    fn test_write_and_read_subimc() -> Result<()> {
        let subsong = test_subsong()?;
        let mut cursor = Cursor::new(Vec::<u8>::new());
        write_subimc(&subsong, &mut cursor)?;
        let bytes = cursor.into_inner();
        // 2 channels, 1 streaming block each
        assert_eq!(bytes.len(), 16 + 2 * 768 * BYTES_PER_FRAME);

        let read = read_subimc(&mut Cursor::new(&bytes))?;
        assert_eq!(read.num_channels(), 2);
        assert_eq!(read.sample_rate(), 44100);
        assert_eq!(read.original_layout(), Some(BlockLayout::new(768, 1)));
        for (original, channel) in subsong.channels().iter().zip(read.channels()) {
            assert_eq!(channel.adpcm_frames(), original.adpcm_frames());
        }
        Ok(())
    }

    #[test]
    fn test_read_subimc_from_offset() -> Result<()> {
        let subsong = Subsong::new(vec![AdpcmChannel::new(vec![])?.into()], 22050)?;
        let mut cursor = Cursor::new(vec![0xffu8; 4]);
        cursor.seek(SeekFrom::End(0))?;
        write_subimc(&subsong, &mut cursor)?;

        cursor.seek(SeekFrom::Start(4))?;
        let read = read_subimc(&mut cursor)?;
        assert_eq!(read.channels()[0].adpcm_frames(), END_FRAME.as_slice());
        Ok(())
    }

    #[test]
    fn test_read_subimc_truncated() -> Result<()> {
        let mut bytes = Vec::new();
        write_subimc(&test_subsong()?, &mut bytes)?;
        bytes.truncate(bytes.len() - 1);
        let result = read_subimc(&mut Cursor::new(&bytes));
        assert!(matches!(result, Err(Error::TruncatedData { .. })));
        Ok(())
    }
}
