//! IMC audio containers, which bundle several named subsongs into one file.

use super::{Error, LoadMode, Result, Subsong};
use crate::common::{ReadFrom, ReadSeek, WriteSeek, WriteTo};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, SeekFrom, Write};
use tracing::{debug, instrument};

/// The maximum length of a subsong name.
pub const MAX_NAME_LEN: usize = 16;

/// The size of each entry in the subsong table.
const ENTRY_SIZE: u64 = 0x20;

/// An entry in the subsong table at the start of the container.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct SubsongEntry {
    raw_name: [u8; MAX_NAME_LEN],
    offset: u32,
    unk1: u32,
    unk2: u32,
    load_mode: u32,
}

impl<R: Read + ?Sized> ReadFrom<R> for SubsongEntry {
    type Error = Error;
    fn read_from(reader: &mut R) -> Result<Self> {
        Ok(Self {
            raw_name: <[u8; MAX_NAME_LEN]>::read_from(reader)?,
            offset: reader.read_u32::<LE>()?,
            unk1: reader.read_u32::<LE>()?,
            unk2: reader.read_u32::<LE>()?,
            load_mode: reader.read_u32::<LE>()?,
        })
    }
}

impl<W: Write + ?Sized> WriteTo<W> for SubsongEntry {
    type Error = Error;
    fn write_to(&self, writer: &mut W) -> Result<()> {
        self.raw_name.write_to(writer)?;
        writer.write_u32::<LE>(self.offset)?;
        writer.write_u32::<LE>(self.unk1)?;
        writer.write_u32::<LE>(self.unk2)?;
        writer.write_u32::<LE>(self.load_mode)?;
        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_ascii() && name.len() <= MAX_NAME_LEN {
        Ok(())
    } else {
        Err(Error::InvalidSubsongName(name.to_owned()))
    }
}

/// A subsong inside an IMC container, along with the information the container stores for it.
///
/// Besides the name and load mode, the container keeps a few fields that the game doesn't need
/// but which are preserved when a container is rebuilt so that the new file differs from the old
/// one as little as possible. These are the raw name bytes (which can have garbage after the name)
/// and two unknown values. `clear_patch_info()` discards them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSubsong {
    subsong: Subsong,
    name: String,
    load_mode: LoadMode,
    raw_name: Option<[u8; MAX_NAME_LEN]>,
    unk1: Option<u32>,
    unk2: Option<u32>,
}

impl ContainerSubsong {
    /// Creates a new `ContainerSubsong`. Fails if `name` is not ASCII or is too long.
    pub fn new(subsong: Subsong, name: impl Into<String>, load_mode: LoadMode) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self { subsong, name, load_mode, raw_name: None, unk1: None, unk2: None })
    }

    pub fn subsong(&self) -> &Subsong {
        &self.subsong
    }

    pub fn subsong_mut(&mut self) -> &mut Subsong {
        &mut self.subsong
    }

    /// Replaces the subsong, returning the old one.
    pub fn replace_subsong(&mut self, subsong: Subsong) -> Subsong {
        std::mem::replace(&mut self.subsong, subsong)
    }

    pub fn into_subsong(self) -> Subsong {
        self.subsong
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the subsong. Fails if `name` is not ASCII or is too long.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn load_mode(&self) -> LoadMode {
        self.load_mode
    }

    pub fn set_load_mode(&mut self, load_mode: LoadMode) {
        self.load_mode = load_mode;
    }

    /// The name bytes as they were stored in the container, if they are being kept.
    pub fn raw_name(&self) -> Option<&[u8; MAX_NAME_LEN]> {
        self.raw_name.as_ref()
    }

    pub fn set_raw_name(&mut self, raw_name: Option<[u8; MAX_NAME_LEN]>) {
        self.raw_name = raw_name;
    }

    /// The two unknown values stored alongside the subsong, if they are being kept.
    pub fn unknowns(&self) -> (Option<u32>, Option<u32>) {
        (self.unk1, self.unk2)
    }

    pub fn set_unknowns(&mut self, unk1: Option<u32>, unk2: Option<u32>) {
        self.unk1 = unk1;
        self.unk2 = unk2;
    }

    /// Discards the raw name, the unknown values, and the subsong's original block layout.
    pub fn clear_patch_info(&mut self) {
        self.raw_name = None;
        self.unk1 = None;
        self.unk2 = None;
        self.subsong.set_original_layout(None);
    }

    /// Serializes the subsong using its own load mode.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.subsong.serialize(self.load_mode)
    }

    /// Builds the name bytes to store in the container. The name is written over the raw name
    /// if there is one so that any bytes after the terminator survive.
    fn name_bytes(&self) -> [u8; MAX_NAME_LEN] {
        let mut bytes = self.raw_name.unwrap_or_default();
        let name = self.name.as_bytes();
        bytes[..name.len()].copy_from_slice(name);
        if name.len() < MAX_NAME_LEN {
            bytes[name.len()] = 0;
        }
        bytes
    }
}

type ProgressCallback<'a> = Box<dyn FnMut(usize, usize, &ContainerSubsong) + 'a>;

/// An IMC audio container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImcContainer {
    subsongs: Vec<ContainerSubsong>,
}

impl ImcContainer {
    /// Creates a new `ImcContainer` holding `subsongs`.
    pub fn new(subsongs: Vec<ContainerSubsong>) -> Self {
        Self { subsongs }
    }

    pub fn subsongs(&self) -> &[ContainerSubsong] {
        &self.subsongs
    }

    pub fn subsongs_mut(&mut self) -> &mut [ContainerSubsong] {
        &mut self.subsongs
    }

    pub fn into_subsongs(self) -> Vec<ContainerSubsong> {
        self.subsongs
    }

    pub fn len(&self) -> usize {
        self.subsongs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsongs.is_empty()
    }

    /// Looks up a subsong by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&ContainerSubsong> {
        self.subsongs.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Looks up a subsong by name, ignoring case.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut ContainerSubsong> {
        self.subsongs.iter_mut().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Reads a container starting at the reader's current position. Subsong offsets are relative
    /// to that position and the last subsong is assumed to end at the end of the stream.
    #[instrument(level = "trace", skip_all)]
    pub fn read_from<R: ReadSeek + ?Sized>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))? - start;
        reader.seek(SeekFrom::Start(start))?;

        let num_subsongs = reader.read_u32::<LE>()? as usize;
        let table_end = 4 + ENTRY_SIZE * num_subsongs as u64;
        if table_end > end {
            return Err(Error::TruncatedData { expected: table_end, available: end });
        }
        let mut entries = vec![SubsongEntry::default(); num_subsongs];
        SubsongEntry::read_all_from(reader, &mut entries)?;
        debug!("Reading IMC container with {} subsong(s)", num_subsongs);

        // Every offset must be in bounds before any subsong is read so that each one's size is too
        for (index, entry) in entries.iter().enumerate() {
            let offset = u64::from(entry.offset);
            let next = entries.get(index + 1).map_or(end, |e| u64::from(e.offset));
            if offset < table_end || offset > end || offset > next {
                return Err(Error::InvalidSubsongOffset { index, offset: entry.offset });
            }
        }

        let mut subsongs = Vec::with_capacity(num_subsongs);
        for (index, entry) in entries.iter().enumerate() {
            let offset = u64::from(entry.offset);
            let next = entries.get(index + 1).map_or(end, |e| u64::from(e.offset));
            let name_len = entry.raw_name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
            let name = String::from_utf8_lossy(&entry.raw_name[..name_len]).into_owned();
            let load_mode = LoadMode::try_from(entry.load_mode)
                .map_err(|_| Error::InvalidLoadMode(entry.load_mode))?;
            debug!(
                "Reading subsong {:?} at {:#x} ({} bytes, {})",
                name,
                offset,
                next - offset,
                load_mode
            );

            reader.seek(SeekFrom::Start(start + offset))?;
            let subsong = Subsong::read_from(reader, Some(next - offset))?;
            let mut subsong = ContainerSubsong::new(subsong, name, load_mode)?;
            subsong.raw_name = Some(entry.raw_name);
            subsong.unk1 = Some(entry.unk1);
            subsong.unk2 = Some(entry.unk2);
            subsongs.push(subsong);
        }
        Ok(Self { subsongs })
    }

    /// Writes the container starting at the writer's current position.
    pub fn write_to<W: WriteSeek + ?Sized>(&self, writer: &mut W) -> Result<()> {
        ImcWriter::new(self).write_to(writer)
    }
}

/// Writes an `ImcContainer` with progress reporting.
pub struct ImcWriter<'a> {
    container: &'a ImcContainer,
    on_progress: Option<ProgressCallback<'a>>,
}

impl<'a> ImcWriter<'a> {
    /// Creates a new `ImcWriter` which writes `container`.
    pub fn new(container: &'a ImcContainer) -> Self {
        Self { container, on_progress: None }
    }

    /// Sets a callback to run before each subsong is written. It receives the subsong's index,
    /// the total number of subsongs, and the subsong itself.
    #[must_use]
    pub fn on_progress(
        mut self,
        callback: impl FnMut(usize, usize, &ContainerSubsong) + 'a,
    ) -> Self {
        self.on_progress = Some(Box::from(callback));
        self
    }

    /// Writes the container to `writer`. The subsong table is filled in after all of the subsongs
    /// are written, and the writer is left at the end of the container.
    #[instrument(level = "trace", skip_all)]
    pub fn write_to<W: WriteSeek + ?Sized>(mut self, writer: &mut W) -> Result<()> {
        let subsongs = &self.container.subsongs;
        let num_subsongs = subsongs.len();
        let start = writer.stream_position()?;
        writer.write_u32::<LE>(num_subsongs as u32)?;
        if num_subsongs == 0 {
            return Ok(());
        }

        let table_offset = writer.stream_position()?;
        let mut entries = vec![SubsongEntry::default(); num_subsongs];
        SubsongEntry::write_all_to(writer, &entries)?;

        for (index, (subsong, entry)) in subsongs.iter().zip(&mut entries).enumerate() {
            if let Some(callback) = &mut self.on_progress {
                callback(index, num_subsongs, subsong);
            }
            let offset = writer.stream_position()? - start;
            debug!("Writing subsong {:?} at {:#x}", subsong.name, offset);
            *entry = SubsongEntry {
                raw_name: subsong.name_bytes(),
                offset: offset as u32,
                unk1: subsong.unk1.unwrap_or(0),
                unk2: subsong.unk2.unwrap_or(0),
                load_mode: subsong.load_mode.into(),
            };
            subsong.subsong.write_to(writer, subsong.load_mode)?;
        }

        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(table_offset))?;
        SubsongEntry::write_all_to(writer, &entries)?;
        writer.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}
