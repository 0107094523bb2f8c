pub mod subimc;
pub mod wav;

pub use subimc::{read_subimc, write_subimc};
pub use wav::{WavReader, WavWriter};

use crate::audio::{Error, Result, Subsong};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// The file formats which can hold a single subsong.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SubsongType {
    /// An interleaved PS-ADPCM subsong (`.sub.imc`).
    SubImc,
    /// A 16-bit PCM WAV file (`.wav`).
    Wav,
}

impl SubsongType {
    /// Determines the subsong type from the extension on `path`, ignoring case.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase());
        match name {
            Some(n) if n.ends_with(".sub.imc") => Ok(Self::SubImc),
            Some(n) if n.ends_with(".wav") => Ok(Self::Wav),
            _ => Err(Error::UnknownSubsongType(path.display().to_string())),
        }
    }

    /// The file extension for this type, without a leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::SubImc => "sub.imc",
            Self::Wav => "wav",
        }
    }
}

/// Reads a subsong from the file at `path`, choosing the format based on its extension.
pub fn read_subsong(path: impl AsRef<Path>) -> Result<Subsong> {
    let path = path.as_ref();
    let ty = SubsongType::from_path(path)?;
    debug!("Reading {:?} subsong from {}", ty, path.display());
    let mut reader = BufReader::new(File::open(path)?);
    match ty {
        SubsongType::SubImc => read_subimc(&mut reader),
        SubsongType::Wav => WavReader::new(reader)?.read_subsong(),
    }
}

/// Writes `subsong` to a file at `path`, choosing the format based on its extension.
pub fn write_subsong(subsong: &Subsong, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let ty = SubsongType::from_path(path)?;
    debug!("Writing {:?} subsong to {}", ty, path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    match ty {
        SubsongType::SubImc => write_subimc(subsong, &mut writer)?,
        SubsongType::Wav => WavWriter::new(subsong).write_to(&mut writer)?,
    }
    writer.flush()?;
    Ok(())
}
