#![allow(variant_size_differences)]

use clap::{ArgAction, Args, Parser, ValueEnum};
use gitaroo::audio::transport::SubsongType;
use gitaroo::audio::LoadMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitaroo")]
#[command(about = "Gitaroo Man Audio Toolkit", version)]
pub struct Opt {
    /// Enables debug logging
    ///
    /// Use -vv to enable trace logging
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Converts a subsong between .sub.imc and .wav formats
    Convert(ConvertOpt),

    /// Prints information about a subsong or an IMC container
    Info(InfoOpt),

    /// Commands for working with IMC containers
    #[command(subcommand)]
    Imc(ImcCommand),
}

/// How the game loads a subsong.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LoadModeOpt {
    /// Stream the subsong in small blocks
    Stream,
    /// Load the whole subsong at once
    Entire,
}

impl From<LoadModeOpt> for LoadMode {
    fn from(mode: LoadModeOpt) -> Self {
        match mode {
            LoadModeOpt::Stream => Self::Stream,
            LoadModeOpt::Entire => Self::Entire,
        }
    }
}

/// A subsong file format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatOpt {
    /// Interleaved PS-ADPCM
    #[value(name = "sub.imc")]
    SubImc,
    /// 16-bit PCM WAV
    Wav,
}

impl From<FormatOpt> for SubsongType {
    fn from(format: FormatOpt) -> Self {
        match format {
            FormatOpt::SubImc => Self::SubImc,
            FormatOpt::Wav => Self::Wav,
        }
    }
}

#[derive(Args)]
pub struct ConvertOpt {
    /// Block layout to use when writing a .sub.imc file (default: keep the input's layout, or
    /// stream if there isn't one)
    #[arg(long, value_enum, value_name("MODE"))]
    pub mode: Option<LoadModeOpt>,

    /// Path of the subsong to read (.sub.imc or .wav)
    pub input: PathBuf,

    /// Path of the subsong to write (.sub.imc or .wav)
    pub output: PathBuf,
}

#[derive(Args)]
pub struct InfoOpt {
    /// Path to a .sub.imc, .wav, or .imc file
    pub path: PathBuf,
}

#[derive(clap::Subcommand)]
pub enum ImcCommand {
    /// Lists the subsongs in an IMC container
    List(ImcListOpt),

    /// Extracts every subsong in an IMC container to a directory
    Extract(ImcExtractOpt),

    /// Replaces a subsong in an IMC container
    Replace(ImcReplaceOpt),

    /// Replaces one channel of a subsong in an IMC container
    ReplaceChannel(ImcReplaceChannelOpt),
}

#[derive(Args)]
pub struct ImcListOpt {
    /// Path to the IMC container
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ImcExtractOpt {
    /// The directory to write subsongs to (defaults to the container name)
    #[arg(short, value_name("DIR"))]
    pub output: Option<PathBuf>,

    /// The format to extract subsongs as
    #[arg(long, value_enum, default_value_t = FormatOpt::SubImc)]
    pub format: FormatOpt,

    /// Path to the IMC container
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ImcReplaceOpt {
    /// Path to write the new container to (defaults to overwriting the input)
    #[arg(short, value_name("PATH"))]
    pub output: Option<PathBuf>,

    /// Path to the IMC container
    pub path: PathBuf,

    /// Name of the subsong to replace
    pub name: String,

    /// Path of the new subsong (.sub.imc or .wav)
    pub subsong: PathBuf,
}

#[derive(Args)]
pub struct ImcReplaceChannelOpt {
    /// Path to write the new container to (defaults to overwriting the input)
    #[arg(short, value_name("PATH"))]
    pub output: Option<PathBuf>,

    /// Path to the IMC container
    pub path: PathBuf,

    /// Name of the subsong to edit
    pub name: String,

    /// Index of the channel to replace, starting at 0
    pub channel: usize,

    /// Path of the subsong whose first channel will be used (.sub.imc or .wav)
    pub subsong: PathBuf,
}
