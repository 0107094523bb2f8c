use crate::common::{find_subsong, read_container, sanitize_file_name, write_container};
use crate::opt::{ImcCommand, ImcExtractOpt, ImcListOpt, ImcReplaceChannelOpt, ImcReplaceOpt};
use anyhow::{bail, Context, Result};
use gitaroo::audio::transport::{self, SubsongType};
use gitaroo::audio::{ChannelData, Subsong};
use humansize::{FormatSize, BINARY};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// The `imc list` CLI command.
fn command_list(opt: ImcListOpt) -> Result<()> {
    let container = read_container(&opt.path)?;
    for entry in container.subsongs() {
        let subsong = entry.subsong();
        let size = entry.serialize()?.len();
        println!(
            "{:<16} {:<6} {}ch {:>5} Hz {:>10}",
            entry.name(),
            entry.load_mode(),
            subsong.num_channels(),
            subsong.sample_rate(),
            size.format_size(BINARY)
        );
    }
    Ok(())
}

/// The `imc extract` CLI command.
fn command_extract(opt: ImcExtractOpt) -> Result<()> {
    let container = read_container(&opt.path)?;
    let out_dir = match opt.output {
        Some(dir) => dir,
        None => opt.path.with_extension(""),
    };
    fs::create_dir_all(&out_dir)?;

    let ty = SubsongType::from(opt.format);
    for entry in container.subsongs() {
        let name = format!("{}.{}", sanitize_file_name(entry.name()), ty.extension());
        let path = out_dir.join(name);
        info!("Extracting {}", path.display());
        match ty {
            // Keep the subsong's own load mode instead of always streaming it
            SubsongType::SubImc => fs::write(&path, entry.serialize()?)?,
            SubsongType::Wav => transport::write_subsong(entry.subsong(), &path)?,
        }
    }
    info!("Extracted {} subsong(s) to {}", container.len(), out_dir.display());
    Ok(())
}

/// Reads a subsong file to import into a container.
fn read_import(path: &Path) -> Result<Subsong> {
    info!("Reading subsong: {}", path.display());
    transport::read_subsong(path).with_context(|| format!("failed to read {}", path.display()))
}

/// The `imc replace` CLI command.
fn command_replace(opt: ImcReplaceOpt) -> Result<()> {
    let mut container = read_container(&opt.path)?;
    let subsong = read_import(&opt.subsong)?;
    let entry = find_subsong(&mut container, &opt.name)?;
    let old = entry.replace_subsong(subsong);
    let new = entry.subsong();
    if new.num_channels() != old.num_channels() {
        warn!(
            "\"{}\" had {} channel(s) but the new subsong has {}",
            opt.name,
            old.num_channels(),
            new.num_channels()
        );
    }
    info!(
        "Replaced \"{}\" ({} frames -> {} frames)",
        opt.name,
        old.frame_count(),
        new.frame_count()
    );
    write_container(&container, opt.output.as_deref().unwrap_or(&opt.path))
}

/// The `imc replace-channel` CLI command.
fn command_replace_channel(opt: ImcReplaceChannelOpt) -> Result<()> {
    let mut container = read_container(&opt.path)?;
    let source = read_import(&opt.subsong)?;
    let source_rate = source.sample_rate();
    let Some(channel) = source.into_channels().into_iter().next() else {
        bail!("{} has no channels", opt.subsong.display());
    };

    let entry = find_subsong(&mut container, &opt.name)?;
    let subsong = entry.subsong_mut();
    if source_rate != subsong.sample_rate() {
        warn!(
            "\"{}\" is {} Hz but the new channel is {} Hz; it will play at the wrong speed",
            opt.name,
            subsong.sample_rate(),
            source_rate
        );
    }
    let frames = channel.frame_count();
    subsong.replace_channel(opt.channel, channel)?;
    info!("Replaced channel {} of \"{}\" ({} frames)", opt.channel, opt.name, frames);
    write_container(&container, opt.output.as_deref().unwrap_or(&opt.path))
}

/// Runs an `imc` subcommand.
pub fn command(opt: ImcCommand) -> Result<()> {
    match opt {
        ImcCommand::List(opt) => command_list(opt),
        ImcCommand::Extract(opt) => command_extract(opt),
        ImcCommand::Replace(opt) => command_replace(opt),
        ImcCommand::ReplaceChannel(opt) => command_replace_channel(opt),
    }
}
