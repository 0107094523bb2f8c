use crate::common::{format_duration, read_container};
use crate::opt::InfoOpt;
use anyhow::Result;
use gitaroo::audio::transport::{self, SubsongType};
use gitaroo::audio::{LoadMode, Subsong};
use std::path::Path;

/// Returns true if `path` looks like an IMC container rather than a single subsong.
fn is_container(path: &Path) -> bool {
    let is_imc = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("imc"));
    is_imc && SubsongType::from_path(path).is_err()
}

/// Prints the properties of a subsong.
fn print_subsong(subsong: &Subsong) {
    println!("Channels: {}", subsong.num_channels());
    println!("Sample Rate: {} Hz", subsong.sample_rate());
    println!("Frames: {}", subsong.frame_count());
    println!(
        "Duration: {}",
        format_duration(subsong.duration_samples(), subsong.sample_rate())
    );
    match subsong.original_layout() {
        Some(layout) => println!(
            "Block Layout: {} blocks of {} frames per channel",
            layout.blocks_per_channel, layout.frames_per_block
        ),
        None => {
            let layout = subsong.block_layout(LoadMode::Stream);
            println!(
                "Block Layout: none ({} blocks of {} frames per channel when streamed)",
                layout.blocks_per_channel, layout.frames_per_block
            );
        }
    }
}

/// Prints the subsong table of an IMC container.
fn print_container(path: &Path) -> Result<()> {
    let container = read_container(path)?;
    println!("Subsongs: {}", container.len());
    for (i, entry) in container.subsongs().iter().enumerate() {
        let (unk1, unk2) = entry.unknowns();
        println!(
            "{:>3}: {:<16} {:<6} unk1={:#x} unk2={:#x}{}",
            i,
            entry.name(),
            entry.load_mode(),
            unk1.unwrap_or(0),
            unk2.unwrap_or(0),
            if entry.raw_name().is_some() { "" } else { " (no raw name)" }
        );
    }
    Ok(())
}

/// The `info` CLI command.
pub fn command(opt: InfoOpt) -> Result<()> {
    let name = opt.path.file_name().unwrap_or_default().to_string_lossy();
    if is_container(&opt.path) {
        println!("{}: IMC container", name);
        return print_container(&opt.path);
    }
    let subsong = transport::read_subsong(&opt.path)?;
    println!("{}: subsong", name);
    print_subsong(&subsong);
    Ok(())
}
