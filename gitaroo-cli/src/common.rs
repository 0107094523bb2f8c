use anyhow::{anyhow, Context, Result};
use gitaroo::audio::imc::ImcWriter;
use gitaroo::audio::{ContainerSubsong, ImcContainer};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::Path;

/// Formats a sample count as a `hh:mm:ss.mmm` duration.
pub fn format_duration(samples: u64, sample_rate: u32) -> String {
    let millis = samples * 1000 / u64::from(sample_rate.max(1));
    let hour = millis / 1000 / 60 / 60;
    let min = millis / 1000 / 60 % 60;
    let sec = millis / 1000 % 60;
    let msec = millis % 1000;
    format!("{:>02}:{:>02}:{:>02}.{:>03}", hour, min, sec, msec)
}

/// Replaces characters in a subsong name which can't safely go in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.() ".contains(c) { c } else { '_' })
        .collect();
    match sanitized.trim_matches(|c| c == '.' || c == ' ') {
        "" => "_".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

/// Reads an IMC container from `path`.
pub fn read_container(path: &Path) -> Result<ImcContainer> {
    info!("Opening IMC container: {}", path.display());
    let mut reader = BufReader::new(File::open(path)?);
    ImcContainer::read_from(&mut reader)
        .with_context(|| format!("failed to read IMC container {}", path.display()))
}

/// Writes `container` to `path`. The container is built in memory first so that a container can
/// be safely written over the file it was read from.
pub fn write_container(container: &ImcContainer, path: &Path) -> Result<()> {
    let mut cursor = Cursor::new(Vec::new());
    ImcWriter::new(container)
        .on_progress(|index, total, subsong| {
            debug!("Writing subsong {}/{}: {}", index + 1, total, subsong.name());
        })
        .write_to(&mut cursor)?;
    info!("Writing IMC container: {}", path.display());
    fs::write(path, cursor.into_inner())?;
    Ok(())
}

/// Looks up a subsong by name in `container`.
pub fn find_subsong<'a>(
    container: &'a mut ImcContainer,
    name: &str,
) -> Result<&'a mut ContainerSubsong> {
    container.find_mut(name).ok_or_else(|| anyhow!("No subsong named \"{}\"", name))
}
