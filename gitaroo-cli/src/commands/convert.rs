use crate::opt::ConvertOpt;
use anyhow::{Context, Result};
use gitaroo::audio::transport::{self, SubsongType};
use gitaroo::audio::LoadMode;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};

/// The `convert` CLI command.
pub fn command(opt: ConvertOpt) -> Result<()> {
    let output_type = SubsongType::from_path(&opt.output)?;
    info!("Reading subsong: {}", opt.input.display());
    let mut subsong = transport::read_subsong(&opt.input)
        .with_context(|| format!("failed to read {}", opt.input.display()))?;
    info!(
        "Converting {} channel(s) at {} Hz to {}",
        subsong.num_channels(),
        subsong.sample_rate(),
        output_type.extension()
    );

    info!("Writing subsong: {}", opt.output.display());
    match (output_type, opt.mode) {
        (SubsongType::SubImc, Some(mode)) => {
            // An explicit mode overrides whatever layout the input had
            subsong.set_original_layout(None);
            let mode = LoadMode::from(mode);
            let mut writer = BufWriter::new(File::create(&opt.output)?);
            subsong.write_to(&mut writer, mode)?;
            writer.flush()?;
        }
        _ => transport::write_subsong(&subsong, &opt.output)?,
    }
    Ok(())
}
