use anyhow::Result;
use simplelog::{Color, ColorChoice, ConfigBuilder, Level, LevelFilter, TermLogger, TerminalMode};
use time::macros::format_description;

/// Initializes logging to the terminal.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = if verbosity >= 2 {
        LevelFilter::Trace
    } else if verbosity == 1 {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Trace)
        .set_time_format_custom(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        ))
        .set_level_color(Level::Info, Some(Color::Green))
        .build();
    TermLogger::init(filter, config, TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}
