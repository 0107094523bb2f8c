use anyhow::Result;
use gitaroo::audio::{Channel, PcmChannel, Subsong};
use simplelog::{Color, ColorChoice, ConfigBuilder, Level, LevelFilter, TermLogger, TerminalMode};
use std::f64::consts::TAU;
use std::sync::Once;
use tempfile::TempPath;
use time::macros::format_description;

/// The sample rate that synthesized audio uses unless a test needs something else.
pub const SAMPLE_RATE: u32 = 44100;

static INIT_LOGGING: Once = Once::new();

/// Configures logging at the beginning of a test.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let config = ConfigBuilder::new()
            .set_time_format_custom(format_description!(
                "[hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .set_level_color(Level::Info, Some(Color::Green))
            .build();
        TermLogger::init(LevelFilter::Debug, config, TerminalMode::Stderr, ColorChoice::Auto)
            .unwrap();
    });
}

/// Generates `len` samples of a sine wave at `frequency` Hz.
pub fn sine(len: usize, frequency: f64, sample_rate: u32, amplitude: f64) -> Vec<i16> {
    let step = TAU * frequency / f64::from(sample_rate);
    (0..len).map(|i| ((i as f64 * step).sin() * amplitude).round() as i16).collect()
}

/// Builds a PCM subsong with `num_channels` channels of `len` samples each. Every channel plays
/// a different tone so that mixing channels up is detectable.
pub fn pcm_subsong(num_channels: usize, len: usize, sample_rate: u32) -> Result<Subsong> {
    let channels = (0..num_channels)
        .map(|i| {
            let frequency = 220.0 * (i + 1) as f64;
            Channel::from(PcmChannel::new(sine(len, frequency, sample_rate, 12000.0)))
        })
        .collect();
    Ok(Subsong::new(channels, sample_rate)?)
}

/// Makes a path to a temporary file with `suffix` at the end of its name. The file is deleted
/// when the path is dropped.
pub fn temp_path(suffix: &str) -> Result<TempPath> {
    Ok(tempfile::Builder::new().prefix("gitaroo").suffix(suffix).tempfile()?.into_temp_path())
}

/// Returns the largest difference between corresponding samples of `a` and `b`.
pub fn max_difference(a: &[i16], b: &[i16]) -> i32 {
    a.iter().zip(b).map(|(&x, &y)| (i32::from(x) - i32::from(y)).abs()).max().unwrap_or(0)
}
