use anyhow::Result;
use gitaroo::audio::transport::{read_subsong, write_subsong};
use gitaroo::audio::{BlockLayout, ChannelData};
use gitaroo_cli::commands::convert;
use gitaroo_cli::opt::{ConvertOpt, LoadModeOpt};
use gitaroo_test as common;
use tempfile::TempDir;

#[test]
fn test_convert_wav_to_subimc_and_back() -> Result<()> {
    common::init_logging();
    let dir = TempDir::new()?;
    let wav_path = dir.path().join("song.wav");
    let imc_path = dir.path().join("song.sub.imc");
    let out_path = dir.path().join("song_out.wav");
    let source = common::pcm_subsong(2, 3000, 44100)?;
    write_subsong(&source, &wav_path)?;

    convert::command(ConvertOpt { mode: None, input: wav_path, output: imc_path.clone() })?;
    let encoded = read_subsong(&imc_path)?;
    assert_eq!(encoded.num_channels(), 2);
    assert_eq!(encoded.original_layout(), Some(BlockLayout::streaming(encoded.frame_count())));

    convert::command(ConvertOpt { mode: None, input: imc_path, output: out_path.clone() })?;
    let decoded = read_subsong(&out_path)?;
    for (expected, actual) in source.channels().iter().zip(decoded.channels()) {
        let (expected, actual) = (expected.pcm_samples()?, actual.pcm_samples()?);
        assert!(common::max_difference(&expected, &actual) <= 1024);
    }
    Ok(())
}

#[test]
fn test_convert_with_mode() -> Result<()> {
    common::init_logging();
    let dir = TempDir::new()?;
    let stream_path = dir.path().join("stream.sub.imc");
    let entire_path = dir.path().join("entire.sub.imc");
    write_subsong(&common::pcm_subsong(1, 50000, 22050)?, &stream_path)?;
    let frames = read_subsong(&stream_path)?.frame_count();

    let opt = ConvertOpt {
        mode: Some(LoadModeOpt::Entire),
        input: stream_path,
        output: entire_path.clone(),
    };
    convert::command(opt)?;
    let entire = read_subsong(&entire_path)?;
    assert_eq!(entire.original_layout(), Some(BlockLayout::entire(frames)));
    Ok(())
}

#[test]
fn test_convert_unknown_extension() -> Result<()> {
    let dir = TempDir::new()?;
    let opt = ConvertOpt {
        mode: None,
        input: dir.path().join("song.wav"),
        output: dir.path().join("song.flac"),
    };
    assert!(convert::command(opt).is_err());
    Ok(())
}
