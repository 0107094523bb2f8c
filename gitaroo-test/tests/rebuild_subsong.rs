use anyhow::Result;
use gitaroo::audio::adpcm::{self, BYTES_PER_FRAME, SAMPLES_PER_FRAME};
use gitaroo::audio::{AdpcmChannel, BlockLayout, ChannelData, LoadMode, Subsong};
use gitaroo_test::{self as common, SAMPLE_RATE};
use log::info;

#[test]
fn test_rebuild_streaming_subsong() -> Result<()> {
    common::init_logging();
    let original = common::pcm_subsong(2, 50000, SAMPLE_RATE)?;
    let bytes = original.serialize(LoadMode::Stream)?;

    // 50000 samples -> 1786 audio frames + the end marker -> 3 blocks of 768 frames
    let frames = 50000usize.div_ceil(SAMPLES_PER_FRAME) + 1;
    assert_eq!(original.frame_count(), frames);
    assert_eq!(bytes.len(), 16 + 2 * 3 * 768 * BYTES_PER_FRAME);

    let subsong = Subsong::deserialize(&bytes)?;
    assert_eq!(subsong.num_channels(), 2);
    assert_eq!(subsong.sample_rate(), SAMPLE_RATE);
    assert_eq!(subsong.frame_count(), frames);
    assert_eq!(subsong.original_layout(), Some(BlockLayout::new(768, 3)));

    info!("Rebuilding subsong");
    let rebuilt = subsong.serialize(LoadMode::Entire)?;
    assert_eq!(rebuilt, bytes);
    Ok(())
}

#[test]
fn test_rebuild_entire_subsong() -> Result<()> {
    common::init_logging();
    let original = common::pcm_subsong(1, 1000, 22050)?;
    let bytes = original.serialize(LoadMode::Entire)?;
    let frames = 1000usize.div_ceil(SAMPLES_PER_FRAME) + 1;
    assert_eq!(bytes.len(), 16 + frames * BYTES_PER_FRAME);

    let subsong = Subsong::deserialize(&bytes)?;
    assert_eq!(subsong.original_layout(), Some(BlockLayout::new(frames as u32, 1)));
    assert_eq!(subsong.serialize(LoadMode::Stream)?, bytes);
    Ok(())
}

#[test]
fn test_decode_deserialized_channels() -> Result<()> {
    common::init_logging();
    let original = common::pcm_subsong(3, 10000, SAMPLE_RATE)?;
    let subsong = Subsong::deserialize(&original.serialize(LoadMode::Stream)?)?;
    for (i, (source, channel)) in original.channels().iter().zip(subsong.channels()).enumerate() {
        info!("Checking channel {}", i);
        assert_eq!(channel.adpcm_frames(), source.adpcm_frames());

        // The end marker decodes to one frame of silence after the audio
        let decoded = channel.pcm_samples()?;
        assert_eq!(decoded.len(), channel.frame_count() * SAMPLES_PER_FRAME);
        assert!(decoded[decoded.len() - SAMPLES_PER_FRAME..].iter().all(|&s| s == 0));

        // The lossy pass stays close to the source
        let source = source.pcm_samples()?;
        assert!(common::max_difference(&source, &decoded) <= 1024);
    }
    Ok(())
}

#[test]
fn test_reencode_exact_signal() -> Result<()> {
    // Shift 0 with no prediction represents these samples exactly
    let samples: Vec<i16> = (0..1000).map(|i| ((i % 16) - 8) * 4096).collect();
    let encoded = adpcm::encode(&samples);
    let decoded = adpcm::decode(&encoded)?;
    assert_eq!(decoded[..samples.len()], samples);
    assert_eq!(adpcm::encode(&decoded[..samples.len()]), encoded);
    Ok(())
}

#[test]
fn test_replace_channel_keeps_layout() -> Result<()> {
    common::init_logging();
    let original = common::pcm_subsong(2, 2000, SAMPLE_RATE)?;
    let mut subsong = Subsong::deserialize(&original.serialize(LoadMode::Stream)?)?;
    let layout = subsong.original_layout();

    let quiet = AdpcmChannel::new(vec![])?;
    let old = subsong.replace_channel(1, quiet.into())?;
    assert_eq!(old.adpcm_frames(), original.channels()[1].adpcm_frames());
    assert_eq!(subsong.original_layout(), layout);

    let bytes = subsong.serialize(LoadMode::Entire)?;
    let rebuilt = Subsong::deserialize(&bytes)?;
    assert_eq!(rebuilt.original_layout(), layout);
    assert_eq!(rebuilt.channels()[0].adpcm_frames(), original.channels()[0].adpcm_frames());
    assert_eq!(rebuilt.channels()[1].frame_count(), 1);
    Ok(())
}
