use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gitaroo::audio::adpcm;
use gitaroo_test::{self as common, SAMPLE_RATE};

fn load_music() -> Vec<u8> {
    let samples = common::sine(SAMPLE_RATE as usize * 10, 440.0, SAMPLE_RATE, 12000.0);
    adpcm::encode(&samples)
}

pub fn bench(c: &mut Criterion) {
    c.bench_with_input(BenchmarkId::new("decode_adpcm", 0), &load_music(), |b, music| {
        b.iter_with_large_drop(|| adpcm::decode(music).expect("decode failed"));
    });
}

criterion_group!(benches, bench);
criterion_main!(benches);
