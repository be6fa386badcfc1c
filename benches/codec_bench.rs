//! Vorbis 解码性能基准测试.
//!
//! 覆盖 setup 头包解析与长块/短块音频包解码两条热路径.

#[path = "../tests/common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{Block, StreamBuilder};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use yin::codec::decoders::vorbis::VorbisDecoder;
use yin::codec::{Decoder, DecoderOptions, Packet};
use yin::core::SampleFormat;

fn ready_decoder(builder: &StreamBuilder, format: SampleFormat) -> VorbisDecoder {
    let mut decoder = VorbisDecoder::new(DecoderOptions::default().with_sample_format(format));
    for header in builder.headers() {
        decoder.feed_header(&header).unwrap();
    }
    decoder
}

fn bench_open_extradata(c: &mut Criterion) {
    let builder = StreamBuilder::new(2, &[false, true]);
    let options = DecoderOptions::default().with_extra_data(builder.extradata());
    c.bench_function("vorbis_open_extradata", |b| {
        b.iter(|| {
            let mut decoder = VorbisDecoder::new(DecoderOptions::default());
            decoder.open(black_box(&options)).unwrap();
        });
    });
}

fn bench_decode_long(c: &mut Criterion) {
    let builder = StreamBuilder::stereo_long();
    let packets: Vec<Bytes> = (0..16)
        .map(|i| Bytes::from(builder.audio_packet(&Block::pattern(0, true, true, 2, i))))
        .collect();

    for (name, format) in [
        ("vorbis_decode_long_f32", SampleFormat::F32),
        ("vorbis_decode_long_s16", SampleFormat::S16),
    ] {
        c.bench_function(name, |b| {
            let mut decoder = ready_decoder(&builder, format);
            b.iter(|| {
                for data in &packets {
                    decoder.send_packet(&Packet::from_data(data.clone())).unwrap();
                    while let Ok(frame) = decoder.receive_frame() {
                        black_box(frame);
                    }
                }
            });
        });
    }
}

fn bench_decode_short(c: &mut Criterion) {
    let builder = StreamBuilder::new(2, &[false, true]);
    let packets: Vec<Vec<u8>> = (0..64)
        .map(|i| builder.audio_packet(&Block::pattern(0, false, false, 2, i)))
        .collect();

    c.bench_function("vorbis_decode_short_f32", |b| {
        let mut decoder = ready_decoder(&builder, SampleFormat::F32);
        b.iter(|| {
            for data in &packets {
                black_box(decoder.decode(black_box(data)).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_open_extradata,
    bench_decode_long,
    bench_decode_short
);
criterion_main!(benches);
