//! 平面 f32 PCM 到 `SampleBuffer` 的转换.

use yin_core::{ChannelLayout, SampleFormat};

use crate::frame::SampleBuffer;

/// Vorbis 声道顺序到常见输出顺序的映射, 第 i 个输出声道取自 `order[i]`
fn vorbis_output_channel_order(channels: usize) -> Vec<usize> {
    match channels {
        // L, C, R -> L, R, C
        3 => vec![0, 2, 1],
        // L, C, R, RL, RR -> L, R, C, RL, RR
        5 => vec![0, 2, 1, 3, 4],
        // L, C, R, RL, RR, LFE -> L, R, C, LFE, RL, RR
        6 => vec![0, 2, 1, 5, 3, 4],
        // L, C, R, SL, SR, RC, LFE -> L, R, C, LFE, RC, SL, SR
        7 => vec![0, 2, 1, 6, 5, 3, 4],
        // L, C, R, SL, SR, RL, RR, LFE -> L, R, C, LFE, RL, RR, SL, SR
        8 => vec![0, 2, 1, 7, 5, 6, 3, 4],
        _ => (0..channels).collect(),
    }
}

fn to_s16(v: f32) -> i16 {
    (v * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

fn push_sample(bytes: &mut Vec<u8>, v: f32, format: SampleFormat) {
    if format.is_float() {
        bytes.extend_from_slice(&v.to_le_bytes());
    } else {
        bytes.extend_from_slice(&to_s16(v).to_le_bytes());
    }
}

/// 把每声道 f32 采样写入指定格式的 `SampleBuffer`
///
/// 所有声道长度必须相同; `pts` 以采样为单位.
pub(crate) fn synthesize(
    pcm: &[Vec<f32>],
    sample_rate: u32,
    channel_layout: ChannelLayout,
    sample_format: SampleFormat,
    reorder: bool,
    pts: i64,
) -> SampleBuffer {
    let channels = pcm.len();
    let nb_samples = pcm.first().map_or(0, Vec::len);
    let order = if reorder {
        vorbis_output_channel_order(channels)
    } else {
        (0..channels).collect()
    };
    let bytes = sample_format.bytes_per_sample() as usize;

    let mut buffer = SampleBuffer::new(
        nb_samples as u32,
        sample_rate,
        sample_format,
        channel_layout,
    );
    buffer.pts = pts;

    if sample_format.is_planar() {
        for (plane, &src) in buffer.data.iter_mut().zip(&order) {
            plane.reserve(nb_samples * bytes);
            for &v in &pcm[src] {
                push_sample(plane, v, sample_format);
            }
        }
    } else {
        let plane = &mut buffer.data[0];
        plane.reserve(nb_samples * channels * bytes);
        for i in 0..nb_samples {
            for &src in &order {
                push_sample(plane, pcm[src][i], sample_format);
            }
        }
    }
    buffer
}
