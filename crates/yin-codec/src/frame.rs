//! 解码后的采样缓冲区 (SampleBuffer).
//!
//! 对标 FFmpeg 的 `AVFrame` 音频部分, 保存一次音频包解码产出的 PCM 数据.

use yin_core::timestamp::NOPTS_VALUE;
use yin_core::{ChannelLayout, Rational, SampleFormat, Timestamp};

/// 采样缓冲区
///
/// 平面格式: `data` 中每个 Vec 对应一个声道.
/// 交错格式: `data` 中只有一个 Vec, 所有声道交替排列.
/// 采样数据按小端字节序存放.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// 音频采样数据 (平面格式: 每声道一个 Vec; 交错格式: 单个 Vec)
    pub data: Vec<Vec<u8>>,
    /// 每声道采样数
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 显示时间戳 (以 time_base 为单位)
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
    /// 时长 (以 time_base 为单位)
    pub duration: i64,
}

impl SampleBuffer {
    /// 创建空的采样缓冲区
    pub fn new(
        nb_samples: u32,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        let plane_count = if sample_format.is_planar() {
            channel_layout.channels as usize
        } else {
            1
        };
        Self {
            data: vec![Vec::new(); plane_count],
            nb_samples,
            sample_rate,
            sample_format,
            channel_layout,
            pts: NOPTS_VALUE,
            time_base: Rational::from_sample_rate(sample_rate),
            duration: i64::from(nb_samples),
        }
    }

    /// 声道数
    pub fn channels(&self) -> usize {
        self.channel_layout.channels as usize
    }

    /// 起始时间戳
    pub fn timestamp(&self) -> Timestamp {
        Timestamp::new(self.pts, self.time_base)
    }

    /// 读取单个采样值并归一化到 f32
    fn sample_at(&self, plane: usize, index: usize) -> f32 {
        let bytes = &self.data[plane];
        if self.sample_format.is_float() {
            let off = index * 4;
            f32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        } else {
            let off = index * 2;
            f32::from(i16::from_le_bytes([bytes[off], bytes[off + 1]])) / 32768.0
        }
    }

    /// 取出指定声道的全部采样 (归一化浮点)
    ///
    /// 声道索引越界时返回 `None`.
    pub fn channel_f32(&self, channel: usize) -> Option<Vec<f32>> {
        let channels = self.channels();
        if channel >= channels {
            return None;
        }
        let n = self.nb_samples as usize;
        let samples = if self.sample_format.is_planar() {
            (0..n).map(|i| self.sample_at(channel, i)).collect()
        } else {
            (0..n)
                .map(|i| self.sample_at(0, i * channels + channel))
                .collect()
        };
        Some(samples)
    }

    /// 以交错顺序取出全部采样 (归一化浮点)
    pub fn to_interleaved_f32(&self) -> Vec<f32> {
        let channels = self.channels();
        let n = self.nb_samples as usize;
        let mut out = Vec::with_capacity(n * channels);
        for i in 0..n {
            for ch in 0..channels {
                let v = if self.sample_format.is_planar() {
                    self.sample_at(ch, i)
                } else {
                    self.sample_at(0, i * channels + ch)
                };
                out.push(v);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_平面与交错缓冲区布局() {
        let planar = SampleBuffer::new(4, 48000, SampleFormat::F32p, ChannelLayout::STEREO);
        assert_eq!(planar.data.len(), 2);
        assert_eq!(planar.time_base, Rational::new(1, 48000));
        assert_eq!(planar.duration, 4);

        let packed = SampleBuffer::new(4, 48000, SampleFormat::S16, ChannelLayout::STEREO);
        assert_eq!(packed.data.len(), 1);
    }

    #[test]
    fn test_交错读取() {
        let mut buf = SampleBuffer::new(2, 8000, SampleFormat::S16, ChannelLayout::STEREO);
        for v in [16384i16, -16384, 0, 32767] {
            buf.data[0].extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(buf.channel_f32(0), Some(vec![0.5, 0.0]));
        assert_eq!(buf.channel_f32(1).map(|c| c[0]), Some(-0.5));
        assert_eq!(buf.channel_f32(2), None);
        assert_eq!(buf.to_interleaved_f32().len(), 4);
    }
}
