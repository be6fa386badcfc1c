//! 解码器配置.

use yin_core::SampleFormat;

/// 解码器配置
///
/// 在创建解码器或调用 [`Decoder::open`](crate::Decoder::open) 时提供.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// 输出采样格式
    pub sample_format: SampleFormat,
    /// 是否把 Vorbis 声道顺序转换为常见播放顺序 (L, R, C, LFE, ...)
    pub reorder_channels: bool,
    /// Xiph 打包的三个头包 (容器中的 codec extradata), 为空表示头包随数据包送入
    pub extra_data: Vec<u8>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            sample_format: SampleFormat::F32,
            reorder_channels: true,
            extra_data: Vec::new(),
        }
    }
}

impl DecoderOptions {
    /// 设置输出采样格式
    pub fn with_sample_format(mut self, sample_format: SampleFormat) -> Self {
        self.sample_format = sample_format;
        self
    }

    /// 设置声道重排开关
    pub fn with_reorder_channels(mut self, reorder: bool) -> Self {
        self.reorder_channels = reorder;
        self
    }

    /// 设置 extradata
    pub fn with_extra_data(mut self, extra_data: impl Into<Vec<u8>>) -> Self {
        self.extra_data = extra_data.into();
        self
    }
}
