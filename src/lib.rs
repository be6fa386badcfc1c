//! # Yin (音)
//!
//! 纯 Rust 实现的 Vorbis I 音频解码框架.
//!
//! - **解码**: 完整的 Vorbis I 解码器 (floor0/floor1, residue 0/1/2, 长短块切换)
//! - **输出**: 16 位整数或 32 位浮点, 交错或平面排列
//! - **日志**: 基于 `tracing` 的控制台与按天滚动的文件日志
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use yin::codec::decoders::vorbis::VorbisDecoder;
//! use yin::codec::{Decoder, DecoderOptions, Packet};
//! use yin::core::SampleFormat;
//!
//! # fn extradata() -> Vec<u8> { Vec::new() }
//! # fn packets() -> Vec<Vec<u8>> { Vec::new() }
//! let options = DecoderOptions::default()
//!     .with_sample_format(SampleFormat::S16)
//!     .with_extra_data(extradata());
//! let mut decoder = VorbisDecoder::create().unwrap();
//! decoder.open(&options).unwrap();
//! for data in packets() {
//!     decoder.send_packet(&Packet::from_data(data)).unwrap();
//!     while let Ok(buffer) = decoder.receive_frame() {
//!         println!("pts={} 采样数={}", buffer.pts, buffer.nb_samples);
//!     }
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yin-core` | 核心类型、错误与位流工具 |
//! | `yin-codec` | 解码器框架与 Vorbis 解码器 |

/// 核心类型与工具
pub use yin_core as core;

/// 解码器框架与 Vorbis 解码器
pub use yin_codec as codec;

pub mod logging;

/// 获取 Yin 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
