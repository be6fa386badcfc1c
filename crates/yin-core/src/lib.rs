//! # yin-core
//!
//! Yin 音频解码框架核心库, 提供基础类型定义、错误处理和位流工具.
//!
//! Vorbis 位流使用小端位序 (LSB first), 本 crate 的读写器均按此位序实现.

pub mod bitreader;
pub mod bitwriter;
pub mod channel_layout;
pub mod error;
pub mod rational;
pub mod sample_format;
pub mod timestamp;

// 重导出常用类型
pub use channel_layout::ChannelLayout;
pub use error::{YinError, YinResult};
pub use rational::Rational;
pub use sample_format::SampleFormat;
pub use timestamp::Timestamp;
