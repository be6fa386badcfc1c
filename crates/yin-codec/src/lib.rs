//! # yin-codec
//!
//! Yin 音频解码框架编解码器库, 提供解码器框架与 Packet/SampleBuffer 抽象,
//! 以及不依赖任何外部解码库的 Vorbis I 解码器.
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use yin_codec::decoders::vorbis::VorbisDecoder;
//! use yin_codec::DecoderOptions;
//! use yin_core::SampleFormat;
//!
//! # fn packets() -> Vec<Vec<u8>> { Vec::new() }
//! let mut decoder = VorbisDecoder::new(DecoderOptions::default().with_sample_format(SampleFormat::S16));
//! let mut packets = packets().into_iter();
//! for header in packets.by_ref().take(3) {
//!     decoder.feed_header(&header).unwrap();
//! }
//! for packet in packets {
//!     if let Ok(Some(buffer)) = decoder.decode(&packet) {
//!         println!("{} 个采样点", buffer.nb_samples);
//!     }
//! }
//! ```

pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod options;
pub mod packet;

// 重导出常用类型
pub use decoder::Decoder;
pub use frame::SampleBuffer;
pub use options::DecoderOptions;
pub use packet::Packet;
