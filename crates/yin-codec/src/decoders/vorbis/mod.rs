//! Vorbis I 音频解码器.
//!
//! 支持完整的 Vorbis I 规范:
//! - 三个头包 (identification/comment/setup) 解析与校验
//! - floor0/floor1, residue 0/1/2, mapping 0
//! - 基于 FFT 的 IMDCT, 长短块窗切换与重叠相加
//! - S16/F32 交错与平面输出
//!
//! 解码器按 `AwaitingIdentification -> AwaitingComments -> AwaitingSetup -> Ready`
//! 的顺序推进; 任意头包解析失败都会进入 `Faulted`, 之后所有调用返回 `NotReady`.
//! 单个音频包解码失败只影响该包: 重叠缓冲区被置零, 下一个包照常解码.

mod audio;
mod codebook;
mod floor;
mod headers;
mod imdct;
mod overlap;
mod residue;
mod setup;
mod synthesis;
mod window;

use std::collections::VecDeque;

use log::{debug, warn};
use yin_core::timestamp::NOPTS_VALUE;
use yin_core::{YinError, YinResult};

use crate::decoder::Decoder;
use crate::frame::SampleBuffer;
use crate::options::DecoderOptions;
use crate::packet::Packet;

use self::audio::DecoderState;
use self::setup::parse_setup_packet;
use self::synthesis::synthesize;

pub use self::headers::{
    CommentHeader, IdentificationHeader, parse_comment_header, parse_identification_header,
    split_xiph_extradata,
};

/// 解码器所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderStage {
    /// 等待 identification 头包
    AwaitingIdentification,
    /// 等待 comment 头包
    AwaitingComments,
    /// 等待 setup 头包
    AwaitingSetup,
    /// 可以解码音频包
    Ready,
    /// 头包解析失败, 不可恢复
    Faulted,
}

/// Vorbis 解码器
pub struct VorbisDecoder {
    options: DecoderOptions,
    stage: DecoderStage,
    identification: Option<IdentificationHeader>,
    comments: CommentHeader,
    state: Option<DecoderState>,
    /// 下一个输出缓冲区的起始时间戳 (采样数)
    next_pts: i64,
    pending: VecDeque<SampleBuffer>,
    flushing: bool,
}

impl VorbisDecoder {
    /// 创建处于 `AwaitingIdentification` 阶段的解码器
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            stage: DecoderStage::AwaitingIdentification,
            identification: None,
            comments: CommentHeader::default(),
            state: None,
            next_pts: 0,
            pending: VecDeque::new(),
            flushing: false,
        }
    }

    /// 创建 Vorbis 解码器 (工厂函数)
    pub fn create() -> YinResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(DecoderOptions::default())))
    }

    /// 当前阶段
    pub fn stage(&self) -> DecoderStage {
        self.stage
    }

    /// identification 头包, 尚未解析时为 `None`
    pub fn identification(&self) -> Option<&IdentificationHeader> {
        self.state
            .as_ref()
            .map(DecoderState::identification)
            .or(self.identification.as_ref())
    }

    /// comment 头包 (未解析或解析失败时为空)
    pub fn comments(&self) -> &CommentHeader {
        &self.comments
    }

    /// 按顺序送入三个头包之一
    pub fn feed_header(&mut self, packet: &[u8]) -> YinResult<()> {
        match self.stage {
            DecoderStage::Faulted => Err(YinError::NotReady),
            DecoderStage::Ready => Err(YinError::UnexpectedPacket(
                "头包已全部解析, 音频阶段不再接受头包".into(),
            )),
            DecoderStage::AwaitingIdentification => match parse_identification_header(packet) {
                Ok(ident) => {
                    debug!(
                        "vorbis identification: {} 声道, {} Hz, blocksize {}/{}",
                        ident.channels, ident.sample_rate, ident.blocksize_short, ident.blocksize_long
                    );
                    self.identification = Some(ident);
                    self.stage = DecoderStage::AwaitingComments;
                    Ok(())
                }
                Err(e) => Err(self.fault(e)),
            },
            DecoderStage::AwaitingComments => {
                match parse_comment_header(packet) {
                    Ok(comments) => self.comments = comments,
                    Err(e @ YinError::BadHeader(_)) => return Err(self.fault(e)),
                    Err(e) => {
                        warn!("vorbis comment 头包损坏, 忽略注释继续: {}", e);
                        self.comments = CommentHeader::default();
                    }
                }
                self.stage = DecoderStage::AwaitingSetup;
                Ok(())
            }
            DecoderStage::AwaitingSetup => {
                let Some(ident) = self.identification.take() else {
                    return Err(self.fault(YinError::NotReady));
                };
                match parse_setup_packet(packet, &ident) {
                    Ok(setup) => {
                        debug!(
                            "vorbis setup: {} codebooks, {} floors, {} residues, {} mappings, {} modes",
                            setup.codebooks.len(),
                            setup.floors.len(),
                            setup.residues.len(),
                            setup.mappings.len(),
                            setup.modes.len()
                        );
                        self.state = Some(DecoderState::new(ident, setup));
                        self.stage = DecoderStage::Ready;
                        Ok(())
                    }
                    Err(e) => {
                        self.identification = Some(ident);
                        Err(self.fault(e))
                    }
                }
            }
        }
    }

    /// 解码一个音频包
    ///
    /// 首个音频包 (及 `reset` 后的首个包) 返回 `Ok(None)`.
    pub fn decode(&mut self, packet: &[u8]) -> YinResult<Option<SampleBuffer>> {
        if self.stage != DecoderStage::Ready {
            return Err(YinError::NotReady);
        }
        let state = self.state.as_mut().ok_or(YinError::NotReady)?;

        match state.decode_packet(packet) {
            Ok(Some(pcm)) => {
                let ident = state.identification();
                let buffer = synthesize(
                    &pcm,
                    ident.sample_rate,
                    ident.channel_layout(),
                    self.options.sample_format,
                    self.options.reorder_channels,
                    self.next_pts,
                );
                self.next_pts += i64::from(buffer.nb_samples);
                Ok(Some(buffer))
            }
            Ok(None) => Ok(None),
            Err(e @ YinError::UnexpectedPacket(_)) => Err(e),
            Err(e) => {
                warn!("vorbis 音频包解码失败, 重叠缓冲区置零: {}", e);
                state.silence();
                Err(e)
            }
        }
    }

    /// 清空重叠缓冲区与待取输出, 下一个音频包重新作为首包
    ///
    /// 输出时间戳不回退; 之后经 `send_packet` 送入的首包若带有 pts,
    /// 输出时间线从该 pts 重新开始.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.reset();
        }
        self.pending.clear();
        self.flushing = false;
    }

    fn fault(&mut self, err: YinError) -> YinError {
        warn!("vorbis 头包解析失败, 解码器进入故障状态: {}", err);
        self.stage = DecoderStage::Faulted;
        self.state = None;
        err
    }
}

impl Decoder for VorbisDecoder {
    fn name(&self) -> &str {
        "vorbis"
    }

    fn open(&mut self, options: &DecoderOptions) -> YinResult<()> {
        *self = Self::new(options.clone());
        if options.extra_data.is_empty() {
            return Ok(());
        }
        let headers = match split_xiph_extradata(&options.extra_data) {
            Ok(headers) => headers,
            Err(e) => return Err(self.fault(e)),
        };
        for header in &headers {
            self.feed_header(header)?;
        }
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> YinResult<()> {
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }
        self.flushing = false;

        let data = packet.data.as_ref();
        match self.stage {
            DecoderStage::Ready => {
                let unprimed = self.state.as_ref().is_some_and(|s| !s.is_primed());
                if unprimed && packet.pts != NOPTS_VALUE {
                    self.next_pts = packet.pts;
                }
                if let Some(buffer) = self.decode(data)? {
                    self.pending.push_back(buffer);
                }
                Ok(())
            }
            _ => self.feed_header(data),
        }
    }

    fn receive_frame(&mut self) -> YinResult<SampleBuffer> {
        match self.pending.pop_front() {
            Some(buffer) => Ok(buffer),
            None if self.flushing => Err(YinError::Eof),
            None => Err(YinError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.reset();
    }
}
