//! 统一错误类型定义.
//!
//! 所有 Yin crate 共用的错误类型, 支持跨模块传播.
//!
//! 错误分为两类:
//! - 致命错误: 头包阶段出现, 解码器进入 Faulted 状态后不可恢复
//! - 可恢复错误: 单个音频包的问题, 跳过该包后解码器可继续工作

use thiserror::Error;

/// Yin 框架统一错误类型
#[derive(Debug, Error)]
pub enum YinError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 头包损坏或不符合 Vorbis I 规范
    #[error("头包无效: {0}")]
    BadHeader(String),

    /// codebook 结构非法 (同步字错误, 码长分布过度或欠指定)
    #[error("codebook 无效: {0}")]
    InvalidCodebook(String),

    /// 流使用了未实现的 floor/residue/mapping 类型
    #[error("不支持的格式: {0}")]
    UnsupportedFormat(String),

    /// 位流数据耗尽 (截断的数据包)
    #[error("位流数据不足")]
    OutOfData,

    /// 音频包内容损坏 (非法 codebook 符号, 越界的 mode 等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 在音频阶段收到非音频包
    #[error("意外的数据包: {0}")]
    UnexpectedPacket(String),

    /// 解码器尚未就绪或已进入故障状态
    #[error("解码器未就绪")]
    NotReady,

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,
}

impl YinError {
    /// 是否为单包级别的可恢复错误
    ///
    /// 可恢复错误只影响当前数据包, 解码器状态保持可用.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OutOfData | Self::InvalidData(_) | Self::UnexpectedPacket(_)
        )
    }

    /// 是否为使解码器进入故障状态的头包阶段错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BadHeader(_) | Self::InvalidCodebook(_) | Self::UnsupportedFormat(_)
        )
    }
}

/// Yin 框架统一 Result 类型
pub type YinResult<T> = Result<T, YinError>;
