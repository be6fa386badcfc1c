//! 音频采样格式定义.
//!
//! 解码输出只支持 16 位整数与 32 位浮点两种数值表示,
//! 每种表示都有交错与平面两种排列方式.

use std::fmt;

/// 音频采样格式
///
/// - 交错 (Interleaved): 所有声道的采样点交替排列, 如 LRLRLR...
/// - 平面 (Planar): 每个声道独立存储, 如 LLL...RRR...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// 有符号 16 位整数, 交错
    S16,
    /// 32 位浮点, 交错
    #[default]
    F32,
    /// 有符号 16 位整数, 平面
    S16p,
    /// 32 位浮点, 平面
    F32p,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::S16 | Self::S16p => 2,
            Self::F32 | Self::F32p => 4,
        }
    }

    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::S16p | Self::F32p)
    }

    /// 是否为浮点格式
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F32p)
    }

    /// 获取对应的平面格式
    pub const fn to_planar(&self) -> Self {
        match self {
            Self::S16 => Self::S16p,
            Self::F32 => Self::F32p,
            other => *other,
        }
    }

    /// 获取对应的交错格式
    pub const fn to_interleaved(&self) -> Self {
        match self {
            Self::S16p => Self::S16,
            Self::F32p => Self::F32,
            other => *other,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::S16 => "s16",
            Self::F32 => "flt",
            Self::S16p => "s16p",
            Self::F32p => "fltp",
        };
        write!(f, "{name}")
    }
}
