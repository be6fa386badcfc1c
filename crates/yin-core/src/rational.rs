//! 有理数类型, 用于表示采样时间基.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 解码输出以 `1/sample_rate` 作为时间基, 一个单位即一个采样点.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 以采样率构造时间基 `1/sample_rate`
    ///
    /// 采样率超过 `i32::MAX` 时返回未定义时间基.
    pub fn from_sample_rate(sample_rate: u32) -> Self {
        match i32::try_from(sample_rate) {
            Ok(den) if den > 0 => Self::new(1, den),
            _ => Self::UNDEFINED,
        }
    }

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 转换为 f64 浮点数, 分母为 0 时返回 `f64::NAN`
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
