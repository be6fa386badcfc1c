//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 Vorbis 头包与音频包解析的基础设施.
//!
//! 按小端位序读取 (LSB first): 每个字节从最低位开始消费,
//! 多位字段的第一个被读出的位是结果的最低位.

use crate::{YinError, YinResult};

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用小端位序 (LSB first).
///
/// # 示例
/// ```
/// use yin_core::bitreader::BitReader;
///
/// let data = [0b1011_0010];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(1).unwrap(), 0);
/// assert_eq!(br.read_bits(3).unwrap(), 0b001);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最低位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bit_position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_remaining(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> YinResult<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(YinError::OutOfData);
        }
        let bit = (self.data[self.byte_pos] >> self.bit_pos) & 1;
        self.advance(1);
        Ok(bit != 0)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 位数不足时返回 `OutOfData`, 游标保持不动.
    pub fn read_bits(&mut self, n: u32) -> YinResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(YinError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_remaining() {
            return Err(YinError::OutOfData);
        }

        let mut result = 0u32;
        let mut filled = 0u32;
        while filled < n {
            let available = 8 - u32::from(self.bit_pos);
            let take = (n - filled).min(available);
            let mask = (1u32 << take) - 1;
            let bits = (u32::from(self.data[self.byte_pos]) >> self.bit_pos) & mask;
            result |= bits << filled;
            filled += take;
            self.advance(take);
        }
        Ok(result)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> YinResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(YinError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n,
            )));
        }
        if (n as usize) > self.bits_remaining() {
            return Err(YinError::OutOfData);
        }

        let low = u64::from(self.read_bits(32)?);
        let high = u64::from(self.read_bits(n - 32)?);
        Ok((high << 32) | low)
    }

    /// 读取 1 位标志
    pub fn read_flag(&mut self) -> YinResult<bool> {
        self.read_bit()
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> YinResult<()> {
        if n > self.bits_remaining() {
            return Err(YinError::OutOfData);
        }
        let total = self.bit_position() + n;
        self.byte_pos = total / 8;
        self.bit_pos = (total % 8) as u8;
        Ok(())
    }

    fn advance(&mut self, bits: u32) {
        let next = u32::from(self.bit_pos) + bits;
        self.byte_pos += (next / 8) as usize;
        self.bit_pos = (next % 8) as u8;
    }
}

/// Vorbis `ilog`: 最高置位的位置 (从 1 开始), `ilog(0) = 0`
pub fn ilog(v: u32) -> u32 {
    32 - v.leading_zeros()
}

/// 解包 Vorbis 32 位打包浮点数
///
/// 布局: 符号位 (bit31) | 10 位偏置指数 (bit21..30) | 21 位尾数.
pub fn float32_unpack(x: u32) -> f32 {
    let mantissa = f64::from(x & 0x001F_FFFF);
    let exponent = ((x & 0x7FE0_0000) >> 21) as i32;
    let value = if x & 0x8000_0000 != 0 {
        -mantissa
    } else {
        mantissa
    };
    (value * 2f64.powi(exponent - 788)) as f32
}
