//! 比特流写入器.
//!
//! 按小端位序 (LSB first) 向字节缓冲区写入数据, 与 [`BitReader`](crate::bitreader::BitReader) 对应.
//! 用于构造 Vorbis 头包和音频包 (测试码流、基准数据).

/// 比特流写入器
///
/// # 示例
/// ```
/// use yin_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b0010, 4);
/// bw.write_bits(0b1011, 4);
/// bw.write_bits(0x5A, 8);
/// assert_eq!(bw.finish(), vec![0b1011_0010, 0x5A]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.current_byte |= 1 << self.bit_count;
        }
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入值的低 N 位 (最多 32 位), 低位先写
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in 0..n {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    /// 写入值的低 N 位 (最多 64 位)
    pub fn write_bits_u64(&mut self, value: u64, n: u32) {
        debug_assert!(n <= 64, "write_bits_u64: n={} 超过 64 位", n);
        for i in 0..n {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    /// 按高位在前的顺序写入 `len` 位码字 (Huffman 码字的位流顺序)
    pub fn write_codeword(&mut self, code: u32, len: u32) {
        for i in (0..len).rev() {
            self.write_bit((code >> i) & 1 != 0);
        }
    }

    /// 写入完整字节序列 (不要求字节对齐)
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_bits(u32::from(b), 8);
        }
    }

    /// 结束写入, 不足一字节的部分以 0 填充
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.data.push(self.current_byte);
        }
        self.data
    }
}
