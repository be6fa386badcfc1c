//! 压缩数据包 (Packet).
//!
//! 表示由外部解封装器提取出的一个完整 Vorbis 包 (头包或音频包).

use bytes::Bytes;
use yin_core::timestamp::NOPTS_VALUE;

/// 压缩数据包
///
/// 解码器信任包边界, 不在包内做重同步.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (以采样点为单位, 未知时为 `NOPTS_VALUE`)
    pub pts: i64,
}

impl Packet {
    /// 创建空数据包 (用于通知解码器输入结束)
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush packet)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_空包与数据包() {
        let empty = Packet::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.pts, NOPTS_VALUE);

        let pkt = Packet::from_data(vec![1u8, 2, 3]);
        assert_eq!(pkt.size(), 3);
        assert!(!pkt.is_empty());
    }
}
