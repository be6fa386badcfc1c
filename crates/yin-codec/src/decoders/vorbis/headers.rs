//! Vorbis identification / comment 头包解析, 以及 Xiph extradata 拆分.

use yin_core::{ChannelLayout, YinError, YinResult};

const IDENTIFICATION_PACKET: u8 = 0x01;
const COMMENT_PACKET: u8 = 0x03;
pub(crate) const SETUP_PACKET: u8 = 0x05;
const MAGIC: &[u8; 6] = b"vorbis";

/// identification 头包内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationHeader {
    /// 声道数
    pub channels: u8,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 最大码率 (bps, 0 表示未指定)
    pub bitrate_maximum: i32,
    /// 标称码率
    pub bitrate_nominal: i32,
    /// 最小码率
    pub bitrate_minimum: i32,
    /// 短块长度
    pub blocksize_short: usize,
    /// 长块长度
    pub blocksize_long: usize,
}

impl IdentificationHeader {
    /// 按 block flag 取块长度
    pub fn blocksize(&self, long: bool) -> usize {
        if long {
            self.blocksize_long
        } else {
            self.blocksize_short
        }
    }

    /// 默认声道布局
    pub fn channel_layout(&self) -> ChannelLayout {
        ChannelLayout::from_channels(u32::from(self.channels))
    }
}

/// comment 头包内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentHeader {
    /// 编码器标识
    pub vendor: String,
    /// `KEY=value` 形式的原始注释
    pub comments: Vec<String>,
}

impl CommentHeader {
    /// 遍历 (键, 值), 不含 `=` 的条目被跳过
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments.iter().filter_map(|c| c.split_once('='))
    }

    /// 按键 (大小写不敏感) 取第一个值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }
}

/// 校验头包类型与 "vorbis" 标识
pub(crate) fn check_packet_magic(packet: &[u8], packet_type: u8, what: &str) -> YinResult<()> {
    if packet.len() < 7 || packet[0] != packet_type || &packet[1..7] != MAGIC {
        return Err(YinError::BadHeader(format!("{what} 头包标识无效")));
    }
    Ok(())
}

/// 解析 identification 头包
pub fn parse_identification_header(packet: &[u8]) -> YinResult<IdentificationHeader> {
    if packet.len() < 30 {
        return Err(YinError::BadHeader(format!(
            "identification 头包长度不足: {}",
            packet.len(),
        )));
    }
    check_packet_magic(packet, IDENTIFICATION_PACKET, "identification")?;

    let version = read_le_u32(packet, 7);
    if version != 0 {
        return Err(YinError::BadHeader(format!("Vorbis 版本不支持: {version}")));
    }

    let channels = packet[11];
    if channels == 0 {
        return Err(YinError::BadHeader("声道数不能为 0".into()));
    }

    let sample_rate = read_le_u32(packet, 12);
    if sample_rate == 0 {
        return Err(YinError::BadHeader("采样率不能为 0".into()));
    }

    let bs0_exp = packet[28] & 0x0F;
    let bs1_exp = packet[28] >> 4;
    if !(6..=13).contains(&bs0_exp) || !(6..=13).contains(&bs1_exp) || bs0_exp > bs1_exp {
        return Err(YinError::BadHeader(format!(
            "blocksize 非法: bs0_exp={bs0_exp}, bs1_exp={bs1_exp}",
        )));
    }

    if packet[29] & 0x01 == 0 {
        return Err(YinError::BadHeader(
            "identification 头包 framing_flag 非法".into(),
        ));
    }

    Ok(IdentificationHeader {
        channels,
        sample_rate,
        bitrate_maximum: read_le_u32(packet, 16) as i32,
        bitrate_nominal: read_le_u32(packet, 20) as i32,
        bitrate_minimum: read_le_u32(packet, 24) as i32,
        blocksize_short: 1usize << bs0_exp,
        blocksize_long: 1usize << bs1_exp,
    })
}

/// 解析 comment 头包
///
/// 标识错误返回 `BadHeader`; 内部结构错误返回 `InvalidData`, 由调用方决定是否忽略.
pub fn parse_comment_header(packet: &[u8]) -> YinResult<CommentHeader> {
    check_packet_magic(packet, COMMENT_PACKET, "comment")?;

    let mut pos = 7usize;
    let vendor = read_string(packet, &mut pos, "vendor 字段")?;
    let count = take_u32(packet, &mut pos)? as usize;
    // 每条注释至少占 4 字节长度字段
    if count > packet.len().saturating_sub(pos) / 4 {
        return Err(YinError::InvalidData(format!("comment 数量非法: {count}")));
    }
    let mut comments = Vec::with_capacity(count);
    for _ in 0..count {
        comments.push(read_string(packet, &mut pos, "comment 项")?);
    }

    match packet.get(pos) {
        Some(flag) if flag & 0x01 != 0 => Ok(CommentHeader { vendor, comments }),
        _ => Err(YinError::InvalidData("comment 头包 framing_flag 非法".into())),
    }
}

/// 拆分容器 extradata 中的三个头包
///
/// 支持两种常见布局:
/// - Xiph lacing: `0x02`, 前两个头包长度 (255 续接编码), 三个头包依次拼接
/// - 每个头包前置 16 位大端长度
pub fn split_xiph_extradata(data: &[u8]) -> YinResult<[Vec<u8>; 3]> {
    if data.len() >= 6 && data[0] == 0x00 && data[1] == 0x1E {
        let mut pos = 0usize;
        let mut parts: [Vec<u8>; 3] = Default::default();
        for part in &mut parts {
            let len = data
                .get(pos..pos + 2)
                .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
                .ok_or_else(|| YinError::BadHeader("extradata 长度前缀截断".into()))?;
            pos += 2;
            let body = data
                .get(pos..pos + len)
                .ok_or_else(|| YinError::BadHeader("extradata 头包截断".into()))?;
            *part = body.to_vec();
            pos += len;
        }
        return Ok(parts);
    }

    if data.first() != Some(&0x02) {
        return Err(YinError::BadHeader("extradata 不是 Xiph lacing 布局".into()));
    }
    let mut pos = 1usize;
    let mut sizes = [0usize; 2];
    for size in &mut sizes {
        loop {
            let b = *data
                .get(pos)
                .ok_or_else(|| YinError::BadHeader("extradata lacing 截断".into()))?;
            pos += 1;
            *size += usize::from(b);
            if b < 255 {
                break;
            }
        }
    }

    let total = pos + sizes[0] + sizes[1];
    if total > data.len() {
        return Err(YinError::BadHeader(format!(
            "extradata 长度不足: 需要 {total}, 实际 {}",
            data.len(),
        )));
    }
    let first_end = pos + sizes[0];
    Ok([
        data[pos..first_end].to_vec(),
        data[first_end..total].to_vec(),
        data[total..].to_vec(),
    ])
}

fn read_le_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn take_u32(data: &[u8], pos: &mut usize) -> YinResult<u32> {
    ensure_left(data, *pos, 4, "u32 字段")?;
    let v = read_le_u32(data, *pos);
    *pos += 4;
    Ok(v)
}

fn read_string(data: &[u8], pos: &mut usize, what: &str) -> YinResult<String> {
    let len = take_u32(data, pos)? as usize;
    ensure_left(data, *pos, len, what)?;
    let s = String::from_utf8_lossy(&data[*pos..*pos + len]).into_owned();
    *pos += len;
    Ok(s)
}

fn ensure_left(data: &[u8], pos: usize, need: usize, what: &str) -> YinResult<()> {
    if pos.saturating_add(need) > data.len() {
        return Err(YinError::InvalidData(format!(
            "{} 读取越界: pos={}, need={}, len={}",
            what,
            pos,
            need,
            data.len(),
        )));
    }
    Ok(())
}
