//! Vorbis codebook: Huffman 码字分配, 解码树与 VQ 向量查找.

use yin_core::bitreader::{BitReader, float32_unpack, ilog};
use yin_core::{YinError, YinResult};

const CODEBOOK_SYNC: u32 = 0x564342;

/// VQ 值映射 (lookup type 1 或 2)
#[derive(Debug, Clone)]
struct VqLookup {
    lookup_type: u8,
    minimum: f32,
    delta: f32,
    sequence_p: bool,
    lookup_values: u32,
    multiplicands: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HuffLink {
    Missing,
    Node(u32),
    Leaf(u32),
}

#[derive(Debug, Clone, Copy)]
struct HuffNode {
    children: [HuffLink; 2],
}

impl HuffNode {
    const EMPTY: Self = Self {
        children: [HuffLink::Missing; 2],
    };
}

/// 单个 codebook
#[derive(Debug, Clone)]
pub(crate) struct Codebook {
    pub(crate) dimensions: usize,
    pub(crate) entries: usize,
    nodes: Vec<HuffNode>,
    lookup: Option<VqLookup>,
}

impl Codebook {
    /// 从 setup 头包中读取一个 codebook
    pub(crate) fn read(br: &mut BitReader<'_>) -> YinResult<Self> {
        let sync = br.read_bits(24)?;
        if sync != CODEBOOK_SYNC {
            return Err(YinError::InvalidCodebook(format!(
                "同步字错误: 0x{sync:06X}",
            )));
        }

        let dimensions = br.read_bits(16)? as usize;
        let entries = br.read_bits(24)? as usize;
        if dimensions == 0 || entries == 0 {
            return Err(YinError::InvalidCodebook(format!(
                "dimensions={dimensions}, entries={entries} 不能为 0",
            )));
        }

        let lengths = read_lengths(br, entries)?;
        let lookup = read_lookup(br, entries, dimensions)?;
        Self::from_parts(dimensions, lengths, lookup)
    }

    fn from_parts(
        dimensions: usize,
        lengths: Vec<u8>,
        lookup: Option<VqLookup>,
    ) -> YinResult<Self> {
        let codewords = assign_codewords(&lengths)?;
        let nodes = build_tree(&lengths, &codewords)?;
        Ok(Self {
            dimensions,
            entries: lengths.len(),
            nodes,
            lookup,
        })
    }

    /// 是否带 VQ 值映射
    pub(crate) fn has_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// 逐位遍历解码树, 返回条目索引
    pub(crate) fn decode_symbol(&self, br: &mut BitReader<'_>) -> YinResult<u32> {
        let mut node = 0usize;
        loop {
            let bit = usize::from(br.read_bit()?);
            let link = self
                .nodes
                .get(node)
                .map(|n| n.children[bit])
                .unwrap_or(HuffLink::Missing);
            match link {
                HuffLink::Leaf(entry) => return Ok(entry),
                HuffLink::Node(next) => node = next as usize,
                HuffLink::Missing => {
                    return Err(YinError::InvalidData("codebook 码字不存在".into()));
                }
            }
        }
    }

    /// 解码一个 VQ 向量, 写入 `out[..dimensions]`
    pub(crate) fn decode_vector(&self, br: &mut BitReader<'_>, out: &mut [f32]) -> YinResult<()> {
        let lookup = self
            .lookup
            .as_ref()
            .ok_or_else(|| YinError::InvalidData("codebook 无 VQ 值映射".into()))?;
        let entry = self.decode_symbol(br)? as usize;
        lookup.fill_vector(entry, self.dimensions, out);
        Ok(())
    }
}

#[cfg(test)]
impl Codebook {
    /// 由码长表构造 (无 VQ 映射)
    pub(crate) fn from_lengths(dimensions: usize, lengths: Vec<u8>) -> YinResult<Self> {
        Self::from_parts(dimensions, lengths, None)
    }

    /// 在解码树中查找条目的码字与码长, 未使用的条目返回 `None`
    pub(crate) fn codeword(&self, entry: usize) -> Option<(u32, u8)> {
        let mut stack = vec![(0usize, 0u32, 0u8)];
        while let Some((node, code, len)) = stack.pop() {
            let children = self.nodes.get(node)?.children;
            for bit in 0..2u32 {
                let next_code = (code << 1) | bit;
                match children[bit as usize] {
                    HuffLink::Leaf(e) if e as usize == entry => return Some((next_code, len + 1)),
                    HuffLink::Node(next) => stack.push((next as usize, next_code, len + 1)),
                    _ => {}
                }
            }
        }
        None
    }

    /// 构造 lookup type 1 的格点 VQ codebook
    pub(crate) fn lattice(
        dimensions: usize,
        lengths: Vec<u8>,
        multiplicands: Vec<u32>,
        minimum: f32,
        delta: f32,
    ) -> YinResult<Self> {
        let lookup = VqLookup {
            lookup_type: 1,
            minimum,
            delta,
            sequence_p: false,
            lookup_values: multiplicands.len() as u32,
            multiplicands,
        };
        Self::from_parts(dimensions, lengths, Some(lookup))
    }
}

impl VqLookup {
    fn fill_vector(&self, entry: usize, dimensions: usize, out: &mut [f32]) {
        let mut last = 0.0f32;
        let mut index_divisor = 1u64;
        let lookup_values = u64::from(self.lookup_values);
        for (i, slot) in out.iter_mut().enumerate().take(dimensions) {
            let offset = if self.lookup_type == 1 {
                ((entry as u64 / index_divisor) % lookup_values) as usize
            } else {
                entry * dimensions + i
            };
            let multiplicand = self.multiplicands.get(offset).copied().unwrap_or(0);
            let value = multiplicand as f32 * self.delta + self.minimum + last;
            if self.sequence_p {
                last = value;
            }
            *slot = value;
            index_divisor = index_divisor.saturating_mul(lookup_values);
        }
    }
}

fn read_lengths(br: &mut BitReader<'_>, entries: usize) -> YinResult<Vec<u8>> {
    let mut lengths = vec![0u8; entries];
    if br.read_flag()? {
        // ordered: 码长递增的游程
        let mut current_entry = 0usize;
        let mut current_length = br.read_bits(5)? + 1;
        while current_entry < entries {
            if current_length > 32 {
                return Err(YinError::InvalidCodebook("ordered 码长超过 32".into()));
            }
            let number = br.read_bits(ilog((entries - current_entry) as u32))? as usize;
            if current_entry + number > entries {
                return Err(YinError::InvalidCodebook("ordered 码长游程越界".into()));
            }
            lengths[current_entry..current_entry + number].fill(current_length as u8);
            current_entry += number;
            current_length += 1;
        }
    } else {
        let sparse = br.read_flag()?;
        for slot in &mut lengths {
            if !sparse || br.read_flag()? {
                *slot = (br.read_bits(5)? + 1) as u8;
            }
        }
    }
    Ok(lengths)
}

fn read_lookup(
    br: &mut BitReader<'_>,
    entries: usize,
    dimensions: usize,
) -> YinResult<Option<VqLookup>> {
    let lookup_type = br.read_bits(4)? as u8;
    match lookup_type {
        0 => Ok(None),
        1 | 2 => {
            let minimum = float32_unpack(br.read_bits(32)?);
            let delta = float32_unpack(br.read_bits(32)?);
            let value_bits = br.read_bits(4)? + 1;
            let sequence_p = br.read_flag()?;
            let lookup_values = if lookup_type == 1 {
                lookup1_values(entries as u32, dimensions as u32)
            } else {
                entries
                    .checked_mul(dimensions)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| YinError::InvalidCodebook("lookup 值数量溢出".into()))?
            };
            let needed = lookup_values as usize * value_bits as usize;
            if needed > br.bits_remaining() {
                return Err(YinError::OutOfData);
            }
            let multiplicands = (0..lookup_values)
                .map(|_| br.read_bits(value_bits))
                .collect::<YinResult<Vec<_>>>()?;
            Ok(Some(VqLookup {
                lookup_type,
                minimum,
                delta,
                sequence_p,
                lookup_values,
                multiplicands,
            }))
        }
        other => Err(YinError::InvalidCodebook(format!(
            "lookup_type 非法: {other}",
        ))),
    }
}

/// 满足 `r^dimensions <= entries` 的最大整数 r
fn lookup1_values(entries: u32, dimensions: u32) -> u32 {
    if entries == 0 || dimensions == 0 {
        return 0;
    }
    let mut lo = 1u32;
    let mut hi = entries;
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if pow_le(mid, dimensions, entries) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

fn pow_le(base: u32, exp: u32, limit: u32) -> bool {
    let mut acc = 1u64;
    for _ in 0..exp {
        acc *= u64::from(base);
        if acc > u64::from(limit) {
            return false;
        }
    }
    true
}

/// 按 Vorbis I 规则分配码字
///
/// 条目按索引顺序依次取得该码长下数值最小的空闲码字.
/// `available[len]` 保存该深度上唯一的空闲节点 (左对齐到 32 位).
fn assign_codewords(lengths: &[u8]) -> YinResult<Vec<u32>> {
    let mut codewords = vec![0u32; lengths.len()];
    let mut used = lengths.iter().enumerate().filter(|(_, len)| **len > 0);
    let Some((first, &first_len)) = used.next() else {
        return Ok(codewords);
    };

    if lengths.iter().filter(|len| **len > 0).count() == 1 {
        if first_len != 1 {
            return Err(YinError::InvalidCodebook(format!(
                "单条目 codebook 码长必须为 1, 实际为 {first_len}",
            )));
        }
        return Ok(codewords);
    }

    let mut available = [0u32; 33];
    codewords[first] = 0;
    for depth in 1..=u32::from(first_len) {
        available[depth as usize] = 1u32 << (32 - depth);
    }

    for (entry, &len) in used {
        let len = u32::from(len);
        let mut z = len;
        while z > 0 && available[z as usize] == 0 {
            z -= 1;
        }
        if z == 0 {
            return Err(YinError::InvalidCodebook(format!(
                "码长分布过度指定 (entry={entry})",
            )));
        }
        let code = available[z as usize];
        available[z as usize] = 0;
        codewords[entry] = if len == 32 { code } else { code >> (32 - len) };
        for depth in (z + 1..=len).rev() {
            available[depth as usize] = code + (1u32 << (32 - depth));
        }
    }

    if available.iter().any(|&slot| slot != 0) {
        return Err(YinError::InvalidCodebook("码长分布欠指定".into()));
    }
    Ok(codewords)
}

/// 构造解码树, 左子节点对应位 0
fn build_tree(lengths: &[u8], codewords: &[u32]) -> YinResult<Vec<HuffNode>> {
    let mut nodes = vec![HuffNode::EMPTY];
    let used: Vec<usize> = (0..lengths.len()).filter(|&i| lengths[i] > 0).collect();

    if let [only] = used.as_slice() {
        // 单条目: 读 1 位, 无论取值都得到该条目
        nodes[0].children = [HuffLink::Leaf(*only as u32); 2];
        return Ok(nodes);
    }

    for &entry in &used {
        let len = u32::from(lengths[entry]);
        let code = codewords[entry];
        let mut node = 0usize;
        for depth in 0..len {
            let bit = ((code >> (len - 1 - depth)) & 1) as usize;
            let last = depth + 1 == len;
            match nodes[node].children[bit] {
                HuffLink::Missing if last => {
                    nodes[node].children[bit] = HuffLink::Leaf(entry as u32);
                }
                HuffLink::Missing => {
                    let next = nodes.len();
                    nodes.push(HuffNode::EMPTY);
                    nodes[node].children[bit] = HuffLink::Node(next as u32);
                    node = next;
                }
                HuffLink::Node(next) if !last => node = next as usize,
                _ => {
                    return Err(YinError::InvalidCodebook(format!(
                        "码字冲突 (entry={entry})",
                    )));
                }
            }
        }
    }
    Ok(nodes)
}
