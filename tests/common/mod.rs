//! 测试用 Vorbis 流构造器.
//!
//! 用 `BitWriter` 写出一个最小但完整的流:
//! - codebook 0: 1 维, 8 条目, 码长 3 (floor1 Y 值)
//! - codebook 1: 1 维, 2 条目, 码长 1 (residue 分类)
//! - codebook 2: 2 维, 4 条目, 码长 2, lookup type 1, 值 {-1/8, 1/8}
//! - codebook 3: 1 维, 4 条目, 码长 2, lookup type 1, 值 {0.25, 0.75, 1.25, 1.75} (floor0 系数)
//! - floor1: 一个 2 维分区, multiplier 1, range_bits 10, X = [0, 1024, 256, 512];
//!   或 floor0: order 2, bark_map_size 256, amplitude_bits 6, offset 40
//! - residue 1 或 2: [0, 64), 分区 8, 2 个分类, class 1 在 pass 0 使用 codebook 2
//! - mapping 0: 单 submap, 立体声时耦合 (0, 1)
//!
//! 参考输出在测试中独立计算: floor 曲线按定义生成, residue 直接由分区内容得到.

#![allow(dead_code)]

use std::f64::consts::{FRAC_PI_2, PI};

use yin::core::bitreader::ilog;
use yin::core::bitwriter::BitWriter;

pub const SHORT_EXP: u8 = 8;
pub const LONG_EXP: u8 = 11;
pub const SAMPLE_RATE: u32 = 44100;
pub const PARTITIONS: usize = 8;
pub const PARTITION_SIZE: usize = 8;
const RESIDUE_VALUE: f64 = 0.125;

const FLOOR1_X: [i64; 4] = [0, 1024, 256, 512];
const FLOOR0_ORDER: u32 = 2;
const FLOOR0_BARK_MAP_SIZE: u32 = 256;
const FLOOR0_AMPLITUDE_BITS: u32 = 6;
const FLOOR0_AMPLITUDE_OFFSET: u32 = 40;
const FLOOR0_MINIMUM: f64 = 0.25;
const FLOOR0_DELTA: f64 = 0.5;
/// floor1 反 dB 表的首项, 表为从该值到 1.0 的等比数列
const INVERSE_DB_MIN: f64 = 1.0649863e-07;

pub fn block_size(long: bool) -> usize {
    if long { 1 << LONG_EXP } else { 1 << SHORT_EXP }
}

/// 按 Vorbis 32 位打包格式编码一个浮点数 (有效位不超过 21 位)
pub fn pack_float(v: f32) -> u32 {
    if v == 0.0 {
        return 0;
    }
    let sign = if v < 0.0 { 0x8000_0000 } else { 0 };
    let m = f64::from(v.abs());
    let e = m.log2().floor() as i32;
    let mantissa = (m / 2f64.powi(e - 20)) as u32;
    let exponent = (e - 20 + 788) as u32;
    sign | (exponent << 21) | mantissa
}

/// 一个声道在音频包中的 floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Floor {
    /// floor1: Y0, Y1 与 X = 256, 512 两点的分区码
    Line([u32; 4]),
    /// floor0: 幅度与两个 codebook 3 条目
    Lsp { amplitude: u32, entries: [u8; 2] },
    /// 本包不传输 floor
    Unused,
}

/// 端点为 255 且分区取预测值的 floor1, 曲线恒为 1.0
pub const FLAT: Floor = Floor::Line([255, 255, 0, 0]);

/// 一个音频包的内容
///
/// `partitions[v][p]` 为 `None` 表示该分区使用 class 0 (无数据),
/// `Some(entries)` 表示 class 1, 依次写入 4 个 codebook 2 条目.
/// residue 1 时每个声道一个向量, residue 2 时只有一个交错向量.
#[derive(Debug, Clone)]
pub struct Block {
    pub mode: usize,
    pub prev_long: bool,
    pub next_long: bool,
    pub floors: Vec<Floor>,
    pub partitions: Vec<Vec<Option<[u8; 4]>>>,
}

impl Block {
    /// 由种子生成确定的分区内容, floor 全部平坦
    pub fn pattern(mode: usize, prev_long: bool, next_long: bool, channels: u8, seed: u32) -> Self {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };
        let partitions = (0..channels)
            .map(|_| {
                (0..PARTITIONS)
                    .map(|_| {
                        let r = next();
                        if r % 4 == 0 {
                            None
                        } else {
                            Some([0u32, 1, 2, 3].map(|k| ((r >> (2 * k + 4)) & 3) as u8))
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            mode,
            prev_long,
            next_long,
            floors: vec![FLAT; usize::from(channels)],
            partitions,
        }
    }

    pub fn with_floors(mut self, floors: &[Floor]) -> Self {
        self.floors = floors.to_vec();
        self
    }
}

/// 测试流构造器
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    pub channels: u8,
    /// 每个 mode 的 block flag
    pub modes: Vec<bool>,
    pub residue_type: u32,
    pub floor_type: u32,
}

impl StreamBuilder {
    pub fn new(channels: u8, modes: &[bool]) -> Self {
        Self {
            channels,
            modes: modes.to_vec(),
            residue_type: 1,
            floor_type: 1,
        }
    }

    /// 立体声, 只有长块 mode
    pub fn stereo_long() -> Self {
        Self::new(2, &[true])
    }

    /// 立体声耦合, 两个声道交错进同一个 residue 2 向量
    pub fn coupled_residue2(modes: &[bool]) -> Self {
        Self {
            residue_type: 2,
            ..Self::new(2, modes)
        }
    }

    /// 单声道 floor0 流
    pub fn floor0_mono(modes: &[bool]) -> Self {
        Self {
            floor_type: 0,
            ..Self::new(1, modes)
        }
    }

    pub fn is_long(&self, block: &Block) -> bool {
        self.modes[block.mode]
    }

    pub fn identification(&self) -> Vec<u8> {
        let mut p = vec![0x01];
        p.extend_from_slice(b"vorbis");
        p.extend_from_slice(&0u32.to_le_bytes());
        p.push(self.channels);
        p.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        p.extend_from_slice(&0i32.to_le_bytes());
        p.extend_from_slice(&128_000i32.to_le_bytes());
        p.extend_from_slice(&0i32.to_le_bytes());
        p.push(SHORT_EXP | (LONG_EXP << 4));
        p.push(0x01);
        p
    }

    pub fn comment(&self) -> Vec<u8> {
        let vendor = b"yin test stream";
        let comments: [&[u8]; 2] = [b"TITLE=sine", b"ARTIST=yin"];
        let mut p = vec![0x03];
        p.extend_from_slice(b"vorbis");
        p.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        p.extend_from_slice(vendor);
        p.extend_from_slice(&(comments.len() as u32).to_le_bytes());
        for c in comments {
            p.extend_from_slice(&(c.len() as u32).to_le_bytes());
            p.extend_from_slice(c);
        }
        p.push(0x01);
        p
    }

    pub fn setup(&self) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(0x05, 8);
        bw.write_bytes(b"vorbis");

        bw.write_bits(3, 8); // 4 个 codebook
        write_codebook(&mut bw, 1, &[3; 8], None);
        write_codebook(&mut bw, 1, &[1; 2], None);
        write_codebook(
            &mut bw,
            2,
            &[2; 4],
            Some(Lookup {
                minimum: -RESIDUE_VALUE as f32,
                delta: 2.0 * RESIDUE_VALUE as f32,
                value_bits: 1,
                multiplicands: &[0, 1],
            }),
        );
        write_codebook(
            &mut bw,
            1,
            &[2; 4],
            Some(Lookup {
                minimum: FLOOR0_MINIMUM as f32,
                delta: FLOOR0_DELTA as f32,
                value_bits: 2,
                multiplicands: &[0, 1, 2, 3],
            }),
        );

        bw.write_bits(0, 6); // 1 个 time transform
        bw.write_bits(0, 16);

        bw.write_bits(0, 6); // 1 个 floor
        if self.floor_type == 0 {
            bw.write_bits(0, 16);
            bw.write_bits(FLOOR0_ORDER, 8);
            bw.write_bits(SAMPLE_RATE, 16);
            bw.write_bits(FLOOR0_BARK_MAP_SIZE, 16);
            bw.write_bits(FLOOR0_AMPLITUDE_BITS, 6);
            bw.write_bits(FLOOR0_AMPLITUDE_OFFSET, 8);
            bw.write_bits(0, 4); // 1 个 book
            bw.write_bits(3, 8);
        } else {
            bw.write_bits(1, 16);
            bw.write_bits(1, 5); // 1 个分区
            bw.write_bits(0, 4); // class 0
            bw.write_bits(1, 3); // 维度 2
            bw.write_bits(0, 2); // 无 subclass
            bw.write_bits(1, 8); // subclass book 0 (+1)
            bw.write_bits(0, 2); // multiplier 1
            bw.write_bits(10, 4); // range_bits
            bw.write_bits(FLOOR1_X[2] as u32, 10);
            bw.write_bits(FLOOR1_X[3] as u32, 10);
        }

        bw.write_bits(0, 6); // 1 个 residue
        bw.write_bits(self.residue_type, 16);
        bw.write_bits(0, 24);
        bw.write_bits((PARTITIONS * PARTITION_SIZE) as u32, 24);
        bw.write_bits(PARTITION_SIZE as u32 - 1, 24);
        bw.write_bits(1, 6); // 2 个分类
        bw.write_bits(1, 8); // classbook
        bw.write_bits(0, 3); // class 0: 无 cascade
        bw.write_bit(false);
        bw.write_bits(1, 3); // class 1: pass 0
        bw.write_bit(false);
        bw.write_bits(2, 8);

        bw.write_bits(0, 6); // 1 个 mapping
        bw.write_bits(0, 16);
        bw.write_bit(false); // 单 submap
        if self.channels >= 2 {
            let ch_bits = ilog(u32::from(self.channels) - 1);
            bw.write_bit(true);
            bw.write_bits(0, 8);
            bw.write_bits(0, ch_bits);
            bw.write_bits(1, ch_bits);
        } else {
            bw.write_bit(false);
        }
        bw.write_bits(0, 2);
        bw.write_bits(0, 8);
        bw.write_bits(0, 8);
        bw.write_bits(0, 8);

        bw.write_bits(self.modes.len() as u32 - 1, 6);
        for &long in &self.modes {
            bw.write_bit(long);
            bw.write_bits(0, 16);
            bw.write_bits(0, 16);
            bw.write_bits(0, 8);
        }
        bw.write_bit(true);
        bw.finish()
    }

    pub fn headers(&self) -> [Vec<u8>; 3] {
        [self.identification(), self.comment(), self.setup()]
    }

    /// Xiph lacing 打包的三个头包
    pub fn extradata(&self) -> Vec<u8> {
        let [ident, comment, setup] = self.headers();
        let mut out = vec![0x02];
        for len in [ident.len(), comment.len()] {
            let mut rest = len;
            while rest >= 255 {
                out.push(255);
                rest -= 255;
            }
            out.push(rest as u8);
        }
        out.extend_from_slice(&ident);
        out.extend_from_slice(&comment);
        out.extend_from_slice(&setup);
        out
    }

    /// 每个声道是否跳过 residue: floor 未使用且耦合对中另一声道也未使用
    pub fn no_residue(&self, block: &Block) -> Vec<bool> {
        let mut skip: Vec<bool> = block.floors.iter().map(|f| *f == Floor::Unused).collect();
        if self.channels >= 2 && !(skip[0] && skip[1]) {
            skip[0] = false;
            skip[1] = false;
        }
        skip
    }

    pub fn audio_packet(&self, block: &Block) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bit(false);
        bw.write_bits(block.mode as u32, ilog(self.modes.len() as u32 - 1));
        if self.is_long(block) {
            bw.write_bit(block.prev_long);
            bw.write_bit(block.next_long);
        }

        for floor in &block.floors {
            self.write_floor(&mut bw, floor);
        }

        let skip = self.no_residue(block);
        if self.residue_type == 2 {
            if !skip.iter().all(|&s| s) {
                write_partitions(&mut bw, &block.partitions[..1], &[false]);
            }
        } else {
            write_partitions(&mut bw, &block.partitions, &skip);
        }
        bw.finish()
    }

    fn write_floor(&self, bw: &mut BitWriter, floor: &Floor) {
        match (self.floor_type, floor) {
            (0, Floor::Unused) => bw.write_bits(0, FLOOR0_AMPLITUDE_BITS),
            (0, Floor::Lsp { amplitude, entries }) => {
                bw.write_bits(*amplitude, FLOOR0_AMPLITUDE_BITS);
                bw.write_bits(0, 1); // book 编号
                for &e in entries {
                    bw.write_codeword(u32::from(e), 2);
                }
            }
            (1, Floor::Unused) => bw.write_bit(false),
            (1, Floor::Line([y0, y1, c2, c3])) => {
                bw.write_bit(true);
                bw.write_bits(*y0, 8);
                bw.write_bits(*y1, 8);
                bw.write_codeword(*c2, 3);
                bw.write_codeword(*c3, 3);
            }
            (floor_type, floor) => panic!("floor{floor_type} 流不能写入 {floor:?}"),
        }
    }

    /// 耦合反变换并乘以 floor 曲线后的每声道频谱 (长度 n/2)
    pub fn expected_spectra(&self, block: &Block) -> Vec<Vec<f64>> {
        let n2 = block_size(self.is_long(block)) / 2;
        let channels = usize::from(self.channels);
        let skip = self.no_residue(block);

        let mut spectra: Vec<Vec<f64>> = if self.residue_type == 2 {
            let mut spectra = vec![vec![0.0f64; n2]; channels];
            if !skip.iter().all(|&s| s) {
                let interleaved = residue_vector(&block.partitions[0], n2 * channels);
                for (i, v) in interleaved.into_iter().enumerate() {
                    spectra[i % channels][i / channels] = v;
                }
            }
            spectra
        } else {
            block
                .partitions
                .iter()
                .zip(&skip)
                .map(|(partitions, &s)| {
                    if s {
                        vec![0.0f64; n2]
                    } else {
                        residue_vector(partitions, n2)
                    }
                })
                .collect()
        };

        if self.channels >= 2 {
            let (first, rest) = spectra.split_at_mut(1);
            for (m, a) in first[0].iter_mut().zip(rest[0].iter_mut()) {
                let (new_m, new_a) = match (*m > 0.0, *a > 0.0) {
                    (true, true) => (*m, *m - *a),
                    (true, false) => (*m + *a, *m),
                    (false, true) => (*m, *m + *a),
                    (false, false) => (*m - *a, *m),
                };
                *m = new_m;
                *a = new_a;
            }
        }

        for (spectrum, floor) in spectra.iter_mut().zip(&block.floors) {
            let curve = floor_curve(floor, n2);
            for (v, c) in spectrum.iter_mut().zip(curve) {
                *v *= c;
            }
        }
        spectra
    }
}

fn write_partitions(bw: &mut BitWriter, vectors: &[Vec<Option<[u8; 4]>>], skip: &[bool]) {
    let active: Vec<&Vec<Option<[u8; 4]>>> = vectors
        .iter()
        .zip(skip)
        .filter(|(_, s)| !**s)
        .map(|(v, _)| v)
        .collect();
    for p in 0..PARTITIONS {
        for vector in &active {
            bw.write_codeword(u32::from(vector[p].is_some()), 1);
        }
        for vector in &active {
            if let Some(entries) = vector[p] {
                for e in entries {
                    bw.write_codeword(u32::from(e), 2);
                }
            }
        }
    }
}

fn residue_vector(partitions: &[Option<[u8; 4]>], len: usize) -> Vec<f64> {
    let value = |bit: u8| if bit == 0 { -RESIDUE_VALUE } else { RESIDUE_VALUE };
    let mut vector = vec![0.0f64; len];
    for (p, partition) in partitions.iter().enumerate() {
        if let Some(entries) = partition {
            for (k, &e) in entries.iter().enumerate() {
                let base = p * PARTITION_SIZE + 2 * k;
                vector[base] = value(e % 2);
                vector[base + 1] = value(e / 2);
            }
        }
    }
    vector
}

struct Lookup<'a> {
    minimum: f32,
    delta: f32,
    value_bits: u32,
    multiplicands: &'a [u32],
}

fn write_codebook(bw: &mut BitWriter, dimensions: u32, lengths: &[u8], lookup1: Option<Lookup<'_>>) {
    bw.write_bits(0x564342, 24);
    bw.write_bits(dimensions, 16);
    bw.write_bits(lengths.len() as u32, 24);
    bw.write_bit(false); // 非 ordered
    bw.write_bit(false); // 非 sparse
    for &len in lengths {
        bw.write_bits(u32::from(len) - 1, 5);
    }
    match lookup1 {
        None => bw.write_bits(0, 4),
        Some(lookup) => {
            bw.write_bits(1, 4);
            bw.write_bits(pack_float(lookup.minimum), 32);
            bw.write_bits(pack_float(lookup.delta), 32);
            bw.write_bits(lookup.value_bits - 1, 4);
            bw.write_bit(false);
            for &m in lookup.multiplicands {
                bw.write_bits(m, lookup.value_bits);
            }
        }
    }
}

/// floor 曲线 (长度 n2), 未使用的 floor 为全零
pub fn floor_curve(floor: &Floor, n2: usize) -> Vec<f64> {
    match *floor {
        Floor::Line(y) => floor1_curve(y, n2),
        Floor::Lsp { amplitude, entries } => floor0_curve(amplitude, entries, n2),
        Floor::Unused => vec![0.0; n2],
    }
}

fn inverse_db(y: i64) -> f64 {
    INVERSE_DB_MIN * (1.0 / INVERSE_DB_MIN).powf(y.clamp(0, 255) as f64 / 255.0)
}

/// 过 (x0, y0) 与 (x1, y1) 的整数直线在 x 处的值, 向 y0 方向取整
fn line_y(x0: i64, y0: i64, x1: i64, y1: i64, x: i64) -> i64 {
    let dy = y1 - y0;
    let off = dy.abs() * (x - x0) / (x1 - x0);
    if dy < 0 { y0 - off } else { y0 + off }
}

fn floor1_curve(raw: [u32; 4], n2: usize) -> Vec<f64> {
    const RANGE: i64 = 256;
    let raw = raw.map(i64::from);
    let mut final_y = [raw[0], raw[1], 0, 0];
    let mut used = [true, true, false, false];
    // X = 256 的邻居是两个端点, X = 512 的邻居是 X = 256 与 X = 1024
    for (i, low, high) in [(2, 0, 1), (3, 2, 1)] {
        let x = FLOOR1_X;
        let predicted = line_y(x[low], final_y[low], x[high], final_y[high], x[i]);
        let v = raw[i];
        if v == 0 {
            final_y[i] = predicted;
            continue;
        }
        used[low] = true;
        used[high] = true;
        used[i] = true;
        let highroom = RANGE - predicted;
        let lowroom = predicted;
        final_y[i] = if v >= 2 * highroom.min(lowroom) {
            if highroom > lowroom {
                predicted + v - lowroom
            } else {
                predicted - v + highroom - 1
            }
        } else if v % 2 == 1 {
            predicted - (v + 1) / 2
        } else {
            predicted + v / 2
        };
    }
    let final_y = final_y.map(|y| y.clamp(0, RANGE - 1));

    let points: Vec<(i64, i64)> = [0, 2, 3, 1]
        .into_iter()
        .filter(|&i| used[i])
        .map(|i| (FLOOR1_X[i], final_y[i]))
        .collect();
    (0..n2 as i64)
        .map(|x| {
            let y = points
                .windows(2)
                .find(|w| x >= w[0].0 && x < w[1].0)
                .map_or(points[points.len() - 1].1, |w| {
                    line_y(w[0].0, w[0].1, w[1].0, w[1].1, x)
                });
            inverse_db(y)
        })
        .collect()
}

/// 与解码器相同的单精度 bark 映射, 保证取整边界一致
fn bark_map(n2: usize) -> Vec<u32> {
    fn bark(x: f32) -> f32 {
        13.1 * (0.00074 * x).atan() + 2.24 * (0.0000000185 * x * x).atan() + 0.0001 * x
    }
    let rate = SAMPLE_RATE as f32;
    let size = FLOOR0_BARK_MAP_SIZE;
    let scale = size as f32 / bark(0.5 * rate);
    (0..n2)
        .map(|i| {
            let freq = rate * i as f32 / (2.0 * n2 as f32);
            ((bark(freq) * scale).floor() as u32).min(size - 1)
        })
        .collect()
}

fn floor0_curve(amplitude: u32, entries: [u8; 2], n2: usize) -> Vec<f64> {
    let value = |e: u8| FLOOR0_MINIMUM + FLOOR0_DELTA * f64::from(e);
    let c0 = value(entries[0]);
    let c1 = c0 + value(entries[1]);
    let max_amplitude = f64::from((1u32 << FLOOR0_AMPLITUDE_BITS) - 1);
    let offset = f64::from(FLOOR0_AMPLITUDE_OFFSET);
    bark_map(n2)
        .into_iter()
        .map(|m| {
            let cos_omega = (PI * f64::from(m) / f64::from(FLOOR0_BARK_MAP_SIZE)).cos();
            let p = (1.0 - cos_omega) / 2.0 * 4.0 * (c1.cos() - cos_omega).powi(2);
            let q = (1.0 + cos_omega) / 2.0 * 4.0 * (c0.cos() - cos_omega).powi(2);
            (0.11512925
                * (f64::from(amplitude) * offset / (max_amplitude * (p + q).sqrt()) - offset))
                .exp()
        })
        .collect()
}

/// 直接按定义计算的 IMDCT (双精度)
pub fn naive_imdct(spectrum: &[f64]) -> Vec<f64> {
    let n = spectrum.len() * 2;
    let nonzero: Vec<(usize, f64)> = spectrum
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| v != 0.0)
        .collect();
    (0..n)
        .map(|i| {
            nonzero
                .iter()
                .map(|&(k, v)| {
                    v * (2.0 * PI / n as f64
                        * (i as f64 + 0.5 + n as f64 / 4.0)
                        * (k as f64 + 0.5))
                        .cos()
                })
                .sum()
        })
        .collect()
}

fn slope(len: usize, i: usize) -> f64 {
    let x = ((i as f64 + 0.5) / len as f64 * FRAC_PI_2).sin();
    (FRAC_PI_2 * x * x).sin()
}

/// 按定义计算的 Vorbis 窗
pub fn window(n: usize, left_size: usize, right_size: usize) -> Vec<f64> {
    let (ll, rl) = (left_size / 2, right_size / 2);
    let left_start = n / 4 - ll / 2;
    let right_start = 3 * n / 4 - rl / 2;
    (0..n)
        .map(|i| {
            if i < left_start {
                0.0
            } else if i < left_start + ll {
                slope(ll, i - left_start)
            } else if i < right_start {
                1.0
            } else if i < right_start + rl {
                slope(rl, rl - 1 - (i - right_start))
            } else {
                0.0
            }
        })
        .collect()
}

/// 双精度参考解码: IMDCT + 加窗 + 重叠相加
#[derive(Debug, Default)]
pub struct Reference {
    prev: Option<(usize, Vec<Vec<f64>>)>,
}

impl Reference {
    pub fn push(&mut self, builder: &StreamBuilder, block: &Block) -> Option<Vec<Vec<f64>>> {
        let long = builder.is_long(block);
        let n = block_size(long);
        let short = block_size(false);
        let left = if long && !block.prev_long { short } else { n };
        let right = if long && !block.next_long { short } else { n };
        let w = window(n, left, right);
        let blocks: Vec<Vec<f64>> = builder
            .expected_spectra(block)
            .iter()
            .map(|s| naive_imdct(s).iter().zip(&w).map(|(v, w)| v * w).collect())
            .collect();

        let output = self.prev.take().map(|(p, prev_blocks)| {
            let len = p / 4 + n / 4;
            prev_blocks
                .iter()
                .zip(&blocks)
                .map(|(prev, cur)| {
                    (0..len)
                        .map(|i| {
                            let tail = prev.get(p / 2 + i).copied().unwrap_or(0.0);
                            let j = i as isize + (n / 4) as isize - (p / 4) as isize;
                            let head = if j >= 0 { cur[j as usize] } else { 0.0 };
                            tail + head
                        })
                        .collect()
                })
                .collect()
        });
        self.prev = Some((n, blocks));
        output
    }
}
