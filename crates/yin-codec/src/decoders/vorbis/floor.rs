//! Vorbis floor 解码: floor0 (LSP) 与 floor1 (分段折线).
//!
//! 解码分两步: `decode_floor` 在 residue 之前从位流读取参数,
//! `render_floor` 在 residue 之后生成长度为 `n/2` 的线性幅度曲线.

use std::f32::consts::PI;

use yin_core::bitreader::{BitReader, ilog};
use yin_core::{YinError, YinResult};

use super::codebook::Codebook;
use super::setup::{Floor0Config, Floor1Config, FloorConfig};

const FLOOR1_RANGES: [i32; 4] = [256, 128, 86, 64];

/// 单个声道解码出的 floor 参数
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FloorData {
    /// 本包未传输 floor, 声道静音
    Unused,
    Floor0 { amplitude: u64, coefficients: Vec<f32> },
    Floor1 { y: Vec<i32> },
}

impl FloorData {
    pub(crate) fn is_unused(&self) -> bool {
        matches!(self, Self::Unused)
    }
}

/// 从音频包读取一个声道的 floor 参数
pub(crate) fn decode_floor(
    br: &mut BitReader<'_>,
    floor: &FloorConfig,
    codebooks: &[Codebook],
) -> YinResult<FloorData> {
    match floor {
        FloorConfig::Floor0(cfg) => decode_floor0(br, cfg, codebooks),
        FloorConfig::Floor1(cfg) => decode_floor1(br, cfg, codebooks),
    }
}

/// 生成 floor 曲线, `out` 长度为当前块长的一半
pub(crate) fn render_floor(floor: &FloorConfig, data: &FloorData, long_block: bool, out: &mut [f32]) {
    match (floor, data) {
        (FloorConfig::Floor0(cfg), FloorData::Floor0 {
            amplitude,
            coefficients,
        }) => render_floor0(cfg, *amplitude, coefficients, long_block, out),
        (FloorConfig::Floor1(cfg), FloorData::Floor1 { y }) => render_floor1(cfg, y, out),
        _ => out.fill(0.0),
    }
}

fn decode_floor0(
    br: &mut BitReader<'_>,
    cfg: &Floor0Config,
    codebooks: &[Codebook],
) -> YinResult<FloorData> {
    let amplitude = br.read_bits_u64(cfg.amplitude_bits)?;
    if amplitude == 0 {
        return Ok(FloorData::Unused);
    }

    let book_number = br.read_bits(ilog(cfg.books.len() as u32))? as usize;
    let book = cfg
        .books
        .get(book_number)
        .map(|&idx| &codebooks[idx])
        .ok_or_else(|| YinError::InvalidData(format!("floor0 book 编号越界: {book_number}")))?;

    let mut coefficients = Vec::with_capacity(cfg.order + book.dimensions);
    let mut temp = vec![0.0f32; book.dimensions];
    let mut last = 0.0f32;
    while coefficients.len() < cfg.order {
        book.decode_vector(br, &mut temp)?;
        coefficients.extend(temp.iter().map(|v| v + last));
        last = coefficients.last().copied().unwrap_or(last);
    }
    coefficients.truncate(cfg.order);

    Ok(FloorData::Floor0 {
        amplitude,
        coefficients,
    })
}

fn bark(x: f32) -> f32 {
    13.1 * (0.00074 * x).atan() + 2.24 * (0.0000000185 * x * x).atan() + 0.0001 * x
}

/// 计算 floor0 的 bark 映射表, `n` 为半块长度
pub(crate) fn build_bark_map(n: usize, rate: u32, bark_map_size: u32) -> Vec<u32> {
    let rate = rate as f32;
    let scale = bark_map_size as f32 / bark(0.5 * rate);
    (0..n)
        .map(|i| {
            let freq = rate * i as f32 / (2.0 * n as f32);
            let v = (bark(freq) * scale).floor() as u32;
            v.min(bark_map_size - 1)
        })
        .collect()
}

fn render_floor0(
    cfg: &Floor0Config,
    amplitude: u64,
    coefficients: &[f32],
    long_block: bool,
    out: &mut [f32],
) {
    let map = &cfg.bark_maps[usize::from(long_block)];
    let n = out.len().min(map.len());
    let cos_coefficients: Vec<f32> = coefficients.iter().map(|c| c.cos()).collect();
    let max_amplitude = ((1u64 << cfg.amplitude_bits) - 1) as f32;
    let offset = cfg.amplitude_offset as f32;
    let odd_order = cfg.order % 2 == 1;

    let mut i = 0;
    while i < n {
        let current = map[i];
        let cos_omega = (PI * current as f32 / cfg.bark_map_size as f32).cos();
        let (mut p, mut q) = if odd_order {
            (1.0 - cos_omega * cos_omega, 0.25)
        } else {
            ((1.0 - cos_omega) / 2.0, (1.0 + cos_omega) / 2.0)
        };
        for (j, &c) in cos_coefficients.iter().enumerate() {
            let d = 4.0 * (c - cos_omega) * (c - cos_omega);
            if j % 2 == 1 {
                p *= d;
            } else {
                q *= d;
            }
        }
        let linear = (0.11512925
            * (amplitude as f32 * offset / (max_amplitude * (p + q).sqrt()) - offset))
            .exp();
        while i < n && map[i] == current {
            out[i] = linear;
            i += 1;
        }
    }
    out[n..].fill(0.0);
}

fn decode_floor1(
    br: &mut BitReader<'_>,
    cfg: &Floor1Config,
    codebooks: &[Codebook],
) -> YinResult<FloorData> {
    if !br.read_flag()? {
        return Ok(FloorData::Unused);
    }

    let range = FLOOR1_RANGES[(cfg.multiplier - 1) as usize];
    let bits = ilog((range - 1) as u32);
    let mut y = Vec::with_capacity(cfg.x_list.len());
    y.push(br.read_bits(bits)? as i32);
    y.push(br.read_bits(bits)? as i32);

    for &class_idx in &cfg.partition_classes {
        let class = &cfg.classes[class_idx];
        let csub = (1u32 << class.subclass_bits) - 1;
        let mut cval = match class.masterbook {
            Some(book) => codebooks[book].decode_symbol(br)?,
            None => 0,
        };
        for _ in 0..class.dimensions {
            let book = class.subclass_books[(cval & csub) as usize];
            cval >>= class.subclass_bits;
            y.push(match book {
                Some(book) => codebooks[book].decode_symbol(br)? as i32,
                None => 0,
            });
        }
    }

    Ok(FloorData::Floor1 { y })
}

fn render_floor1(cfg: &Floor1Config, y: &[i32], out: &mut [f32]) {
    let range = FLOOR1_RANGES[(cfg.multiplier - 1) as usize];
    let multiplier = cfg.multiplier as i32;
    let x = &cfg.x_list;
    let count = y.len().min(x.len());

    let mut step2 = vec![false; count];
    let mut final_y = vec![0i32; count];
    step2[..2].fill(true);
    final_y[..2].copy_from_slice(&y[..2]);

    for i in 2..count {
        let (low, high) = cfg.neighbors[i];
        let predicted = render_point(x[low], final_y[low], x[high], final_y[high], x[i]);
        if y[i] != 0 {
            step2[low] = true;
            step2[high] = true;
            step2[i] = true;
            final_y[i] = dequantize(y[i], predicted, range);
        } else {
            final_y[i] = predicted;
        }
    }
    for v in &mut final_y {
        *v = (*v).clamp(0, range - 1);
    }

    let mut lx = 0usize;
    let mut ly = final_y[cfg.sorted_order[0]] * multiplier;
    for &idx in cfg.sorted_order.iter().skip(1) {
        if idx >= count || !step2[idx] {
            continue;
        }
        let hx = x[idx] as usize;
        let hy = final_y[idx] * multiplier;
        render_line(lx, ly, hx, hy, out);
        lx = hx;
        ly = hy;
    }
    if lx < out.len() {
        out[lx..].fill(inverse_db(ly));
    }
}

fn render_point(x0: u32, y0: i32, x1: u32, y1: i32, x: u32) -> i32 {
    let dy = y1 - y0;
    let adx = x1 as i32 - x0 as i32;
    if adx == 0 {
        return y0;
    }
    let off = dy.abs() * (x as i32 - x0 as i32) / adx;
    if dy < 0 { y0 - off } else { y0 + off }
}

fn dequantize(v: i32, predicted: i32, range: i32) -> i32 {
    let highroom = range - predicted;
    let lowroom = predicted;
    let room = 2 * highroom.min(lowroom);
    if v < room {
        if v & 1 == 1 {
            predicted - (v + 1) / 2
        } else {
            predicted + v / 2
        }
    } else if highroom > lowroom {
        predicted + v - lowroom
    } else {
        predicted - v + highroom - 1
    }
}

/// 整数 Bresenham 画线, 写入 `[x0, x1)` 中落在 `out` 内的部分
fn render_line(x0: usize, y0: i32, x1: usize, y1: i32, out: &mut [f32]) {
    if x1 <= x0 {
        return;
    }
    let dy = y1 - y0;
    let adx = (x1 - x0) as i32;
    let base = dy / adx;
    let sy = if dy < 0 { base - 1 } else { base + 1 };
    let ady = dy.abs() - base.abs() * adx;
    let mut y = y0;
    let mut err = 0i32;
    for x in x0..x1.min(out.len()) {
        if x > x0 {
            err += ady;
            if err >= adx {
                err -= adx;
                y += sy;
            } else {
                y += base;
            }
        }
        out[x] = inverse_db(y);
    }
}

fn inverse_db(y: i32) -> f32 {
    FLOOR1_INVERSE_DB_TABLE[y.clamp(0, 255) as usize]
}

#[allow(clippy::excessive_precision)]
static FLOOR1_INVERSE_DB_TABLE: &[f32; 256] = &[
    1.0649863e-07,
    1.1341951e-07,
    1.2079015e-07,
    1.2863978e-07,
    1.3699951e-07,
    1.4590251e-07,
    1.5538408e-07,
    1.6548181e-07,
    1.7623575e-07,
    1.8768855e-07,
    1.9988561e-07,
    2.1287530e-07,
    2.2670913e-07,
    2.4144197e-07,
    2.5713223e-07,
    2.7384213e-07,
    2.9163793e-07,
    3.1059021e-07,
    3.3077411e-07,
    3.5226968e-07,
    3.7516214e-07,
    3.9954229e-07,
    4.2550680e-07,
    4.5315863e-07,
    4.8260743e-07,
    5.1396998e-07,
    5.4737065e-07,
    5.8294187e-07,
    6.2082472e-07,
    6.6116941e-07,
    7.0413592e-07,
    7.4989464e-07,
    7.9862701e-07,
    8.5052630e-07,
    9.0579828e-07,
    9.6466216e-07,
    1.0273513e-06,
    1.0941144e-06,
    1.1652161e-06,
    1.2409384e-06,
    1.3215816e-06,
    1.4074654e-06,
    1.4989305e-06,
    1.5963394e-06,
    1.7000785e-06,
    1.8105592e-06,
    1.9282195e-06,
    2.0535261e-06,
    2.1869758e-06,
    2.3290978e-06,
    2.4804557e-06,
    2.6416497e-06,
    2.8133190e-06,
    2.9961443e-06,
    3.1908506e-06,
    3.3982101e-06,
    3.6190449e-06,
    3.8542308e-06,
    4.1047004e-06,
    4.3714470e-06,
    4.6555282e-06,
    4.9580707e-06,
    5.2802740e-06,
    5.6234160e-06,
    5.9888572e-06,
    6.3780469e-06,
    6.7925283e-06,
    7.2339451e-06,
    7.7040476e-06,
    8.2047000e-06,
    8.7378876e-06,
    9.3057248e-06,
    9.9104632e-06,
    1.0554501e-05,
    1.1240392e-05,
    1.1970856e-05,
    1.2748789e-05,
    1.3577278e-05,
    1.4459606e-05,
    1.5399272e-05,
    1.6400004e-05,
    1.7465768e-05,
    1.8600792e-05,
    1.9809576e-05,
    2.1096914e-05,
    2.2467911e-05,
    2.3928002e-05,
    2.5482978e-05,
    2.7139006e-05,
    2.8902651e-05,
    3.0780908e-05,
    3.2781225e-05,
    3.4911534e-05,
    3.7180282e-05,
    3.9596466e-05,
    4.2169667e-05,
    4.4910090e-05,
    4.7828601e-05,
    5.0936773e-05,
    5.4246931e-05,
    5.7772202e-05,
    6.1526565e-05,
    6.5524908e-05,
    6.9783085e-05,
    7.4317983e-05,
    7.9147585e-05,
    8.4291040e-05,
    8.9768747e-05,
    9.5602426e-05,
    1.0181521e-04,
    1.0843174e-04,
    1.1547824e-04,
    1.2298267e-04,
    1.3097477e-04,
    1.3948625e-04,
    1.4855085e-04,
    1.5820453e-04,
    1.6848555e-04,
    1.7943469e-04,
    1.9109536e-04,
    2.0351382e-04,
    2.1673929e-04,
    2.3082423e-04,
    2.4582449e-04,
    2.6179955e-04,
    2.7881275e-04,
    2.9693158e-04,
    3.1622787e-04,
    3.3677814e-04,
    3.5866388e-04,
    3.8197188e-04,
    4.0679456e-04,
    4.3323036e-04,
    4.6138411e-04,
    4.9136745e-04,
    5.2329927e-04,
    5.5730621e-04,
    5.9352311e-04,
    6.3209358e-04,
    6.7317058e-04,
    7.1691700e-04,
    7.6350630e-04,
    8.1312324e-04,
    8.6596457e-04,
    9.2223983e-04,
    9.8217216e-04,
    1.0459992e-03,
    1.1139742e-03,
    1.1863665e-03,
    1.2634633e-03,
    1.3455702e-03,
    1.4330129e-03,
    1.5261382e-03,
    1.6253153e-03,
    1.7309374e-03,
    1.8434235e-03,
    1.9632195e-03,
    2.0908006e-03,
    2.2266726e-03,
    2.3713743e-03,
    2.5254795e-03,
    2.6895994e-03,
    2.8643847e-03,
    3.0505286e-03,
    3.2487691e-03,
    3.4598925e-03,
    3.6847358e-03,
    3.9241906e-03,
    4.1792066e-03,
    4.4507950e-03,
    4.7400328e-03,
    5.0480668e-03,
    5.3761186e-03,
    5.7254891e-03,
    6.0975636e-03,
    6.4938176e-03,
    6.9158225e-03,
    7.3652516e-03,
    7.8438871e-03,
    8.3536271e-03,
    8.8964928e-03,
    9.4746370e-03,
    1.0090352e-02,
    1.0746080e-02,
    1.1444421e-02,
    1.2188144e-02,
    1.2980198e-02,
    1.3823725e-02,
    1.4722068e-02,
    1.5678791e-02,
    1.6697687e-02,
    1.7782797e-02,
    1.8938423e-02,
    2.0169149e-02,
    2.1479854e-02,
    2.2875735e-02,
    2.4362330e-02,
    2.5945531e-02,
    2.7631618e-02,
    2.9427276e-02,
    3.1339626e-02,
    3.3376252e-02,
    3.5545228e-02,
    3.7855157e-02,
    4.0315199e-02,
    4.2935108e-02,
    4.5725273e-02,
    4.8696758e-02,
    5.1861348e-02,
    5.5231591e-02,
    5.8820850e-02,
    6.2643361e-02,
    6.6714279e-02,
    7.1049749e-02,
    7.5666962e-02,
    8.0584227e-02,
    8.5821044e-02,
    9.1398179e-02,
    9.7337747e-02,
    1.0366330e-01,
    1.1039993e-01,
    1.1757434e-01,
    1.2521498e-01,
    1.3335215e-01,
    1.4201813e-01,
    1.5124727e-01,
    1.6107617e-01,
    1.7154380e-01,
    1.8269168e-01,
    1.9456402e-01,
    2.0720788e-01,
    2.2067342e-01,
    2.3501402e-01,
    2.5028656e-01,
    2.6655159e-01,
    2.8387361e-01,
    3.0232132e-01,
    3.2196786e-01,
    3.4289114e-01,
    3.6517414e-01,
    3.8890521e-01,
    4.1417847e-01,
    4.4109412e-01,
    4.6975890e-01,
    5.0028648e-01,
    5.3279791e-01,
    5.6742212e-01,
    6.0429640e-01,
    6.4356699e-01,
    6.8538959e-01,
    7.2993007e-01,
    7.7736504e-01,
    8.2788260e-01,
    8.8168307e-01,
    9.3897980e-01,
    1.0,
];
