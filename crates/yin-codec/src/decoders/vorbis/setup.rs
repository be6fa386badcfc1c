//! Vorbis setup 头包解析: codebook, floor, residue, mapping, mode.

use yin_core::bitreader::{BitReader, ilog};
use yin_core::{YinError, YinResult};

use super::codebook::Codebook;
use super::floor::build_bark_map;
use super::headers::{IdentificationHeader, SETUP_PACKET, check_packet_magic};

/// setup 头包解析结果, 建立后在整个流中保持不变
#[derive(Debug, Clone)]
pub(crate) struct VorbisSetup {
    pub(crate) codebooks: Vec<Codebook>,
    pub(crate) floors: Vec<FloorConfig>,
    pub(crate) residues: Vec<ResidueConfig>,
    pub(crate) mappings: Vec<MappingConfig>,
    pub(crate) modes: Vec<ModeConfig>,
}

#[derive(Debug, Clone)]
pub(crate) enum FloorConfig {
    Floor0(Floor0Config),
    Floor1(Floor1Config),
}

#[derive(Debug, Clone)]
pub(crate) struct Floor0Config {
    pub(crate) order: usize,
    pub(crate) amplitude_bits: u32,
    pub(crate) amplitude_offset: u32,
    pub(crate) bark_map_size: u32,
    pub(crate) books: Vec<usize>,
    /// 按 block flag 索引 (0 = 短块, 1 = 长块) 的 bark 映射表
    pub(crate) bark_maps: [Vec<u32>; 2],
}

#[derive(Debug, Clone)]
pub(crate) struct Floor1Class {
    pub(crate) dimensions: usize,
    pub(crate) subclass_bits: u32,
    pub(crate) masterbook: Option<usize>,
    pub(crate) subclass_books: Vec<Option<usize>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Floor1Config {
    pub(crate) partition_classes: Vec<usize>,
    pub(crate) classes: Vec<Floor1Class>,
    pub(crate) multiplier: u32,
    pub(crate) x_list: Vec<u32>,
    /// 按 X 升序排列的点索引
    pub(crate) sorted_order: Vec<usize>,
    /// 每个点 (下标 >= 2) 的 (low, high) 邻居索引
    pub(crate) neighbors: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResidueType {
    Interleaved,
    Concatenated,
    ChannelInterleaved,
}

#[derive(Debug, Clone)]
pub(crate) struct ResidueConfig {
    pub(crate) residue_type: ResidueType,
    pub(crate) begin: usize,
    pub(crate) end: usize,
    pub(crate) partition_size: usize,
    pub(crate) classifications: usize,
    pub(crate) classbook: usize,
    /// `books[class][pass]`
    pub(crate) books: Vec<[Option<usize>; 8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CouplingStep {
    pub(crate) magnitude: usize,
    pub(crate) angle: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Submap {
    pub(crate) floor: usize,
    pub(crate) residue: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct MappingConfig {
    pub(crate) coupling: Vec<CouplingStep>,
    /// 每个声道所属的 submap
    pub(crate) mux: Vec<usize>,
    pub(crate) submaps: Vec<Submap>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ModeConfig {
    pub(crate) block_flag: bool,
    pub(crate) mapping: usize,
}

/// 解析 setup 头包
pub(crate) fn parse_setup_packet(
    packet: &[u8],
    ident: &IdentificationHeader,
) -> YinResult<VorbisSetup> {
    check_packet_magic(packet, SETUP_PACKET, "setup")?;

    let mut br = BitReader::new(&packet[7..]);
    let codebooks = run_stage(&mut br, "codebooks", parse_codebooks)?;
    run_stage(&mut br, "time", parse_time_domain_transforms)?;
    let floors = run_stage(&mut br, "floors", |br| parse_floors(br, &codebooks, ident))?;
    let residues = run_stage(&mut br, "residues", |br| parse_residues(br, &codebooks))?;
    let mappings = run_stage(&mut br, "mappings", |br| {
        parse_mappings(br, ident.channels, floors.len(), residues.len())
    })?;
    let modes = run_stage(&mut br, "modes", |br| parse_modes(br, mappings.len()))?;

    if !run_stage(&mut br, "framing", |br| br.read_flag())? {
        return Err(YinError::BadHeader("setup 头包 framing_flag 非法".into()));
    }

    Ok(VorbisSetup {
        codebooks,
        floors,
        residues,
        mappings,
        modes,
    })
}

/// 执行一个解析阶段, 把位流与结构错误统一为 `BadHeader`, 其余致命错误原样返回
fn run_stage<'a, T>(
    br: &mut BitReader<'a>,
    stage: &str,
    parse: impl FnOnce(&mut BitReader<'a>) -> YinResult<T>,
) -> YinResult<T> {
    parse(br).map_err(|e| match e {
        YinError::OutOfData => YinError::BadHeader(format!(
            "setup {stage} 数据不足(bit={})",
            br.bit_position(),
        )),
        YinError::InvalidData(msg) | YinError::InvalidArgument(msg) => YinError::BadHeader(
            format!("setup {stage} 解析失败(bit={}): {msg}", br.bit_position()),
        ),
        other => other,
    })
}

fn invalid(msg: impl Into<String>) -> YinError {
    YinError::InvalidData(msg.into())
}

fn parse_codebooks(br: &mut BitReader<'_>) -> YinResult<Vec<Codebook>> {
    let count = br.read_bits(8)? + 1;
    (0..count).map(|_| Codebook::read(br)).collect()
}

fn parse_time_domain_transforms(br: &mut BitReader<'_>) -> YinResult<()> {
    let count = br.read_bits(6)? + 1;
    for _ in 0..count {
        if br.read_bits(16)? != 0 {
            return Err(invalid("time domain transform 必须为 0"));
        }
    }
    Ok(())
}

fn book_index(raw: u32, codebooks: &[Codebook], what: &str) -> YinResult<usize> {
    let idx = raw as usize;
    if idx >= codebooks.len() {
        return Err(invalid(format!(
            "{what} 引用的 codebook {idx} 不存在 (共 {} 个)",
            codebooks.len(),
        )));
    }
    Ok(idx)
}

fn parse_floors(
    br: &mut BitReader<'_>,
    codebooks: &[Codebook],
    ident: &IdentificationHeader,
) -> YinResult<Vec<FloorConfig>> {
    let count = br.read_bits(6)? + 1;
    let mut floors = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let floor_type = br.read_bits(16)?;
        let floor = match floor_type {
            0 => FloorConfig::Floor0(parse_floor0(br, codebooks, ident)?),
            1 => FloorConfig::Floor1(parse_floor1(br, codebooks)?),
            other => {
                return Err(YinError::UnsupportedFormat(format!(
                    "floor_type 不支持: {other}",
                )));
            }
        };
        floors.push(floor);
    }
    Ok(floors)
}

fn parse_floor0(
    br: &mut BitReader<'_>,
    codebooks: &[Codebook],
    ident: &IdentificationHeader,
) -> YinResult<Floor0Config> {
    let order = br.read_bits(8)? as usize;
    let rate = br.read_bits(16)?;
    let bark_map_size = br.read_bits(16)?;
    let amplitude_bits = br.read_bits(6)?;
    let amplitude_offset = br.read_bits(8)?;
    let book_count = br.read_bits(4)? + 1;
    let mut books = Vec::with_capacity(book_count as usize);
    for _ in 0..book_count {
        let idx = book_index(br.read_bits(8)?, codebooks, "floor0")?;
        if !codebooks[idx].has_lookup() {
            return Err(invalid(format!("floor0 codebook {idx} 缺少 VQ 值映射")));
        }
        books.push(idx);
    }
    if order == 0 || rate == 0 || bark_map_size == 0 || amplitude_bits == 0 {
        return Err(invalid(format!(
            "floor0 参数非法: order={order}, rate={rate}, bark_map_size={bark_map_size}, amplitude_bits={amplitude_bits}",
        )));
    }

    let bark_maps = [false, true]
        .map(|long| build_bark_map(ident.blocksize(long) / 2, rate, bark_map_size));
    Ok(Floor0Config {
        order,
        amplitude_bits,
        amplitude_offset,
        bark_map_size,
        books,
        bark_maps,
    })
}

fn parse_floor1(br: &mut BitReader<'_>, codebooks: &[Codebook]) -> YinResult<Floor1Config> {
    let partitions = br.read_bits(5)?;
    let partition_classes = (0..partitions)
        .map(|_| br.read_bits(4).map(|c| c as usize))
        .collect::<YinResult<Vec<_>>>()?;
    let class_count = partition_classes.iter().copied().max().map_or(0, |m| m + 1);

    let mut classes = Vec::with_capacity(class_count);
    for _ in 0..class_count {
        let dimensions = br.read_bits(3)? as usize + 1;
        let subclass_bits = br.read_bits(2)?;
        let masterbook = if subclass_bits > 0 {
            Some(book_index(br.read_bits(8)?, codebooks, "floor1 masterbook")?)
        } else {
            None
        };
        let subclass_books = (0..1u32 << subclass_bits)
            .map(|_| match br.read_bits(8)? {
                0 => Ok(None),
                raw => book_index(raw - 1, codebooks, "floor1 subclass").map(Some),
            })
            .collect::<YinResult<Vec<_>>>()?;
        classes.push(Floor1Class {
            dimensions,
            subclass_bits,
            masterbook,
            subclass_books,
        });
    }

    let multiplier = br.read_bits(2)? + 1;
    let range_bits = br.read_bits(4)?;
    let mut x_list = vec![0u32, 1u32 << range_bits];
    for &class in &partition_classes {
        for _ in 0..classes[class].dimensions {
            x_list.push(br.read_bits(range_bits)?);
        }
    }
    if x_list.len() > 65 {
        return Err(invalid(format!("floor1 X 点数过多: {}", x_list.len())));
    }

    let mut sorted_order: Vec<usize> = (0..x_list.len()).collect();
    sorted_order.sort_by_key(|&i| x_list[i]);
    if sorted_order
        .windows(2)
        .any(|w| x_list[w[0]] == x_list[w[1]])
    {
        return Err(invalid("floor1 X 值重复"));
    }

    let neighbors = (0..x_list.len())
        .map(|i| find_neighbors(&x_list, i))
        .collect();

    Ok(Floor1Config {
        partition_classes,
        classes,
        multiplier,
        x_list,
        sorted_order,
        neighbors,
    })
}

/// 在 `x[..i]` 中寻找小于 `x[i]` 的最大值与大于 `x[i]` 的最小值的索引
fn find_neighbors(x_list: &[u32], i: usize) -> (usize, usize) {
    let target = x_list[i];
    let mut low = 0usize;
    let mut high = 1usize;
    let mut low_x = 0u32;
    let mut high_x = u32::MAX;
    for (j, &x) in x_list.iter().enumerate().take(i) {
        if x < target && x >= low_x {
            low = j;
            low_x = x;
        }
        if x > target && x < high_x {
            high = j;
            high_x = x;
        }
    }
    (low, high)
}

fn parse_residues(br: &mut BitReader<'_>, codebooks: &[Codebook]) -> YinResult<Vec<ResidueConfig>> {
    let count = br.read_bits(6)? + 1;
    let mut residues = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let residue_type = match br.read_bits(16)? {
            0 => ResidueType::Interleaved,
            1 => ResidueType::Concatenated,
            2 => ResidueType::ChannelInterleaved,
            other => {
                return Err(YinError::UnsupportedFormat(format!(
                    "residue_type 不支持: {other}",
                )));
            }
        };
        let begin = br.read_bits(24)? as usize;
        let end = br.read_bits(24)? as usize;
        let partition_size = br.read_bits(24)? as usize + 1;
        let classifications = br.read_bits(6)? as usize + 1;
        let classbook = book_index(br.read_bits(8)?, codebooks, "residue classbook")?;
        // 一个分类字要能表示 classifications^dimensions 种组合
        let book = &codebooks[classbook];
        let combinations = (0..book.dimensions)
            .try_fold(1usize, |acc, _| acc.checked_mul(classifications))
            .filter(|&c| c <= book.entries);
        if combinations.is_none() {
            return Err(invalid(format!(
                "residue classbook {classbook} 条目数 {} 不足以表示 {classifications} 个分类",
                book.entries
            )));
        }

        let mut cascades = Vec::with_capacity(classifications);
        for _ in 0..classifications {
            let low_bits = br.read_bits(3)?;
            let high_bits = if br.read_flag()? { br.read_bits(5)? } else { 0 };
            cascades.push((high_bits << 3) | low_bits);
        }

        let mut books = Vec::with_capacity(classifications);
        for cascade in cascades {
            let mut passes = [None; 8];
            for (pass, slot) in passes.iter_mut().enumerate() {
                if cascade & (1 << pass) != 0 {
                    let idx = book_index(br.read_bits(8)?, codebooks, "residue")?;
                    if !codebooks[idx].has_lookup() {
                        return Err(invalid(format!("residue codebook {idx} 缺少 VQ 值映射")));
                    }
                    *slot = Some(idx);
                }
            }
            books.push(passes);
        }

        residues.push(ResidueConfig {
            residue_type,
            begin,
            end,
            partition_size,
            classifications,
            classbook,
            books,
        });
    }
    Ok(residues)
}

fn parse_mappings(
    br: &mut BitReader<'_>,
    channels: u8,
    floor_count: usize,
    residue_count: usize,
) -> YinResult<Vec<MappingConfig>> {
    let channels = usize::from(channels);
    let count = br.read_bits(6)? + 1;
    let mut mappings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mapping_type = br.read_bits(16)?;
        if mapping_type != 0 {
            return Err(YinError::UnsupportedFormat(format!(
                "mapping_type 不支持: {mapping_type}",
            )));
        }

        let submap_count = if br.read_flag()? {
            br.read_bits(4)? as usize + 1
        } else {
            1
        };

        let mut coupling = Vec::new();
        if br.read_flag()? {
            let steps = br.read_bits(8)? + 1;
            let ch_bits = ilog(channels as u32 - 1);
            for _ in 0..steps {
                let magnitude = br.read_bits(ch_bits)? as usize;
                let angle = br.read_bits(ch_bits)? as usize;
                if magnitude == angle || magnitude >= channels || angle >= channels {
                    return Err(invalid(format!(
                        "coupling 参数非法: magnitude={magnitude}, angle={angle}",
                    )));
                }
                coupling.push(CouplingStep { magnitude, angle });
            }
        }

        if br.read_bits(2)? != 0 {
            return Err(invalid("mapping reserved 位必须为 0"));
        }

        let mux = if submap_count > 1 {
            (0..channels)
                .map(|_| {
                    let m = br.read_bits(4)? as usize;
                    if m >= submap_count {
                        return Err(invalid(format!("mapping mux 越界: {m}")));
                    }
                    Ok(m)
                })
                .collect::<YinResult<Vec<_>>>()?
        } else {
            vec![0; channels]
        };

        let mut submaps = Vec::with_capacity(submap_count);
        for _ in 0..submap_count {
            let _time = br.read_bits(8)?;
            let floor = br.read_bits(8)? as usize;
            let residue = br.read_bits(8)? as usize;
            if floor >= floor_count || residue >= residue_count {
                return Err(invalid(format!(
                    "submap 索引越界: floor={floor}, residue={residue}",
                )));
            }
            submaps.push(Submap { floor, residue });
        }

        mappings.push(MappingConfig {
            coupling,
            mux,
            submaps,
        });
    }
    Ok(mappings)
}

fn parse_modes(br: &mut BitReader<'_>, mapping_count: usize) -> YinResult<Vec<ModeConfig>> {
    let count = br.read_bits(6)? + 1;
    let mut modes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let block_flag = br.read_flag()?;
        let window_type = br.read_bits(16)?;
        let transform_type = br.read_bits(16)?;
        if window_type != 0 || transform_type != 0 {
            return Err(invalid("mode window/transform 必须为 0"));
        }
        let mapping = br.read_bits(8)? as usize;
        if mapping >= mapping_count {
            return Err(invalid(format!("mode 引用的 mapping {mapping} 不存在")));
        }
        modes.push(ModeConfig {
            block_flag,
            mapping,
        });
    }
    Ok(modes)
}
