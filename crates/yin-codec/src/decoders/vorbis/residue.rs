//! Vorbis residue 解码 (type 0/1/2) 与声道耦合反变换.

use log::debug;
use yin_core::bitreader::BitReader;
use yin_core::{YinError, YinResult};

use super::codebook::Codebook;
use super::setup::{CouplingStep, ResidueConfig, ResidueType};

/// 解码一个 submap 的 residue 向量
///
/// `do_not_decode` 每项对应 submap 中的一个声道, 返回同样数量、长度为 `n2` 的向量.
/// 在 residue 内部到达包尾时, 已解码部分保留, 其余部分为 0.
pub(crate) fn decode_residue(
    br: &mut BitReader<'_>,
    cfg: &ResidueConfig,
    codebooks: &[Codebook],
    do_not_decode: &[bool],
    n2: usize,
) -> YinResult<Vec<Vec<f32>>> {
    let channels = do_not_decode.len();
    let mut vectors = vec![vec![0.0f32; n2]; channels];
    if channels == 0 {
        return Ok(vectors);
    }

    let result = match cfg.residue_type {
        ResidueType::ChannelInterleaved => {
            if do_not_decode.iter().all(|&skip| skip) {
                return Ok(vectors);
            }
            let mut interleaved = vec![vec![0.0f32; n2 * channels]];
            let result = decode_partitions(
                br,
                cfg,
                codebooks,
                &[false],
                &mut interleaved,
                ResidueType::Concatenated,
            );
            for (i, frame) in interleaved[0].chunks_exact(channels).enumerate() {
                for (ch, &v) in frame.iter().enumerate() {
                    vectors[ch][i] = v;
                }
            }
            result
        }
        layout => decode_partitions(br, cfg, codebooks, do_not_decode, &mut vectors, layout),
    };

    match result {
        Ok(()) => Ok(vectors),
        Err(YinError::OutOfData) => {
            debug!(
                "residue 解码到达包尾 (bit={}), 剩余部分置零",
                br.bit_position()
            );
            Ok(vectors)
        }
        Err(e) => Err(e),
    }
}

fn decode_partitions(
    br: &mut BitReader<'_>,
    cfg: &ResidueConfig,
    codebooks: &[Codebook],
    do_not_decode: &[bool],
    vectors: &mut [Vec<f32>],
    layout: ResidueType,
) -> YinResult<()> {
    let actual_size = vectors.first().map_or(0, Vec::len);
    let begin = cfg.begin.min(actual_size);
    let end = cfg.end.min(actual_size);
    let psize = cfg.partition_size;
    let partitions = end.saturating_sub(begin) / psize;
    if partitions == 0 {
        return Ok(());
    }

    let classbook = &codebooks[cfg.classbook];
    let per_word = classbook.dimensions;
    let mut classes = vec![vec![0usize; partitions + per_word]; vectors.len()];
    let mut scratch = Vec::new();

    for pass in 0..8 {
        let mut partition = 0usize;
        while partition < partitions {
            if pass == 0 {
                for (row, _) in classes
                    .iter_mut()
                    .zip(do_not_decode)
                    .filter(|(_, skip)| !**skip)
                {
                    // 分类字中高位对应靠前的分区
                    let mut word = classbook.decode_symbol(br)? as usize;
                    for i in (0..per_word).rev() {
                        row[partition + i] = word % cfg.classifications;
                        word /= cfg.classifications;
                    }
                }
            }

            for _ in 0..per_word {
                if partition >= partitions {
                    break;
                }
                let offset = begin + partition * psize;
                for (j, vector) in vectors.iter_mut().enumerate() {
                    if do_not_decode[j] {
                        continue;
                    }
                    let class = classes[j][partition];
                    if let Some(book) = cfg.books[class][pass] {
                        decode_partition(
                            br,
                            &codebooks[book],
                            &mut vector[offset..offset + psize],
                            layout,
                            &mut scratch,
                        )?;
                    }
                }
                partition += 1;
            }
        }
    }
    Ok(())
}

fn decode_partition(
    br: &mut BitReader<'_>,
    book: &Codebook,
    out: &mut [f32],
    layout: ResidueType,
    scratch: &mut Vec<f32>,
) -> YinResult<()> {
    let dims = book.dimensions;
    scratch.resize(dims, 0.0);
    if layout == ResidueType::Interleaved {
        let step = out.len() / dims;
        for i in 0..step {
            book.decode_vector(br, scratch)?;
            for (j, &v) in scratch.iter().enumerate() {
                out[i + j * step] += v;
            }
        }
    } else {
        let mut i = 0;
        while i < out.len() {
            book.decode_vector(br, scratch)?;
            for (slot, &v) in out[i..].iter_mut().zip(scratch.iter()) {
                *slot += v;
            }
            i += dims;
        }
    }
    Ok(())
}

/// 按逆序执行所有耦合步骤, 把 (magnitude, angle) 还原为两个声道
pub(crate) fn apply_inverse_coupling(steps: &[CouplingStep], spectra: &mut [Vec<f32>]) {
    for step in steps.iter().rev() {
        let (magnitude, angle) = pair_mut(spectra, step.magnitude, step.angle);
        for (m, a) in magnitude.iter_mut().zip(angle.iter_mut()) {
            (*m, *a) = inverse_couple(*m, *a);
        }
    }
}

fn inverse_couple(m: f32, a: f32) -> (f32, f32) {
    if m > 0.0 {
        if a > 0.0 { (m, m - a) } else { (m + a, m) }
    } else if a > 0.0 {
        (m, m + a)
    } else {
        (m - a, m)
    }
}

fn pair_mut<T>(items: &mut [T], first: usize, second: usize) -> (&mut T, &mut T) {
    if first < second {
        let (head, tail) = items.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}
