//! 音频包解码流水线.
//!
//! floor -> residue -> 耦合反变换 -> floor × residue -> IMDCT -> 加窗 -> 重叠相加.
//! 整个包解析完成之前不修改跨包状态, 出错时由调用方决定如何恢复.

use log::debug;
use yin_core::bitreader::{BitReader, ilog};
use yin_core::{YinError, YinResult};

use super::floor::{FloorData, decode_floor, render_floor};
use super::headers::IdentificationHeader;
use super::imdct::Imdct;
use super::overlap::OverlapBuffer;
use super::residue::{apply_inverse_coupling, decode_residue};
use super::setup::{CouplingStep, VorbisSetup};
use super::window::WindowShape;

/// 跨包持久的解码状态
pub(crate) struct DecoderState {
    ident: IdentificationHeader,
    setup: VorbisSetup,
    /// 短块与长块各一个
    imdct: [Imdct; 2],
    window: WindowShape,
    overlap: OverlapBuffer,
    mode_bits: u32,
}

impl DecoderState {
    pub(crate) fn new(ident: IdentificationHeader, setup: VorbisSetup) -> Self {
        let short = ident.blocksize_short;
        let long = ident.blocksize_long;
        let mode_bits = ilog(setup.modes.len().saturating_sub(1) as u32);
        Self {
            imdct: [Imdct::new(short), Imdct::new(long)],
            window: WindowShape::new(short, long),
            overlap: OverlapBuffer::new(usize::from(ident.channels), long / 2),
            mode_bits,
            ident,
            setup,
        }
    }

    pub(crate) fn identification(&self) -> &IdentificationHeader {
        &self.ident
    }

    /// 是否已解码过启动包
    pub(crate) fn is_primed(&self) -> bool {
        self.overlap.is_primed()
    }

    /// 重叠缓冲区清零 (出错后恢复)
    pub(crate) fn silence(&mut self) {
        self.overlap.silence();
    }

    /// 回到未启动状态 (seek 后使用)
    pub(crate) fn reset(&mut self) {
        self.overlap.reset();
    }

    /// 解码一个音频包, 返回每声道的完成采样
    ///
    /// 首个音频包只启动重叠缓冲区, 返回 `None`.
    pub(crate) fn decode_packet(&mut self, packet: &[u8]) -> YinResult<Option<Vec<Vec<f32>>>> {
        let mut br = BitReader::new(packet);
        if br.read_flag()? {
            return Err(YinError::UnexpectedPacket(
                "音频包的包类型位必须为 0".into(),
            ));
        }

        let mode_number = br.read_bits(self.mode_bits)? as usize;
        let mode = self.setup.modes.get(mode_number).ok_or_else(|| {
            YinError::InvalidData(format!("mode 编号越界: {mode_number}"))
        })?;
        let long = mode.block_flag;
        let n = self.ident.blocksize(long);
        let (prev_long, next_long) = if long {
            (br.read_flag()?, br.read_flag()?)
        } else {
            (false, false)
        };
        debug!(
            "vorbis 音频包: {} 字节, mode={}, blocksize={}",
            packet.len(),
            mode_number,
            n
        );

        let spectra = self.decode_spectra(&mut br, mode.mapping, long, n)?;

        let short = self.ident.blocksize_short;
        let left_size = if long && !prev_long { short } else { n };
        let right_size = if long && !next_long { short } else { n };
        let imdct = &mut self.imdct[usize::from(long)];
        let blocks: Vec<Vec<f32>> = spectra
            .iter()
            .map(|spectrum| {
                let mut block = vec![0.0f32; n];
                if spectrum.iter().any(|&v| v != 0.0) {
                    imdct.inverse(spectrum, &mut block);
                    self.window.apply(&mut block, left_size, right_size);
                }
                block
            })
            .collect();

        Ok(self.overlap.overlap_add(&blocks))
    }

    /// 读取 floor 与 residue, 返回每声道长度 `n/2` 的频谱
    fn decode_spectra(
        &self,
        br: &mut BitReader<'_>,
        mapping_index: usize,
        long: bool,
        n: usize,
    ) -> YinResult<Vec<Vec<f32>>> {
        let setup = &self.setup;
        let mapping = &setup.mappings[mapping_index];
        let channels = usize::from(self.ident.channels);
        let n2 = n / 2;

        let mut floors = Vec::with_capacity(channels);
        for &submap in &mapping.mux {
            let floor = &setup.floors[mapping.submaps[submap].floor];
            floors.push(decode_floor(br, floor, &setup.codebooks)?);
        }

        let mut no_residue: Vec<bool> = floors.iter().map(FloorData::is_unused).collect();
        propagate_no_residue(&mapping.coupling, &mut no_residue);

        let mut spectra = vec![vec![0.0f32; n2]; channels];
        for (index, submap) in mapping.submaps.iter().enumerate() {
            let members: Vec<usize> = (0..channels)
                .filter(|&ch| mapping.mux[ch] == index)
                .collect();
            if members.is_empty() {
                continue;
            }
            let do_not_decode: Vec<bool> = members.iter().map(|&ch| no_residue[ch]).collect();
            let vectors = decode_residue(
                br,
                &setup.residues[submap.residue],
                &setup.codebooks,
                &do_not_decode,
                n2,
            )?;
            for (&ch, vector) in members.iter().zip(vectors) {
                spectra[ch] = vector;
            }
        }

        apply_inverse_coupling(&mapping.coupling, &mut spectra);

        let mut curve = vec![0.0f32; n2];
        for (ch, spectrum) in spectra.iter_mut().enumerate() {
            if floors[ch].is_unused() {
                spectrum.fill(0.0);
                continue;
            }
            let floor = &setup.floors[mapping.submaps[mapping.mux[ch]].floor];
            render_floor(floor, &floors[ch], long, &mut curve);
            for (v, &f) in spectrum.iter_mut().zip(&curve) {
                *v *= f;
            }
        }
        Ok(spectra)
    }
}

/// 耦合对中任一声道有数据时, 两个声道都需要解码 residue
fn propagate_no_residue(coupling: &[CouplingStep], no_residue: &mut [bool]) {
    for step in coupling {
        if !no_residue[step.magnitude] || !no_residue[step.angle] {
            no_residue[step.magnitude] = false;
            no_residue[step.angle] = false;
        }
    }
}
