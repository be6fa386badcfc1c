//! 块间重叠相加.

/// 每声道保存上一块的后半部分
///
/// 前一块长度为 p, 当前块长度为 c 时, 一次重叠相加产出 `p/4 + c/4` 个采样:
/// 两块以窗中心对齐, 输出从前一块中心延伸到当前块中心.
/// 长短块切换处单次输出不是 `p/2`, 但整条流的输出总量不变.
#[derive(Debug, Clone)]
pub(crate) struct OverlapBuffer {
    carry: Vec<Vec<f32>>,
    prev_size: usize,
    primed: bool,
}

impl OverlapBuffer {
    /// `capacity` 为长块长度的一半
    pub(crate) fn new(channels: usize, capacity: usize) -> Self {
        Self {
            carry: vec![Vec::with_capacity(capacity); channels],
            prev_size: 0,
            primed: false,
        }
    }

    /// 是否已有前一块 (首个音频包之后为 true)
    pub(crate) fn is_primed(&self) -> bool {
        self.primed
    }

    /// 叠加当前已加窗的块, 返回完成的采样
    ///
    /// 首个块只写入保留区并返回 `None`.
    pub(crate) fn overlap_add(&mut self, blocks: &[Vec<f32>]) -> Option<Vec<Vec<f32>>> {
        let cur_size = blocks.first().map_or(0, Vec::len);
        let output = if self.primed {
            let prev_size = self.prev_size;
            let len = prev_size / 4 + cur_size / 4;
            // 当前块索引 = 输出索引 + shift
            let shift = cur_size as isize / 4 - prev_size as isize / 4;
            let output = self
                .carry
                .iter()
                .zip(blocks)
                .map(|(carry, block)| {
                    (0..len)
                        .map(|i| {
                            let tail = carry.get(i).copied().unwrap_or(0.0);
                            let j = i as isize + shift;
                            let head = if j >= 0 { block[j as usize] } else { 0.0 };
                            tail + head
                        })
                        .collect()
                })
                .collect();
            Some(output)
        } else {
            None
        };

        for (carry, block) in self.carry.iter_mut().zip(blocks) {
            carry.clear();
            carry.extend_from_slice(&block[cur_size / 2..]);
        }
        self.prev_size = cur_size;
        self.primed = true;
        output
    }

    /// 把保留区清零, 仍保持已启动状态
    pub(crate) fn silence(&mut self) {
        for carry in &mut self.carry {
            carry.fill(0.0);
        }
    }

    /// 回到未启动状态, 下一个块重新作为首块
    pub(crate) fn reset(&mut self) {
        for carry in &mut self.carry {
            carry.clear();
        }
        self.prev_size = 0;
        self.primed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, base: f32) -> Vec<f32> {
        (0..n).map(|i| base + i as f32).collect()
    }

    #[test]
    fn test_首块只启动不输出() {
        let mut ov = OverlapBuffer::new(2, 128);
        assert!(!ov.is_primed());
        assert!(ov.overlap_add(&[ramp(256, 0.0), ramp(256, 0.0)]).is_none());
        assert!(ov.is_primed());
    }

    #[test]
    fn test_等长块输出半块() {
        let mut ov = OverlapBuffer::new(1, 128);
        ov.overlap_add(&[ramp(256, 0.0)]);
        let out = ov.overlap_add(&[ramp(256, 1000.0)]).unwrap();
        assert_eq!(out[0].len(), 128);
        // 上一块后半 + 当前块前半
        assert_eq!(out[0][0], 128.0 + 1000.0);
        assert_eq!(out[0][127], 255.0 + 1127.0);
    }

    #[test]
    fn test_长短块切换输出长度() {
        let mut ov = OverlapBuffer::new(1, 128);
        ov.overlap_add(&[ramp(256, 0.0)]);

        // 长 -> 短: 256/4 + 64/4
        let out = ov.overlap_add(&[ramp(64, 1000.0)]).unwrap();
        assert_eq!(out[0].len(), 80);
        assert_eq!(out[0][0], 128.0);
        assert_eq!(out[0][47], 175.0);
        assert_eq!(out[0][48], 176.0 + 1000.0);
        assert_eq!(out[0][79], 207.0 + 1031.0);

        // 短 -> 长: 前一块保留区只有 32 个采样
        let out = ov.overlap_add(&[ramp(256, 2000.0)]).unwrap();
        assert_eq!(out[0].len(), 80);
        assert_eq!(out[0][0], 1032.0 + 2048.0);
        assert_eq!(out[0][31], 1063.0 + 2079.0);
        assert_eq!(out[0][32], 2080.0);
        assert_eq!(out[0][79], 2127.0);
    }

    #[test]
    fn test_静音与重置() {
        let mut ov = OverlapBuffer::new(1, 128);
        ov.overlap_add(&[ramp(256, 1.0)]);
        ov.silence();
        assert!(ov.is_primed());
        let out = ov.overlap_add(&[vec![0.5; 256]]).unwrap();
        assert!(out[0].iter().all(|&v| v == 0.5));

        ov.reset();
        assert!(!ov.is_primed());
        assert!(ov.overlap_add(&[vec![0.5; 256]]).is_none());
    }
}
