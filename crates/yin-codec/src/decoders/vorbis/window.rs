//! Vorbis 窗函数.
//!
//! 窗的左右两侧分别是一段上升/下降斜坡, 斜坡长度由相邻块的大小决定:
//! 长块与短块相邻时, 长块一侧使用短块长度的斜坡, 斜坡外侧置零.

use std::f64::consts::FRAC_PI_2;

/// 短块与长块的上升斜坡
#[derive(Debug, Clone)]
pub(crate) struct WindowShape {
    short: Vec<f32>,
    long: Vec<f32>,
    short_size: usize,
}

impl WindowShape {
    pub(crate) fn new(short_size: usize, long_size: usize) -> Self {
        Self {
            short: rising_slope(short_size / 2),
            long: rising_slope(long_size / 2),
            short_size,
        }
    }

    /// 块长度 `size` 对应的上升斜坡 (长度 `size/2`)
    pub(crate) fn slope(&self, size: usize) -> &[f32] {
        if size <= self.short_size {
            &self.short
        } else {
            &self.long
        }
    }

    /// 对长度为 n 的块加窗
    ///
    /// `left_size` / `right_size` 为决定左右斜坡的块长度:
    /// 短块两侧都取短块长度, 长块一侧取相邻块的长度.
    pub(crate) fn apply(&self, block: &mut [f32], left_size: usize, right_size: usize) {
        let n = block.len();
        let left = self.slope(left_size);
        let right = self.slope(right_size);

        let left_start = n / 4 - left.len() / 2;
        let left_end = left_start + left.len();
        let right_start = 3 * n / 4 - right.len() / 2;
        let right_end = right_start + right.len();

        block[..left_start].fill(0.0);
        for (v, &w) in block[left_start..left_end].iter_mut().zip(left) {
            *v *= w;
        }
        for (v, &w) in block[right_start..right_end]
            .iter_mut()
            .zip(right.iter().rev())
        {
            *v *= w;
        }
        block[right_end..].fill(0.0);
    }
}

/// `w(i) = sin(π/2 · sin²((i + 1/2) / len · π/2))`
fn rising_slope(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = ((i as f64 + 0.5) / len as f64 * FRAC_PI_2).sin();
            (FRAC_PI_2 * x * x).sin() as f32
        })
        .collect()
}
