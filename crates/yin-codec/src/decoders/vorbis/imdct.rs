//! 基于 FFT 的 IMDCT.
//!
//! 长度 N 的 IMDCT 先化为长度 N/2 的 DCT-IV, 再用 N/4 点复数 FFT 计算.
//! 输出不做归一化, 与 Vorbis I 规范中的 IMDCT 定义一致:
//! `y[n] = Σ X[k]·cos(2π/N·(n + 1/2 + N/4)·(k + 1/2))`.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, Default)]
struct Complex {
    re: f32,
    im: f32,
}

impl Complex {
    fn from_angle(theta: f64) -> Self {
        Self {
            re: theta.cos() as f32,
            im: theta.sin() as f32,
        }
    }

    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }

    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }

    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

/// 固定长度的 IMDCT 计算器
///
/// 旋转因子和位反转表在创建时预计算, 每次变换只复用内部缓冲区.
#[derive(Debug, Clone)]
pub(crate) struct Imdct {
    n: usize,
    /// DCT-IV 前旋转: e^{-iπp/M}, M = N/2
    pre: Vec<Complex>,
    /// DCT-IV 后旋转: e^{-iπ(k+1/4)/M}
    post: Vec<Complex>,
    /// FFT 旋转因子: e^{-2πik/F}, F = N/4
    twiddles: Vec<Complex>,
    bit_reverse: Vec<usize>,
    fft_buf: Vec<Complex>,
    dct_buf: Vec<f32>,
}

impl Imdct {
    /// `n` 为块长度, 必须是不小于 4 的 2 的幂
    pub(crate) fn new(n: usize) -> Self {
        debug_assert!(n >= 4 && n.is_power_of_two());
        let m = n / 2;
        let f = n / 4;
        let pre = (0..f)
            .map(|p| Complex::from_angle(-PI * p as f64 / m as f64))
            .collect();
        let post = (0..f)
            .map(|k| Complex::from_angle(-PI * (k as f64 + 0.25) / m as f64))
            .collect();
        let twiddles = (0..f / 2)
            .map(|k| Complex::from_angle(-2.0 * PI * k as f64 / f as f64))
            .collect();
        let bits = f.trailing_zeros();
        let bit_reverse = (0..f)
            .map(|i| {
                if bits == 0 {
                    0
                } else {
                    i.reverse_bits() >> (usize::BITS - bits)
                }
            })
            .collect();
        Self {
            n,
            pre,
            post,
            twiddles,
            bit_reverse,
            fft_buf: vec![Complex::default(); f],
            dct_buf: vec![0.0; m],
        }
    }

    /// 把 `n/2` 个频域系数变换为 `n` 个时域样本
    ///
    /// `spectrum` 不足 `n/2` 时缺失部分按 0 处理.
    pub(crate) fn inverse(&mut self, spectrum: &[f32], out: &mut [f32]) {
        let n = self.n;
        let m = n / 2;
        let f = n / 4;
        let coeff = |i: usize| spectrum.get(i).copied().unwrap_or(0.0);

        for p in 0..f {
            let v = Complex {
                re: coeff(2 * p),
                im: coeff(m - 1 - 2 * p),
            };
            self.fft_buf[self.bit_reverse[p]] = v.mul(self.pre[p]);
        }
        self.fft_in_place();

        for k in 0..f {
            let w = self.fft_buf[k].mul(self.post[k]);
            self.dct_buf[2 * k] = w.re;
            self.dct_buf[m - 1 - 2 * k] = -w.im;
        }

        // DCT-IV 结果展开为 IMDCT 输出
        let u = &self.dct_buf;
        let (q1, q3) = (n / 4, 3 * n / 4);
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = if i < q1 {
                u[i + q1]
            } else if i < q3 {
                -u[q3 - 1 - i]
            } else {
                -u[i - q3]
            };
        }
    }

    /// 迭代式 radix-2 FFT, 输入已按位反转顺序排列
    fn fft_in_place(&mut self) {
        let f = self.fft_buf.len();
        let mut len = 2;
        while len <= f {
            let half = len / 2;
            let step = f / len;
            for start in (0..f).step_by(len) {
                for k in 0..half {
                    let a = self.fft_buf[start + k];
                    let b = self.fft_buf[start + k + half].mul(self.twiddles[k * step]);
                    self.fft_buf[start + k] = a.add(b);
                    self.fft_buf[start + k + half] = a.sub(b);
                }
            }
            len *= 2;
        }
    }
}

#[cfg(test)]
pub(crate) fn naive_imdct(spectrum: &[f32], n: usize) -> Vec<f64> {
    let n2 = n / 2;
    (0..n)
        .map(|i| {
            (0..n2)
                .map(|k| {
                    let angle = 2.0 * PI / n as f64
                        * (i as f64 + 0.5 + n as f64 / 4.0)
                        * (k as f64 + 0.5);
                    f64::from(spectrum.get(k).copied().unwrap_or(0.0)) * angle.cos()
                })
                .sum()
        })
        .collect()
}
