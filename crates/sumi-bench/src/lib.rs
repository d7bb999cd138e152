//! Shared helpers for sumi benchmarks: seeded RNG, input generators.

use sumi_la::Matrix;
use sumi_tensor::Tensor4D;

/// xoshiro256** seeded through SplitMix64, kept separate from the training
/// RNG so bench inputs never shift when that one changes.
pub struct Rng {
    s: [u64; 4],
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let mut z = seed;
        let mut s = [0u64; 4];
        for slot in &mut s {
            z = z.wrapping_add(0x9e3779b97f4a7c15);
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            *slot = z ^ (z >> 31);
        }
        Self { s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.s[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform in [-1, 1].
    pub fn f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64) * 2.0 - 1.0
    }
}

pub fn make_rng() -> Rng {
    Rng::new(0x5EED_0F_5A11_u64)
}

pub fn random_matrix(rows: usize, cols: usize) -> Matrix {
    let mut rng = make_rng();
    let data = (0..rows * cols).map(|_| rng.f64()).collect();
    Matrix::new(rows, cols, data).expect("bench shapes are non-empty")
}

pub fn random_images(dims: [usize; 4]) -> Tensor4D {
    let mut rng = make_rng();
    Tensor4D::from_fn(dims, |_| rng.f64()).expect("bench shapes are non-empty")
}
