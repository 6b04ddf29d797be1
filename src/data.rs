//! Toy data sets and input grids
use std::f64::consts::TAU;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Normal};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// `n` evenly spaced points from `start` to `stop` inclusive, as an `n × 1`
/// input matrix.
///
/// # Example
///
/// ```
/// use spectral_gp::data::linspace;
///
/// let xs = linspace(0.0, 1.0, 5);
/// assert_eq!(xs.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
/// ```
pub fn linspace(start: f64, stop: f64, n: usize) -> DMatrix<f64> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as f64
    } else {
        0.0
    };
    DMatrix::from_fn(n, 1, |i, _| {
        if i + 1 == n && n > 1 {
            stop
        } else {
            start + i as f64 * step
        }
    })
}

/// Noisy samples of `amplitude · sin(2π · frequency · x)` on an even grid
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct SineWave {
    /// Number of points
    pub n_points: usize,
    /// Interval the inputs span
    pub domain: (f64, f64),
    /// Cycles per unit input
    pub frequency: f64,
    /// Peak value
    pub amplitude: f64,
    /// Standard deviation of the additive Gaussian noise
    pub noise_std: f64,
}

impl Default for SineWave {
    fn default() -> Self {
        Self {
            n_points: 15,
            domain: (0.0, 1.0),
            frequency: 1.0,
            amplitude: 1.0,
            noise_std: 0.2,
        }
    }
}

impl SineWave {
    /// Set the number of points
    #[must_use]
    pub fn with_n_points(self, n_points: usize) -> Self {
        Self { n_points, ..self }
    }

    /// Set the input interval
    #[must_use]
    pub fn with_domain(self, start: f64, stop: f64) -> Self {
        Self {
            domain: (start, stop),
            ..self
        }
    }

    /// Set the frequency
    #[must_use]
    pub fn with_frequency(self, frequency: f64) -> Self {
        Self { frequency, ..self }
    }

    /// Set the amplitude
    #[must_use]
    pub fn with_amplitude(self, amplitude: f64) -> Self {
        Self { amplitude, ..self }
    }

    /// Set the noise standard deviation; zero gives exact samples.
    #[must_use]
    pub fn with_noise_std(self, noise_std: f64) -> Self {
        Self { noise_std, ..self }
    }

    /// Noise-free value at each input
    pub fn evaluate(&self, x: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_fn(x.nrows(), |i, _| {
            self.amplitude * (TAU * self.frequency * x[(i, 0)]).sin()
        })
    }

    /// Generate the inputs and noisy targets
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let x = linspace(self.domain.0, self.domain.1, self.n_points);
        let mut y = self.evaluate(&x);
        // A non-positive or non-finite std means no noise
        if let Ok(noise) = Normal::new(0.0, self.noise_std) {
            if self.noise_std > 0.0 {
                y.iter_mut().for_each(|v| *v += noise.sample(rng));
            }
        }
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn linspace_endpoints() {
        let xs = linspace(0.0, 5.0, 51);
        assert_eq!(xs.shape(), (51, 1));
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[50], 5.0);
        assert::close(xs[10], 1.0, 1E-12);

        assert_eq!(linspace(2.0, 3.0, 1).as_slice(), &[2.0]);
        assert_eq!(linspace(2.0, 3.0, 0).nrows(), 0);
    }

    #[test]
    fn noiseless_sine() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let (x, y) = SineWave::default()
            .with_n_points(5)
            .with_noise_std(0.0)
            .generate(&mut rng);
        assert_eq!(x.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        let expected = DVector::from_column_slice(&[0.0, 1.0, 0.0, -1.0, 0.0]);
        assert!(y.relative_eq(&expected, 1E-12, 1E-12));
    }

    #[test]
    fn noise_is_seeded() {
        let wave = SineWave::default();
        let (_, y1) = wave.generate(&mut SmallRng::seed_from_u64(7));
        let (_, y2) = wave.generate(&mut SmallRng::seed_from_u64(7));
        assert_eq!(y1, y2);
        assert_eq!(y1.len(), 15);

        let (x, _) = wave.generate(&mut SmallRng::seed_from_u64(7));
        let residual = y1 - wave.evaluate(&x);
        assert!(residual.iter().all(|r| r.abs() < 1.5));
        assert!(residual.iter().any(|r| *r != 0.0));
    }
}
