//! Data-driven starting points for spectral mixture hyper-parameters.
//!
//! Spectral mixture likelihood surfaces are highly multi-modal, so the
//! optimizer is seeded from the spacing of the inputs and the spread of the
//! targets instead of from fixed defaults.
use super::{KernelError, SpectralMixtureKernel};
use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Open01, StandardNormal};
use std::f64::consts::TAU;

/// Smallest draw of `|N(0, 1)|` accepted when sampling inverse length
/// scales, keeping the resulting scale finite.
const MIN_NORMAL_DRAW: f64 = 1E-6;

/// Smallest share of the target variance given to a periodogram peak.
const MIN_PEAK_SHARE: f64 = 1E-6;

/// Spacing statistics of one input dimension
#[derive(Clone, Copy, Debug, PartialEq)]
struct InputSpread {
    /// Range covered by the inputs
    max_dist: f64,
    /// Smallest non-zero gap between sorted inputs
    min_dist: f64,
}

impl InputSpread {
    fn new(column: impl Iterator<Item = f64>) -> Self {
        let sorted: Vec<f64> = column.sorted_by(f64::total_cmp).collect();
        let max_dist = match (sorted.first(), sorted.last()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        };
        let min_dist = sorted
            .iter()
            .tuple_windows()
            .map(|(a, b)| b - a)
            .filter(|d| *d > 0.0)
            .fold(f64::INFINITY, f64::min);

        // Degenerate (all identical) inputs fall back to unit distances.
        Self {
            max_dist: if max_dist > 0.0 { max_dist } else { 1.0 },
            min_dist: if min_dist.is_finite() { min_dist } else { 1.0 },
        }
    }

    /// Highest frequency resolvable from the input spacing
    fn nyquist(&self) -> f64 {
        0.5 / self.min_dist
    }
}

fn input_spreads(x: &DMatrix<f64>) -> Vec<InputSpread> {
    x.column_iter()
        .map(|col| InputSpread::new(col.iter().copied()))
        .collect()
}

fn sample_variance(y: &DVector<f64>) -> f64 {
    let n = y.len();
    if n < 2 {
        return 0.0;
    }
    let mean = y.mean();
    y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

fn validate(
    n_mixtures: usize,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<(), KernelError> {
    if n_mixtures == 0 {
        Err(KernelError::NoComponents)
    } else if x.nrows() == 0 {
        Err(KernelError::NoData)
    } else if x.ncols() == 0 || y.len() != x.nrows() {
        Err(KernelError::DimensionMismatch {
            name: "y".to_string(),
            expected: (x.nrows(), 1),
            given: (y.len(), 1),
        })
    } else {
        Ok(())
    }
}

/// Schuster periodogram of `r` sampled at `x`, evaluated at `freq`
fn periodogram_power<'a>(
    x: impl Iterator<Item = &'a f64>,
    r: &[f64],
    freq: f64,
) -> f64 {
    let (re, im) = x.zip(r).fold((0.0, 0.0), |(re, im), (xn, rn)| {
        let arg = TAU * freq * xn;
        (re + rn * arg.cos(), im + rn * arg.sin())
    });
    (re * re + im * im) / r.len() as f64
}

/// Grid indices of the strongest `n` spectral peaks, padded with the
/// strongest remaining grid points when fewer local maxima exist.
fn strongest_peaks(power: &[f64], n: usize) -> Vec<usize> {
    let is_peak = |k: usize| {
        let left = k == 0 || power[k] >= power[k - 1];
        let right = k + 1 == power.len() || power[k] >= power[k + 1];
        left && right && power[k] > 0.0
    };
    let by_power = |a: &usize, b: &usize| power[*b].total_cmp(&power[*a]);

    let peaks: Vec<usize> = (0..power.len())
        .filter(|&k| is_peak(k))
        .sorted_by(by_power)
        .take(n)
        .collect();

    let fill: Vec<usize> = (0..power.len())
        .filter(|k| !peaks.contains(k))
        .sorted_by(by_power)
        .take(n.saturating_sub(peaks.len()))
        .collect();

    peaks.into_iter().chain(fill).collect()
}

impl SpectralMixtureKernel {
    /// Initialize a kernel with `n_mixtures` components from training data.
    ///
    /// For each input dimension, inverse length scales are drawn from
    /// `1 / |N(0, max_dist²)|` and mean frequencies uniformly below the
    /// Nyquist frequency `0.5 / min_dist`, where `max_dist` is the range of
    /// the inputs and `min_dist` the smallest non-zero spacing. Every weight
    /// is the standard deviation of `y` divided by `n_mixtures`.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::{DMatrix, DVector};
    /// use rand::SeedableRng;
    /// use spectral_gp::process::gaussian::kernel::{
    ///     Kernel, SpectralMixtureKernel,
    /// };
    ///
    /// let mut rng = rand::rngs::SmallRng::seed_from_u64(7);
    /// let x = DMatrix::from_fn(15, 1, |i, _| i as f64 / 14.0);
    /// let y = x.column(0).map(|v| (std::f64::consts::TAU * v).sin());
    ///
    /// let kernel =
    ///     SpectralMixtureKernel::initialize_from_data(4, &x, &y, &mut rng)
    ///         .unwrap();
    /// assert_eq!(kernel.n_mixtures(), 4);
    /// assert_eq!(kernel.n_parameters(), 12);
    /// ```
    pub fn initialize_from_data<R: Rng>(
        n_mixtures: usize,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        rng: &mut R,
    ) -> Result<Self, KernelError> {
        validate(n_mixtures, x, y)?;
        let spreads = input_spreads(x);

        let weight = sample_variance(y).sqrt() / n_mixtures as f64;
        let weight = if weight > 0.0 && weight.is_finite() {
            weight
        } else {
            1.0 / n_mixtures as f64
        };

        let means = DMatrix::from_fn(n_mixtures, x.ncols(), |_, d| {
            rng.sample::<f64, _>(Open01) * spreads[d].nyquist()
        });
        let scales = DMatrix::from_fn(n_mixtures, x.ncols(), |_, d| {
            let z: f64 = rng.sample(StandardNormal);
            1.0 / (z.abs().max(MIN_NORMAL_DRAW) * spreads[d].max_dist)
        });

        debug!(
            "spectral mixture init: spreads = {:?}, weight = {}",
            spreads, weight
        );
        Self::new(DVector::from_element(n_mixtures, weight), means, scales)
    }

    /// Initialize a kernel from the empirical spectrum of the targets.
    ///
    /// For each input dimension the periodogram of the centered targets is
    /// evaluated on a uniform grid up to the Nyquist frequency and the
    /// `n_mixtures` strongest peaks become the component means. The sample
    /// variance of `y` is split across components in proportion to peak
    /// power, and every scale starts at `1 / max_dist`, the frequency
    /// resolution of the data. Unlike [`initialize_from_data`] this is
    /// deterministic.
    ///
    /// [`initialize_from_data`]: SpectralMixtureKernel::initialize_from_data
    pub fn initialize_from_periodogram(
        n_mixtures: usize,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<Self, KernelError> {
        validate(n_mixtures, x, y)?;
        let spreads = input_spreads(x);
        let n = y.len();
        let grid_size = (8 * n).max(256);

        let y_mean = y.mean();
        let centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let mut means = DMatrix::zeros(n_mixtures, x.ncols());
        let mut shares: DVector<f64> = DVector::zeros(n_mixtures);
        for (d, spread) in spreads.iter().enumerate() {
            let step = spread.nyquist() / grid_size as f64;
            let power: Vec<f64> = (1..=grid_size)
                .map(|k| {
                    periodogram_power(
                        x.column(d).iter(),
                        &centered,
                        step * k as f64,
                    )
                })
                .collect();

            let peaks = strongest_peaks(&power, n_mixtures);
            let total: f64 = peaks.iter().map(|&k| power[k]).sum();
            for (m, &k) in peaks.iter().enumerate() {
                means[(m, d)] = step * (k + 1) as f64;
                shares[m] += if total > 0.0 {
                    power[k] / total
                } else {
                    1.0 / n_mixtures as f64
                };
            }
        }

        let variance = sample_variance(y);
        let variance = if variance > 0.0 && variance.is_finite() {
            variance
        } else {
            1.0
        };
        let n_dims = x.ncols() as f64;
        let weights =
            shares.map(|s| variance * (s / n_dims).max(MIN_PEAK_SHARE));
        let scales = DMatrix::from_fn(n_mixtures, x.ncols(), |_, d| {
            1.0 / spreads[d].max_dist
        });

        debug!(
            "spectral mixture periodogram init: means = {}, weights = {}",
            means, weights
        );
        Self::new(weights, means, scales)
    }
}
