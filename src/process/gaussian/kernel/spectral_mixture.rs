use super::{CovGrad, CovGradError, Kernel, KernelError};
use crate::consts::{FOUR_PI_SQUARED, TWO_PI_SQUARED};
use nalgebra::base::constraint::{SameNumberOfColumns, ShapeConstraint};
use nalgebra::base::storage::Storage;
use nalgebra::{DMatrix, DVector, Dim, Matrix};
use std::f64::consts::TAU;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Spectral mixture kernel
///
/// Models the spectral density of a stationary process as a mixture of `M`
/// Gaussians. In the input domain each component is a Gaussian-windowed
/// cosine:
///
/// ```math
///     k(\tau) = \sum_m w_m \exp\left(-2\pi^2 \sum_d \tau_d^2 s_{md}^2\right)
///         \prod_d \cos(2\pi \tau_d \mu_{md})
/// ```
///
/// where `τ = x - x'`.
///
/// # Parameters
/// * `weights` - Mixture weight of each component (length `M`).
/// * `means` - Mean frequency of each component per input dimension (`M × D`).
/// * `scales` - Spectral standard deviation (inverse length scale) of each
///   component per input dimension (`M × D`).
///
/// Parameters are exposed in log-scale, grouped per component as
/// `[ln w_m, ln μ_m1 .. ln μ_mD, ln s_m1 .. ln s_mD]`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct SpectralMixtureKernel {
    weights: DVector<f64>,
    means: DMatrix<f64>,
    scales: DMatrix<f64>,
}

fn check_positive<'a>(
    name: &str,
    values: impl Iterator<Item = &'a f64>,
) -> Result<(), KernelError> {
    match values.copied().find(|v| !(v.is_finite() && *v > 0.0)) {
        Some(given) => Err(KernelError::ParameterOutOfBounds {
            name: name.to_string(),
            given,
            bounds: (0.0, f64::INFINITY),
        }),
        None => Ok(()),
    }
}

impl SpectralMixtureKernel {
    /// Create a new spectral mixture kernel
    pub fn new(
        weights: DVector<f64>,
        means: DMatrix<f64>,
        scales: DMatrix<f64>,
    ) -> Result<Self, KernelError> {
        let n_mixtures = weights.len();
        if n_mixtures == 0 {
            return Err(KernelError::NoComponents);
        }
        if means.nrows() != n_mixtures || means.ncols() == 0 {
            return Err(KernelError::DimensionMismatch {
                name: "means".to_string(),
                expected: (n_mixtures, means.ncols().max(1)),
                given: means.shape(),
            });
        }
        if scales.shape() != means.shape() {
            return Err(KernelError::DimensionMismatch {
                name: "scales".to_string(),
                expected: means.shape(),
                given: scales.shape(),
            });
        }
        check_positive("weights", weights.iter())?;
        check_positive("means", means.iter())?;
        check_positive("scales", scales.iter())?;

        Ok(Self {
            weights,
            means,
            scales,
        })
    }

    /// Create a kernel over one-dimensional inputs, one entry per component
    pub fn one_dimensional(
        weights: &[f64],
        means: &[f64],
        scales: &[f64],
    ) -> Result<Self, KernelError> {
        Self::new(
            DVector::from_column_slice(weights),
            DMatrix::from_column_slice(means.len(), 1, means),
            DMatrix::from_column_slice(scales.len(), 1, scales),
        )
    }

    /// Create a new `SpectralMixtureKernel` without checking parameters
    #[must_use]
    pub fn new_unchecked(
        weights: DVector<f64>,
        means: DMatrix<f64>,
        scales: DMatrix<f64>,
    ) -> Self {
        Self {
            weights,
            means,
            scales,
        }
    }

    /// Number of mixture components
    #[must_use]
    pub fn n_mixtures(&self) -> usize {
        self.weights.len()
    }

    /// Number of input dimensions
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.means.ncols()
    }

    /// Mixture weights
    #[must_use]
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Mean frequencies, one row per component
    #[must_use]
    pub fn means(&self) -> &DMatrix<f64> {
        &self.means
    }

    /// Spectral scales, one row per component
    #[must_use]
    pub fn scales(&self) -> &DMatrix<f64> {
        &self.scales
    }

    #[inline]
    fn offset(&self, m: usize) -> usize {
        m * (1 + 2 * self.n_dims())
    }

    /// Covariance at the lag `tau`
    fn at_lag(&self, tau: &[f64]) -> f64 {
        (0..self.n_mixtures())
            .map(|m| {
                let mut exponent = 0.0;
                let mut cosine = 1.0;
                for (d, t) in tau.iter().enumerate() {
                    let s = self.scales[(m, d)];
                    exponent += t * t * s * s;
                    cosine *= (TAU * t * self.means[(m, d)]).cos();
                }
                self.weights[m] * (-TWO_PI_SQUARED * exponent).exp() * cosine
            })
            .sum()
    }
}

impl Kernel for SpectralMixtureKernel {
    fn n_parameters(&self) -> usize {
        self.n_mixtures() * (1 + 2 * self.n_dims())
    }

    fn input_dims(&self) -> Option<usize> {
        Some(self.n_dims())
    }

    fn covariance<R1, R2, C1, C2, S1, S2>(
        &self,
        x1: &Matrix<f64, R1, C1, S1>,
        x2: &Matrix<f64, R2, C2, S2>,
    ) -> DMatrix<f64>
    where
        R1: Dim,
        R2: Dim,
        C1: Dim,
        C2: Dim,
        S1: Storage<f64, R1, C1>,
        S2: Storage<f64, R2, C2>,
        ShapeConstraint: SameNumberOfColumns<C1, C2>,
    {
        let dims = self.n_dims();
        assert_eq!(x1.ncols(), dims, "inputs must have {dims} columns");
        assert_eq!(x2.ncols(), dims, "inputs must have {dims} columns");

        let mut tau = vec![0.0; dims];
        DMatrix::from_fn(x1.nrows(), x2.nrows(), |i, j| {
            for (d, t) in tau.iter_mut().enumerate() {
                *t = x1[(i, d)] - x2[(j, d)];
            }
            self.at_lag(&tau)
        })
    }

    fn is_stationary(&self) -> bool {
        true
    }

    fn diag<R, C, S>(&self, x: &Matrix<f64, R, C, S>) -> DVector<f64>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>,
    {
        DVector::from_element(x.nrows(), self.weights.sum())
    }

    fn parameters(&self) -> DVector<f64> {
        let dims = self.n_dims();
        let params = (0..self.n_mixtures()).flat_map(move |m| {
            std::iter::once(self.weights[m])
                .chain((0..dims).map(move |d| self.means[(m, d)]))
                .chain((0..dims).map(move |d| self.scales[(m, d)]))
        });
        DVector::from_iterator(self.n_parameters(), params.map(f64::ln))
    }

    fn parameter_names(&self) -> Vec<String> {
        let dims = self.n_dims();
        (0..self.n_mixtures())
            .flat_map(move |m| {
                std::iter::once(format!("mixture_weights[{m}]"))
                    .chain(
                        (0..dims)
                            .map(move |d| format!("mixture_means[{m}][{d}]")),
                    )
                    .chain(
                        (0..dims)
                            .map(move |d| format!("mixture_scales[{m}][{d}]")),
                    )
            })
            .collect()
    }

    fn reparameterize(&self, params: &[f64]) -> Result<Self, KernelError> {
        use std::cmp::Ordering;
        let n = self.n_parameters();
        match params.len().cmp(&n) {
            Ordering::Less => {
                Err(KernelError::MissingParameters(n - params.len()))
            }
            Ordering::Greater => {
                Err(KernelError::ExtraneousParameters(params.len() - n))
            }
            Ordering::Equal => {
                if let Some(&given) = params.iter().find(|p| !p.is_finite()) {
                    return Err(KernelError::ParameterOutOfBounds {
                        name: "log_parameters".to_string(),
                        given,
                        bounds: (f64::NEG_INFINITY, f64::INFINITY),
                    });
                }
                let dims = self.n_dims();
                let mixtures = self.n_mixtures();
                // exp underflows to zero below about -745
                let at = |m: usize, k: usize| {
                    params[self.offset(m) + k].exp().max(f64::MIN_POSITIVE)
                };

                let weights = DVector::from_fn(mixtures, |m, _| at(m, 0));
                let means =
                    DMatrix::from_fn(mixtures, dims, |m, d| at(m, 1 + d));
                let scales = DMatrix::from_fn(mixtures, dims, |m, d| {
                    at(m, 1 + dims + d)
                });
                Self::new(weights, means, scales)
            }
        }
    }

    fn covariance_with_gradient<R, C, S>(
        &self,
        x: &Matrix<f64, R, C, S>,
    ) -> Result<(DMatrix<f64>, CovGrad), CovGradError>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>,
    {
        let n = x.nrows();
        let dims = self.n_dims();
        assert_eq!(x.ncols(), dims, "inputs must have {dims} columns");

        let mut cov = DMatrix::zeros(n, n);
        let mut grad = CovGrad::zeros(n, self.n_parameters());
        let total_weight = self.weights.sum();

        let mut tau = vec![0.0; dims];
        let mut cosines = vec![0.0; dims];

        for i in 0..n {
            for j in 0..i {
                for (d, t) in tau.iter_mut().enumerate() {
                    *t = x[(i, d)] - x[(j, d)];
                }

                let mut cov_ij = 0.0;
                for m in 0..self.n_mixtures() {
                    let offset = self.offset(m);
                    let w = self.weights[m];

                    let mut exponent = 0.0;
                    for d in 0..dims {
                        let s = self.scales[(m, d)];
                        exponent += tau[d] * tau[d] * s * s;
                        cosines[d] = (TAU * tau[d] * self.means[(m, d)]).cos();
                    }
                    let envelope = (-TWO_PI_SQUARED * exponent).exp();
                    let k_m = w * envelope * cosines.iter().product::<f64>();
                    cov_ij += k_m;

                    // d/d ln(w)
                    grad[(i, j, offset)] = k_m;
                    grad[(j, i, offset)] = k_m;

                    for d in 0..dims {
                        let arg = TAU * tau[d] * self.means[(m, d)];
                        let other_cosines: f64 = cosines
                            .iter()
                            .enumerate()
                            .filter(|(e, _)| *e != d)
                            .map(|(_, c)| c)
                            .product();

                        let dk_dmean =
                            -w * envelope * other_cosines * arg.sin() * arg;
                        grad[(i, j, offset + 1 + d)] = dk_dmean;
                        grad[(j, i, offset + 1 + d)] = dk_dmean;

                        let s = self.scales[(m, d)];
                        let dk_dscale =
                            -FOUR_PI_SQUARED * tau[d] * tau[d] * s * s * k_m;
                        grad[(i, j, offset + 1 + dims + d)] = dk_dscale;
                        grad[(j, i, offset + 1 + dims + d)] = dk_dscale;
                    }
                }

                cov[(i, j)] = cov_ij;
                cov[(j, i)] = cov_ij;
            }

            // At zero lag only the weights contribute.
            cov[(i, i)] = total_weight;
            for m in 0..self.n_mixtures() {
                grad[(i, i, self.offset(m))] = self.weights[m];
            }
        }

        Ok((cov, grad))
    }
}
