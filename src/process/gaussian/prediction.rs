use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{stable_cholesky, GaussianProcessError, JitterParams};

/// Predictive distribution of a Gaussian Process over a set of query points
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GaussianProcessPrediction {
    /// Mean of y values
    mean: DVector<f64>,
    /// Covariance matrix
    cov: DMatrix<f64>,
}

impl GaussianProcessPrediction {
    pub(crate) fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> Self {
        Self { mean, cov }
    }

    pub(crate) fn into_parts(self) -> (DVector<f64>, DMatrix<f64>) {
        (self.mean, self.cov)
    }

    /// Return the mean of the posterior
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Return the covariance of the posterior
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// Marginal variance at each query point, clamped at zero
    pub fn variance(&self) -> DVector<f64> {
        self.cov.diagonal().map(|v| v.max(0.0))
    }

    /// Return the standard deviation of posterior.
    pub fn std(&self) -> DVector<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Lower and upper bounds of the two standard deviation band around
    /// the mean.
    pub fn confidence_region(&self) -> (DVector<f64>, DVector<f64>) {
        let width = self.std() * 2.0;
        (&self.mean - &width, &self.mean + &width)
    }

    /// Draw a single function sample at the query points
    pub fn draw<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<DVector<f64>, GaussianProcessError> {
        let (chol, _) =
            stable_cholesky(self.cov.clone(), &JitterParams::default())?;
        Ok(self.transform(&chol.l(), rng))
    }

    /// Draw `size` function samples at the query points
    pub fn sample<R: Rng>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>, GaussianProcessError> {
        let (chol, _) =
            stable_cholesky(self.cov.clone(), &JitterParams::default())?;
        let l = chol.unpack();
        Ok((0..size).map(|_| self.transform(&l, rng)).collect())
    }

    fn transform<R: Rng>(&self, l: &DMatrix<f64>, rng: &mut R) -> DVector<f64> {
        let z: DVector<f64> = DVector::from_fn(self.mean.len(), |_, _| {
            rng.sample(StandardNormal)
        });
        &self.mean + l * z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn prediction() -> GaussianProcessPrediction {
        let mean = DVector::from_column_slice(&[1.0, -1.0, 0.0]);
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[4.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, -1E-12],
        );
        GaussianProcessPrediction::new(mean, cov)
    }

    #[test]
    fn confidence_region_is_two_sigma() {
        let pred = prediction();
        let (lower, upper) = pred.confidence_region();
        assert_eq!(lower, DVector::from_column_slice(&[-3.0, -3.0, 0.0]));
        assert_eq!(upper, DVector::from_column_slice(&[5.0, 1.0, 0.0]));
        assert_eq!(pred.variance()[2], 0.0);
    }

    #[test]
    fn samples_match_moments() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let mean = DVector::from_column_slice(&[1.0, -1.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 1.0]);
        let pred = GaussianProcessPrediction::new(mean.clone(), cov.clone());

        let n = 20_000;
        let samples = pred.sample(n, &mut rng).unwrap();
        assert_eq!(samples.len(), n);

        let avg = samples.iter().fold(DVector::zeros(2), |acc, s| acc + s)
            / n as f64;
        let emp_cov = samples
            .iter()
            .map(|s| (s - &avg) * (s - &avg).transpose())
            .fold(DMatrix::zeros(2, 2), |acc, c| acc + c)
            / (n - 1) as f64;

        assert!(avg.relative_eq(&mean, 0.05, 0.05));
        assert!(emp_cov.relative_eq(&cov, 0.15, 0.15));
    }

    #[test]
    fn draw_handles_singular_covariance() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let pred = prediction();
        let draw = pred.draw(&mut rng).unwrap();
        assert_eq!(draw.len(), 3);
        assert!(draw[2].abs() < 1E-3);
    }
}
