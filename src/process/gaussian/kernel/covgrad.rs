#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Gradient of a covariance matrix with respect to each hyper-parameter.
///
/// Slice `k` holds `∂K / ∂θ_k`, one `n × n` matrix per parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct CovGrad {
    slices: Vec<DMatrix<f64>>,
}

impl CovGrad {
    /// Create a new cov-grad with all zeros
    #[must_use]
    pub fn zeros(n: usize, n_parameters: usize) -> Self {
        Self {
            slices: (0..n_parameters).map(|_| DMatrix::zeros(n, n)).collect(),
        }
    }

    /// Number of parameters (slices) held
    #[must_use]
    pub fn n_parameters(&self) -> usize {
        self.slices.len()
    }

    /// Frobenius inner product of `other` with every slice, i.e.
    /// `tr(other · ∂K/∂θ_k)` for symmetric slices.
    pub fn contract(
        &self,
        other: &DMatrix<f64>,
    ) -> Result<DVector<f64>, CovGradError> {
        match self.slices.first() {
            Some(s) if s.shape() != other.shape() => {
                Err(CovGradError::ShapeMismatch {
                    slice: s.shape(),
                    given: other.shape(),
                })
            }
            _ => Ok(DVector::from_iterator(
                self.slices.len(),
                self.slices.iter().map(|s| s.component_mul(other).sum()),
            )),
        }
    }
}

impl Index<usize> for CovGrad {
    type Output = DMatrix<f64>;

    fn index(&self, k: usize) -> &Self::Output {
        &self.slices[k]
    }
}

impl Index<(usize, usize, usize)> for CovGrad {
    type Output = f64;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &Self::Output {
        &self.slices[k][(i, j)]
    }
}

impl IndexMut<(usize, usize, usize)> for CovGrad {
    fn index_mut(
        &mut self,
        (i, j, k): (usize, usize, usize),
    ) -> &mut Self::Output {
        &mut self.slices[k][(i, j)]
    }
}

/// Error from combining a `CovGrad` with another matrix
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum CovGradError {
    /// The matrix does not have the shape of the slices
    ShapeMismatch {
        /// Shape of each slice
        slice: (usize, usize),
        /// Shape of the matrix given
        given: (usize, usize),
    },
}

impl std::error::Error for CovGradError {}

impl fmt::Display for CovGradError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { slice, given } => write!(
                f,
                "cannot contract {given:?} matrix with {slice:?} gradient"
            ),
        }
    }
}
