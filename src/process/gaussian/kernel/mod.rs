//! Covariance kernels

use nalgebra::base::constraint::{SameNumberOfColumns, ShapeConstraint};
use nalgebra::base::storage::Storage;
use nalgebra::{DMatrix, DVector, Dim, Matrix};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

mod covgrad;
pub use covgrad::*;

mod spectral_mixture;
pub use self::spectral_mixture::*;

mod spectral_init;

/// Kernel Function
///
/// Hyper-parameters cross the kernel boundary in log-scale so an
/// unconstrained optimizer can never make them non-positive.
pub trait Kernel: std::fmt::Debug + Clone + PartialEq {
    /// Return the number of (log-scale) parameters
    fn n_parameters(&self) -> usize;

    /// Number of input columns the kernel expects, if it is fixed.
    fn input_dims(&self) -> Option<usize> {
        None
    }

    /// Returns the covariance matrix between the rows of `x1` and `x2`
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
        ShapeConstraint: SameNumberOfColumns<C1, C2>;

    /// Reports if the given kernel function is stationary.
    fn is_stationary(&self) -> bool;

    /// Returns the diagonal of the kernel(x, x)
    fn diag<R, C, S>(&self, x: &Matrix<f64, R, C, S>) -> DVector<f64>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>;

    /// Return the corresponding parameter vector
    /// The parameters here are in a log-scale
    fn parameters(&self) -> DVector<f64>;

    /// Human readable names of the entries of [`Kernel::parameters`]
    fn parameter_names(&self) -> Vec<String>;

    /// Create a new kernel of the same shape from the provided parameters.
    /// The parameters here are in a log-scale
    fn reparameterize(&self, params: &[f64]) -> Result<Self, KernelError>;

    /// Takes a sequence of parameters and consumes only the ones it needs
    /// to create itself.
    /// The parameters here are in a log-scale
    fn consume_parameters<'p>(
        &self,
        params: &'p [f64],
    ) -> Result<(Self, &'p [f64]), KernelError> {
        let n = self.n_parameters();
        if params.len() < n {
            Err(KernelError::MissingParameters(n - params.len()))
        } else {
            let (cur, next) = params.split_at(n);
            let kernel = self.reparameterize(cur)?;
            Ok((kernel, next))
        }
    }

    /// Covariance and Gradient with the log-scaled hyper-parameters
    fn covariance_with_gradient<R, C, S>(
        &self,
        x: &Matrix<f64, R, C, S>,
    ) -> Result<(DMatrix<f64>, CovGrad), CovGradError>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>;
}

/// Errors from Kernel construction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum KernelError {
    /// Parameter Out of Bounds
    ParameterOutOfBounds {
        /// Name of parameter
        name: String,
        /// Value given
        given: f64,
        /// Lower and upper bounds on value
        bounds: (f64, f64),
    },
    /// Component parameters of inconsistent shape
    DimensionMismatch {
        /// Name of parameter
        name: String,
        /// Expected (rows, columns)
        expected: (usize, usize),
        /// Given (rows, columns)
        given: (usize, usize),
    },
    /// A kernel needs at least one mixture component
    NoComponents,
    /// Initialization needs at least one training point
    NoData,
    /// Too many parameters provided
    ExtraneousParameters(usize),
    /// Too few parameters provided
    MissingParameters(usize),
}

impl std::error::Error for KernelError {}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParameterOutOfBounds {
                name,
                given,
                bounds,
            } => write!(
                f,
                "parameter {} is out of bounds ({}, {}), given: {}",
                name, bounds.0, bounds.1, given
            ),
            Self::DimensionMismatch {
                name,
                expected,
                given,
            } => write!(
                f,
                "parameter {name} has shape {given:?}, expected {expected:?}"
            ),
            Self::NoComponents => {
                write!(f, "a mixture kernel needs at least one component")
            }
            Self::NoData => {
                write!(f, "cannot initialize a kernel from an empty data set")
            }
            Self::ExtraneousParameters(n) => {
                write!(f, "{n} extra parameters provided to kernel")
            }
            Self::MissingParameters(n) => write!(f, "missing {n} parameters"),
        }
    }
}
