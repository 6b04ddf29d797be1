use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::GaussianProcessError;

/// Prior mean of a Gaussian Process
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MeanFunction {
    /// Zero everywhere; nothing to learn
    Zero,
    /// A learned constant
    Constant(f64),
}

impl Default for MeanFunction {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl MeanFunction {
    /// Number of learned parameters
    pub fn n_parameters(&self) -> usize {
        match self {
            Self::Zero => 0,
            Self::Constant(_) => 1,
        }
    }

    /// Learned parameters; the constant is unconstrained so it is not
    /// log-transformed.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            Self::Zero => vec![],
            Self::Constant(c) => vec![*c],
        }
    }

    /// Names of the entries of [`MeanFunction::parameters`]
    pub fn parameter_names(&self) -> Vec<String> {
        match self {
            Self::Zero => vec![],
            Self::Constant(_) => vec!["mean.constant".to_string()],
        }
    }

    /// Takes the parameters it needs from the front of `params`
    pub fn consume_parameters<'p>(
        &self,
        params: &'p [f64],
    ) -> Result<(Self, &'p [f64]), GaussianProcessError> {
        match (self, params.split_first()) {
            (Self::Zero, _) => Ok((Self::Zero, params)),
            (Self::Constant(_), Some((c, rest))) => {
                Ok((Self::Constant(*c), rest))
            }
            (Self::Constant(_), None) => {
                Err(GaussianProcessError::MissingParameters(1))
            }
        }
    }

    /// Value of the mean at `n` points
    pub fn evaluate(&self, n: usize) -> DVector<f64> {
        match self {
            Self::Zero => DVector::zeros(n),
            Self::Constant(c) => DVector::from_element(n, *c),
        }
    }

    pub(crate) fn has_gradient(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}
