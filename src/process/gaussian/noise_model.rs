use nalgebra::{DMatrix, DVector};
use std::fmt;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Default lower bound on a learned noise variance
pub const DEFAULT_NOISE_FLOOR: f64 = 1E-4;
/// Default starting noise variance
pub const DEFAULT_NOISE_VARIANCE: f64 = 0.5;

/// Model of noise to use in Gaussian Process
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum NoiseModel {
    /// The same noise variance is applied to all values and is learned
    /// during training. It is parameterized as `floor + exp(θ)` so it can
    /// never fall below `floor`; any finite `θ` is valid.
    Uniform {
        /// Noise variance
        variance: f64,
        /// Lower bound on the variance
        floor: f64,
    },
    /// Fixed noise variances, one per training value; not learned
    PerPoint(DVector<f64>),
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Uniform {
            variance: DEFAULT_NOISE_VARIANCE,
            floor: DEFAULT_NOISE_FLOOR,
        }
    }
}

impl NoiseModel {
    /// Learned uniform noise starting at `variance`, above the default floor
    pub fn uniform(variance: f64) -> Result<Self, NoiseModelError> {
        Self::uniform_with_floor(variance, DEFAULT_NOISE_FLOOR)
    }

    /// Learned uniform noise starting at `variance`, above `floor`
    pub fn uniform_with_floor(
        variance: f64,
        floor: f64,
    ) -> Result<Self, NoiseModelError> {
        if !(floor >= 0.0 && floor.is_finite()) {
            Err(NoiseModelError::ParameterOutOfBounds {
                name: "floor",
                given: floor,
                bounds: (0.0, f64::INFINITY),
            })
        } else if !(variance > floor && variance.is_finite()) {
            Err(NoiseModelError::ParameterOutOfBounds {
                name: "variance",
                given: variance,
                bounds: (floor, f64::INFINITY),
            })
        } else {
            Ok(NoiseModel::Uniform { variance, floor })
        }
    }

    /// Fixed per-point noise variances
    pub fn per_point(variances: DVector<f64>) -> Result<Self, NoiseModelError> {
        match variances.iter().find(|v| !(**v >= 0.0 && v.is_finite())) {
            Some(&given) => Err(NoiseModelError::ParameterOutOfBounds {
                name: "variances",
                given,
                bounds: (0.0, f64::INFINITY),
            }),
            None => Ok(NoiseModel::PerPoint(variances)),
        }
    }

    /// Number of learned parameters
    pub fn n_parameters(&self) -> usize {
        match self {
            NoiseModel::Uniform { .. } => 1,
            NoiseModel::PerPoint(_) => 0,
        }
    }

    /// Learned parameters, `ln(variance - floor)` for uniform noise.
    ///
    /// A variance that has collapsed onto the floor reports the smallest
    /// positive excess so the parameter stays finite.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            NoiseModel::Uniform { variance, floor } => {
                vec![(variance - floor).max(f64::MIN_POSITIVE).ln()]
            }
            NoiseModel::PerPoint(_) => vec![],
        }
    }

    /// Names of the entries of [`NoiseModel::parameters`]
    pub fn parameter_names(&self) -> Vec<String> {
        match self {
            NoiseModel::Uniform { .. } => vec!["noise".to_string()],
            NoiseModel::PerPoint(_) => vec![],
        }
    }

    /// Rebuild this noise model from learned parameters
    pub fn reparameterize(
        &self,
        params: &[f64],
    ) -> Result<Self, NoiseModelError> {
        use std::cmp::Ordering;
        let n = self.n_parameters();
        match params.len().cmp(&n) {
            Ordering::Less => {
                Err(NoiseModelError::MissingParameters(n - params.len()))
            }
            Ordering::Greater => {
                Err(NoiseModelError::ExtraneousParameters(params.len() - n))
            }
            Ordering::Equal => match self {
                NoiseModel::Uniform { floor, .. } => {
                    let variance = floor + params[0].exp();
                    if variance.is_finite() {
                        Ok(NoiseModel::Uniform {
                            variance,
                            floor: *floor,
                        })
                    } else {
                        Err(NoiseModelError::ParameterOutOfBounds {
                            name: "noise",
                            given: params[0],
                            bounds: (f64::NEG_INFINITY, f64::INFINITY),
                        })
                    }
                }
                NoiseModel::PerPoint(_) => Ok(self.clone()),
            },
        }
    }

    /// Consume the parameters this model needs, returning the remainder
    pub fn consume_parameters<'p>(
        &self,
        params: &'p [f64],
    ) -> Result<(Self, &'p [f64]), NoiseModelError> {
        let n = self.n_parameters();
        if params.len() < n {
            Err(NoiseModelError::MissingParameters(n - params.len()))
        } else {
            let (cur, next) = params.split_at(n);
            Ok((self.reparameterize(cur)?, next))
        }
    }

    /// Derivative of the variance with respect to its log-scale parameter
    pub(crate) fn variance_gradient(&self) -> Option<f64> {
        match self {
            NoiseModel::Uniform { variance, floor } => Some(variance - floor),
            NoiseModel::PerPoint(_) => None,
        }
    }

    /// Noise variance of a new observation, if it is known away from the
    /// training points
    pub fn predictive_variance(&self) -> Result<f64, NoiseModelError> {
        match self {
            NoiseModel::Uniform { variance, .. } => Ok(*variance),
            NoiseModel::PerPoint(_) => Err(NoiseModelError::UnknownAtNewPoints),
        }
    }

    /// Enact the given noise model onto the given covariance matrix
    pub fn add_noise_to_kernel(
        &self,
        cov: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, NoiseModelError> {
        match self {
            NoiseModel::Uniform { variance, .. } => {
                let diag = DVector::from_element(cov.nrows(), *variance);
                Ok(cov + &DMatrix::from_diagonal(&diag))
            }
            NoiseModel::PerPoint(variances) => {
                if cov.nrows() == variances.nrows() {
                    Ok(cov + &DMatrix::from_diagonal(variances))
                } else {
                    Err(NoiseModelError::SizeMismatch {
                        expected: cov.nrows(),
                        given: variances.nrows(),
                    })
                }
            }
        }
    }
}

/// Errors from noise model construction and use
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum NoiseModelError {
    /// Parameter Out of Bounds
    ParameterOutOfBounds {
        /// Name of parameter
        name: &'static str,
        /// Value given
        given: f64,
        /// Lower and upper bounds on value
        bounds: (f64, f64),
    },
    /// Per point noise must be the same size as the training targets
    SizeMismatch {
        /// Number of training targets
        expected: usize,
        /// Number of noise values
        given: usize,
    },
    /// Too many parameters provided
    ExtraneousParameters(usize),
    /// Too few parameters provided
    MissingParameters(usize),
    /// Per point noise has no value away from the training points
    UnknownAtNewPoints,
}

impl std::error::Error for NoiseModelError {}

impl fmt::Display for NoiseModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterOutOfBounds {
                name,
                given,
                bounds,
            } => write!(
                f,
                "noise parameter {} is out of bounds ({}, {}), given: {}",
                name, bounds.0, bounds.1, given
            ),
            Self::SizeMismatch { expected, given } => write!(
                f,
                "per point noise must be the same size as y_train \
                 (expected: {expected}, got: {given})"
            ),
            Self::ExtraneousParameters(n) => {
                write!(f, "{n} extra parameters provided to noise model")
            }
            Self::MissingParameters(n) => {
                write!(f, "noise model is missing {n} parameters")
            }
            Self::UnknownAtNewPoints => write!(
                f,
                "per point noise is only known at the training points"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_round_trip_keeps_floor() {
        let noise = NoiseModel::uniform_with_floor(0.3, 0.1).unwrap();
        let params = noise.parameters();
        assert::close(params[0], 0.2_f64.ln(), 1E-12);
        assert_eq!(noise.reparameterize(&params).unwrap(), noise);
        assert::close(noise.variance_gradient().unwrap(), 0.2, 1E-12);
    }

    #[test]
    fn very_negative_parameter_settles_on_floor() {
        let noise = NoiseModel::uniform_with_floor(0.3, 0.1).unwrap();
        let low = noise.reparameterize(&[-50.0]).unwrap();
        match &low {
            NoiseModel::Uniform { variance, floor } => {
                assert_eq!(*floor, 0.1);
                assert_eq!(*variance, 0.1);
            }
            NoiseModel::PerPoint(_) => panic!("wrong variant"),
        }
        assert!(low.parameters()[0].is_finite());
        assert_eq!(low.variance_gradient(), Some(0.0));
        assert!(noise.reparameterize(&[f64::NAN]).is_err());
        assert!(noise.reparameterize(&[1E3]).is_err());
    }

    #[test]
    fn uniform_rejects_variance_at_floor() {
        assert!(NoiseModel::uniform_with_floor(0.1, 0.1).is_err());
        assert!(NoiseModel::uniform(f64::NAN).is_err());
        assert!(NoiseModel::uniform_with_floor(1.0, -1.0).is_err());
    }

    #[test]
    fn per_point_has_no_parameters() {
        let noise =
            NoiseModel::per_point(DVector::from_column_slice(&[0.1, 0.2]))
                .unwrap();
        assert_eq!(noise.n_parameters(), 0);
        assert!(noise.parameters().is_empty());
        assert_eq!(
            noise.predictive_variance(),
            Err(NoiseModelError::UnknownAtNewPoints)
        );

        let (same, rest) = noise.consume_parameters(&[1.0]).unwrap();
        assert_eq!(same, noise);
        assert_eq!(rest, &[1.0]);
    }

    #[test]
    fn add_noise_to_kernel() {
        let cov = DMatrix::from_element(2, 2, 1.0);
        let noisy = NoiseModel::uniform(0.5).unwrap().add_noise_to_kernel(&cov);
        assert_eq!(
            noisy,
            Ok(DMatrix::from_row_slice(2, 2, &[1.5, 1.0, 1.0, 1.5]))
        );

        let per_point =
            NoiseModel::per_point(DVector::from_column_slice(&[0.1, 0.2, 0.3]))
                .unwrap();
        assert_eq!(
            per_point.add_noise_to_kernel(&cov),
            Err(NoiseModelError::SizeMismatch {
                expected: 2,
                given: 3
            })
        );
    }
}
