//! Gaussian Processes

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use std::fmt;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::HALF_LN_2PI;
use crate::process::{Mode, RandomProcess};

pub mod kernel;
use kernel::{CovGradError, Kernel, KernelError};

mod mean;
pub use mean::MeanFunction;

mod noise_model;
pub use noise_model::*;

mod prediction;
pub use prediction::GaussianProcessPrediction;

/// Diagonal jitter schedule used when a covariance matrix fails to factor
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct JitterParams {
    /// First jitter, relative to the mean of the diagonal
    pub initial: f64,
    /// Factor applied to the jitter after each failed attempt
    pub growth: f64,
    /// Number of jittered attempts before giving up
    pub max_attempts: usize,
}

impl Default for JitterParams {
    fn default() -> Self {
        Self {
            initial: 1E-8,
            growth: 10.0,
            max_attempts: 6,
        }
    }
}

impl JitterParams {
    /// Set the initial relative jitter
    #[must_use]
    pub fn with_initial(self, initial: f64) -> Self {
        Self { initial, ..self }
    }

    /// Set the growth factor
    #[must_use]
    pub fn with_growth(self, growth: f64) -> Self {
        Self { growth, ..self }
    }

    /// Set the number of attempts
    #[must_use]
    pub fn with_max_attempts(self, max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }
}

/// Factor `k`, adding growing amounts of diagonal jitter on failure.
///
/// Returns the factor and the absolute jitter that was added.
pub(crate) fn stable_cholesky(
    k: DMatrix<f64>,
    jitter: &JitterParams,
) -> Result<(Cholesky<f64, Dyn>, f64), GaussianProcessError> {
    if k.iter().any(|v| !v.is_finite()) {
        return Err(GaussianProcessError::NonFiniteCovariance);
    }
    if let Some(chol) = Cholesky::new(k.clone()) {
        return Ok((chol, 0.0));
    }

    let n = k.nrows();
    let mean_diag = k.trace().abs() / n.max(1) as f64;
    let scale = if mean_diag > 0.0 { mean_diag } else { 1.0 };

    let mut amount = jitter.initial * scale;
    for attempt in 1..=jitter.max_attempts {
        warn!(
            "Covariance is not positive definite, \
             adding jitter {:e} (attempt {}/{})",
            amount, attempt, jitter.max_attempts
        );
        let mut k_jit = k.clone();
        for i in 0..n {
            k_jit[(i, i)] += amount;
        }
        if let Some(chol) = Cholesky::new(k_jit) {
            return Ok((chol, amount));
        }
        amount *= jitter.growth;
    }

    Err(GaussianProcessError::IllConditioned {
        attempts: jitter.max_attempts,
    })
}

/// Parameters for running a `GaussianProcess`
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GaussianProcessParams {
    /// Prior mean
    pub mean: MeanFunction,
    /// Type of noise
    pub noise_model: NoiseModel,
    /// Jitter schedule for ill-conditioned covariances
    pub jitter: JitterParams,
}

impl GaussianProcessParams {
    /// Set the prior mean
    #[must_use]
    pub fn with_mean(self, mean: MeanFunction) -> Self {
        Self { mean, ..self }
    }

    /// Set the noise model
    #[must_use]
    pub fn with_noise_model(self, noise_model: NoiseModel) -> Self {
        Self {
            noise_model,
            ..self
        }
    }

    /// Set the jitter schedule
    #[must_use]
    pub fn with_jitter(self, jitter: JitterParams) -> Self {
        Self { jitter, ..self }
    }
}

/// Gaussian Process regression model
///
/// Holds the training data, the covariance kernel, the mean and noise
/// models, and the factorization of `K + σ²I` for the current parameters.
/// Models start in [`Mode::Train`]; switch to [`Mode::Eval`] to predict.
#[derive(Clone, Debug)]
pub struct GaussianProcess<K>
where
    K: Kernel,
{
    /// Cholesky Decomposition of K + σ²I
    chol: Cholesky<f64, Dyn>,
    /// Dual coefficients of training data in kernel space.
    alpha: DVector<f64>,
    /// Diagonal jitter needed to factor the covariance
    jitter: f64,
    /// Covariance Kernel
    kernel: K,
    /// x values used in training
    x_train: DMatrix<f64>,
    /// y values used in training
    y_train: DVector<f64>,
    /// Given parameters
    params: GaussianProcessParams,
    mode: Mode,
}

impl<K> GaussianProcess<K>
where
    K: Kernel,
{
    /// Train a Gaussian Process on the given data points
    ///
    /// # Arguments
    /// * `kernel` - Kernel to use to determine covariance
    /// * `x_train` - Inputs, one point per row
    /// * `y_train` - Known values for `f(x)`
    /// * `params` - GaussianProcessParams to use. Can just use
    ///   `GaussianProcessParams::default()`.
    pub fn train(
        kernel: K,
        x_train: DMatrix<f64>,
        y_train: DVector<f64>,
        params: GaussianProcessParams,
    ) -> Result<Self, GaussianProcessError> {
        if x_train.nrows() == 0 {
            return Err(GaussianProcessError::EmptyTrainingSet);
        }
        if x_train.nrows() != y_train.len() {
            return Err(GaussianProcessError::ShapeMismatch {
                inputs: x_train.nrows(),
                targets: y_train.len(),
            });
        }
        if let Some(dims) = kernel.input_dims() {
            if dims != x_train.ncols() {
                return Err(GaussianProcessError::DimensionMismatch {
                    expected: dims,
                    given: x_train.ncols(),
                });
            }
        }
        if x_train.iter().chain(y_train.iter()).any(|v| !v.is_finite()) {
            return Err(GaussianProcessError::NonFiniteData);
        }

        let k = params
            .noise_model
            .add_noise_to_kernel(&kernel.covariance(&x_train, &x_train))?;
        let (chol, jitter) = stable_cholesky(k, &params.jitter)?;
        let residual = &y_train - params.mean.evaluate(y_train.len());
        let alpha = chol.solve(&residual);

        Ok(GaussianProcess {
            chol,
            alpha,
            jitter,
            kernel,
            x_train,
            y_train,
            params,
            mode: Mode::Train,
        })
    }

    /// Return the Cholesky decomposition of K + σ²I
    pub fn chol(&self) -> &Cholesky<f64, Dyn> {
        &self.chol
    }

    /// Absolute diagonal jitter that was needed to factor the covariance
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Return the kernel being used in this GP
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Prior mean function
    pub fn mean(&self) -> &MeanFunction {
        &self.params.mean
    }

    /// Observation noise model
    pub fn noise_model(&self) -> &NoiseModel {
        &self.params.noise_model
    }

    /// Training inputs
    pub fn x_train(&self) -> &DMatrix<f64> {
        &self.x_train
    }

    /// Training targets
    pub fn y_train(&self) -> &DVector<f64> {
        &self.y_train
    }

    /// Total number of learned parameters
    pub fn n_parameters(&self) -> usize {
        self.kernel.n_parameters()
            + self.params.mean.n_parameters()
            + self.params.noise_model.n_parameters()
    }

    /// Human readable names of the entries of `parameters()`: kernel,
    /// then mean, then noise.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = self.kernel.parameter_names();
        names.extend(self.params.mean.parameter_names());
        names.extend(self.params.noise_model.parameter_names());
        names
    }

    fn residual(&self, mean: &MeanFunction) -> DVector<f64> {
        &self.y_train - mean.evaluate(self.y_train.len())
    }

    fn check_eval(
        &self,
        xs: &DMatrix<f64>,
    ) -> Result<(), GaussianProcessError> {
        if self.mode != Mode::Eval {
            Err(GaussianProcessError::WrongMode {
                expected: Mode::Eval,
                current: self.mode,
            })
        } else if xs.ncols() != self.x_train.ncols() {
            Err(GaussianProcessError::DimensionMismatch {
                expected: self.x_train.ncols(),
                given: xs.ncols(),
            })
        } else {
            Ok(())
        }
    }

    /// Posterior distribution of the latent function at `xs`
    ///
    /// ```math
    ///     \mu_* = m(x_*) + K_{*X} \alpha
    ///     \Sigma_* = K_{**} - K_{*X} (K + \sigma^2 I)^{-1} K_{X*}
    /// ```
    ///
    /// Fails unless the model is in [`Mode::Eval`].
    pub fn predict(
        &self,
        xs: &DMatrix<f64>,
    ) -> Result<GaussianProcessPrediction, GaussianProcessError> {
        self.check_eval(xs)?;

        let k_trans = self.kernel.covariance(xs, &self.x_train);
        let mean =
            self.params.mean.evaluate(xs.nrows()) + &k_trans * &self.alpha;

        let v = self
            .chol
            .l_dirty()
            .solve_lower_triangular(&k_trans.transpose())
            .ok_or(GaussianProcessError::IllConditioned { attempts: 0 })?;
        let cov = self.kernel.covariance(xs, xs) - v.transpose() * v;

        Ok(GaussianProcessPrediction::new(mean, cov))
    }

    /// Posterior distribution of new noisy observations at `xs`; the
    /// latent posterior plus the learned observation noise.
    pub fn predict_observed(
        &self,
        xs: &DMatrix<f64>,
    ) -> Result<GaussianProcessPrediction, GaussianProcessError> {
        let noise = self.params.noise_model.predictive_variance()?;
        let latent = self.predict(xs)?;
        let (mean, mut cov) = latent.into_parts();
        for i in 0..cov.nrows() {
            cov[(i, i)] += noise;
        }
        Ok(GaussianProcessPrediction::new(mean, cov))
    }
}

fn log_marginal(
    chol: &Cholesky<f64, Dyn>,
    residual: &DVector<f64>,
    alpha: &DVector<f64>,
) -> f64 {
    let dlog_sum: f64 = chol.l_dirty().diagonal().map(f64::ln).sum();
    let n = residual.len() as f64;
    -0.5 * residual.dot(alpha) - dlog_sum - n * HALF_LN_2PI
}

impl<K> RandomProcess for GaussianProcess<K>
where
    K: Kernel,
{
    type Error = GaussianProcessError;

    fn ln_m(&self) -> f64 {
        log_marginal(&self.chol, &self.residual(&self.params.mean), &self.alpha)
    }

    fn ln_m_with_parameters(
        &self,
        parameters: &DVector<f64>,
    ) -> Result<(f64, DVector<f64>), Self::Error> {
        use std::cmp::Ordering;
        let expected = self.n_parameters();
        match parameters.len().cmp(&expected) {
            Ordering::Less => {
                return Err(GaussianProcessError::MissingParameters(
                    expected - parameters.len(),
                ))
            }
            Ordering::Greater => {
                return Err(GaussianProcessError::ExtraneousParameters(
                    parameters.len() - expected,
                ))
            }
            Ordering::Equal => (),
        }

        let (kernel, rest) =
            self.kernel.consume_parameters(parameters.as_slice())?;
        let (mean, rest) = self.params.mean.consume_parameters(rest)?;
        let (noise_model, _) =
            self.params.noise_model.consume_parameters(rest)?;

        // GPML Equation 2.30
        let (k, k_grad) = kernel.covariance_with_gradient(&self.x_train)?;
        let k = noise_model.add_noise_to_kernel(&k)?;
        let (chol, _) = stable_cholesky(k, &self.params.jitter)?;
        let residual = self.residual(&mean);
        let alpha = chol.solve(&residual);
        let ln_m = log_marginal(&chol, &residual, &alpha);

        // GPML Equation 5.9
        let aat_kinv = &alpha * alpha.transpose() - chol.inverse();
        let mut grad = DVector::zeros(expected);
        let n_kernel = kernel.n_parameters();
        grad.rows_mut(0, n_kernel)
            .copy_from(&(k_grad.contract(&aat_kinv)? * 0.5));

        let mut idx = n_kernel;
        if mean.has_gradient() {
            grad[idx] = alpha.sum();
            idx += 1;
        }
        if let Some(dvar) = noise_model.variance_gradient() {
            grad[idx] = 0.5 * dvar * aat_kinv.trace();
        }

        Ok((ln_m, grad))
    }

    fn parameters(&self) -> DVector<f64> {
        let mut params: Vec<f64> =
            self.kernel.parameters().iter().copied().collect();
        params.extend(self.params.mean.parameters());
        params.extend(self.params.noise_model.parameters());
        DVector::from_vec(params)
    }

    fn set_parameters(
        &mut self,
        parameters: &DVector<f64>,
    ) -> Result<(), Self::Error> {
        let expected = self.n_parameters();
        if parameters.len() > expected {
            return Err(GaussianProcessError::ExtraneousParameters(
                parameters.len() - expected,
            ));
        }
        let (kernel, rest) =
            self.kernel.consume_parameters(parameters.as_slice())?;
        let (mean, rest) = self.params.mean.consume_parameters(rest)?;
        let (noise_model, _) =
            self.params.noise_model.consume_parameters(rest)?;

        let params = GaussianProcessParams {
            mean,
            noise_model,
            jitter: self.params.jitter.clone(),
        };
        let k_train = kernel.covariance(&self.x_train, &self.x_train);
        let k = params.noise_model.add_noise_to_kernel(&k_train)?;
        let (chol, jitter) = stable_cholesky(k, &params.jitter)?;
        let alpha = chol.solve(&self.residual(&params.mean));
        debug!("refit with parameters {}", parameters.transpose());

        self.chol = chol;
        self.alpha = alpha;
        self.jitter = jitter;
        self.kernel = kernel;
        self.params = params;
        Ok(())
    }

    fn n_observations(&self) -> usize {
        self.y_train.len()
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}

/// Errors from Gaussian Process construction, training, and prediction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum GaussianProcessError {
    /// No training points were given
    EmptyTrainingSet,
    /// Inputs and targets have a different number of points
    ShapeMismatch {
        /// Rows in the input matrix
        inputs: usize,
        /// Length of the target vector
        targets: usize,
    },
    /// Inputs have the wrong number of columns
    DimensionMismatch {
        /// Expected number of columns
        expected: usize,
        /// Given number of columns
        given: usize,
    },
    /// Training data contain NaN or infinite values
    NonFiniteData,
    /// The covariance matrix contains NaN or infinite values
    NonFiniteCovariance,
    /// The covariance could not be factored even with jitter
    IllConditioned {
        /// Jittered attempts made
        attempts: usize,
    },
    /// The operation is not available in the current mode
    WrongMode {
        /// Mode the operation needs
        expected: Mode,
        /// Mode the model is in
        current: Mode,
    },
    /// Too few parameters provided
    MissingParameters(usize),
    /// Too many parameters provided
    ExtraneousParameters(usize),
    /// Error from the kernel
    Kernel(KernelError),
    /// Error from the covariance gradient
    CovGrad(CovGradError),
    /// Error from the noise model
    NoiseModel(NoiseModelError),
}

impl std::error::Error for GaussianProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Kernel(e) => Some(e),
            Self::CovGrad(e) => Some(e),
            Self::NoiseModel(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for GaussianProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTrainingSet => {
                write!(f, "cannot train on an empty data set")
            }
            Self::ShapeMismatch { inputs, targets } => write!(
                f,
                "{inputs} input rows do not match {targets} targets"
            ),
            Self::DimensionMismatch { expected, given } => write!(
                f,
                "inputs have {given} columns, expected {expected}"
            ),
            Self::NonFiniteData => {
                write!(f, "training data contain non-finite values")
            }
            Self::NonFiniteCovariance => {
                write!(f, "covariance matrix contains non-finite values")
            }
            Self::IllConditioned { attempts } => write!(
                f,
                "the kernel is not returning a positive-definite matrix \
                 ({attempts} jittered attempts)"
            ),
            Self::WrongMode { expected, current } => write!(
                f,
                "operation requires {expected} mode, model is in {current} mode"
            ),
            Self::MissingParameters(n) => write!(f, "missing {n} parameters"),
            Self::ExtraneousParameters(n) => {
                write!(f, "{n} extra parameters provided")
            }
            Self::Kernel(e) => write!(f, "kernel error: {e}"),
            Self::CovGrad(e) => write!(f, "covariance gradient error: {e}"),
            Self::NoiseModel(e) => write!(f, "noise model error: {e}"),
        }
    }
}

impl From<KernelError> for GaussianProcessError {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}

impl From<CovGradError> for GaussianProcessError {
    fn from(e: CovGradError) -> Self {
        Self::CovGrad(e)
    }
}

impl From<NoiseModelError> for GaussianProcessError {
    fn from(e: NoiseModelError) -> Self {
        Self::NoiseModel(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::gaussian::kernel::SpectralMixtureKernel;

    fn toy_data() -> (DMatrix<f64>, DVector<f64>) {
        let x_train: DMatrix<f64> =
            DMatrix::from_column_slice(5, 1, &[-1.0, -0.6, -0.1, 0.3, 0.8]);
        let y_train: DVector<f64> = x_train.map(|x| x.sin()).column(0).into();
        (x_train, y_train)
    }

    fn toy_kernel() -> SpectralMixtureKernel {
        SpectralMixtureKernel::one_dimensional(
            &[1.0, 0.3],
            &[0.2, 1.1],
            &[0.5, 0.8],
        )
        .unwrap()
    }

    fn toy_gp() -> GaussianProcess<SpectralMixtureKernel> {
        let (x_train, y_train) = toy_data();
        let params = GaussianProcessParams::default()
            .with_mean(MeanFunction::Constant(0.1))
            .with_noise_model(NoiseModel::uniform(0.05).unwrap());
        GaussianProcess::train(toy_kernel(), x_train, y_train, params).unwrap()
    }

    #[test]
    fn ln_m_matches_dense_formula() {
        let gp = toy_gp();
        let (x_train, y_train) = toy_data();

        let k = toy_kernel().covariance(&x_train, &x_train)
            + DMatrix::identity(5, 5) * 0.05;
        let r = y_train.add_scalar(-0.1);
        let quad = (r.transpose() * k.clone().try_inverse().unwrap() * &r)[0];
        let expected = -0.5 * quad
            - 0.5 * k.determinant().ln()
            - 5.0 * HALF_LN_2PI;

        assert::close(gp.ln_m(), expected, 1E-10);
        assert_eq!(gp.jitter(), 0.0);
    }

    #[test]
    fn ln_m_with_parameters_agrees_with_ln_m() {
        let gp = toy_gp();
        let (ln_m, grad) = gp.ln_m_with_parameters(&gp.parameters()).unwrap();
        assert::close(ln_m, gp.ln_m(), 1E-10);
        assert_eq!(grad.len(), gp.n_parameters());
    }

    #[test]
    fn ln_m_gradient_matches_finite_differences() {
        let gp = toy_gp();
        let theta = gp.parameters();
        let (_, grad) = gp.ln_m_with_parameters(&theta).unwrap();

        let h = 1E-6;
        for i in 0..theta.len() {
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[i] += h;
            down[i] -= h;
            let f_up = gp.ln_m_with_parameters(&up).unwrap().0;
            let f_down = gp.ln_m_with_parameters(&down).unwrap().0;
            let numeric = (f_up - f_down) / (2.0 * h);
            assert!(
                (numeric - grad[i]).abs() < 1E-5 * (1.0 + numeric.abs()),
                "parameter {}: analytic {} vs numeric {}",
                gp.parameter_names()[i],
                grad[i],
                numeric
            );
        }
    }

    #[test]
    fn parameter_layout() {
        let gp = toy_gp();
        let names = gp.parameter_names();
        assert_eq!(names.len(), gp.n_parameters());
        assert_eq!(names.len(), 2 * 3 + 2);
        assert_eq!(names[0], "mixture_weights[0]");
        assert_eq!(names[6], "mean.constant");
        assert_eq!(names[7], "noise");

        let theta = gp.parameters();
        assert::close(theta[6], 0.1, 1E-12);
        assert::close(theta[7], (0.05 - DEFAULT_NOISE_FLOOR).ln(), 1E-12);
    }

    #[test]
    fn set_parameters_round_trip() {
        let mut gp = toy_gp();
        let ln_m = gp.ln_m();
        let theta = gp.parameters();
        gp.set_parameters(&theta).unwrap();
        assert::close(gp.ln_m(), ln_m, 1E-10);
        assert!(gp.parameters().relative_eq(&theta, 1E-12, 1E-12));

        let mut shifted = theta.clone();
        shifted[6] = 0.5;
        gp.set_parameters(&shifted).unwrap();
        assert_eq!(gp.mean(), &MeanFunction::Constant(0.5));
    }

    #[test]
    fn noise_collapsing_onto_floor_is_accepted() {
        let mut gp = toy_gp();
        let mut theta = gp.parameters();
        theta[7] = -50.0;

        let (ln_m, grad) = gp.ln_m_with_parameters(&theta).unwrap();
        assert!(ln_m.is_finite());
        assert!(grad.iter().all(|g| g.is_finite()));
        assert_eq!(grad[7], 0.0);

        gp.set_parameters(&theta).unwrap();
        assert_eq!(
            gp.noise_model().predictive_variance(),
            Ok(DEFAULT_NOISE_FLOOR)
        );
        assert!(gp.parameters()[7].is_finite());
    }

    #[test]
    fn wrong_parameter_lengths_are_rejected() {
        let gp = toy_gp();
        let n = gp.n_parameters();
        assert_eq!(
            gp.ln_m_with_parameters(&DVector::zeros(n - 2)).unwrap_err(),
            GaussianProcessError::MissingParameters(2)
        );
        assert_eq!(
            gp.ln_m_with_parameters(&DVector::zeros(n + 1)).unwrap_err(),
            GaussianProcessError::ExtraneousParameters(1)
        );
    }

    #[test]
    fn train_validates_inputs() {
        let (x, y) = toy_data();
        let params = GaussianProcessParams::default;

        let empty = GaussianProcess::train(
            toy_kernel(),
            DMatrix::zeros(0, 1),
            DVector::zeros(0),
            params(),
        );
        assert_eq!(empty.unwrap_err(), GaussianProcessError::EmptyTrainingSet);

        let short = GaussianProcess::train(
            toy_kernel(),
            x.clone(),
            y.rows(0, 4).into_owned(),
            params(),
        );
        assert_eq!(
            short.unwrap_err(),
            GaussianProcessError::ShapeMismatch {
                inputs: 5,
                targets: 4
            }
        );

        let wide = GaussianProcess::train(
            toy_kernel(),
            DMatrix::zeros(5, 2),
            y.clone(),
            params(),
        );
        assert_eq!(
            wide.unwrap_err(),
            GaussianProcessError::DimensionMismatch {
                expected: 1,
                given: 2
            }
        );

        let mut y_nan = y;
        y_nan[2] = f64::NAN;
        let nan = GaussianProcess::train(toy_kernel(), x, y_nan, params());
        assert_eq!(nan.unwrap_err(), GaussianProcessError::NonFiniteData);
    }

    #[test]
    fn jitter_recovers_duplicated_inputs() {
        let x = DMatrix::from_column_slice(3, 1, &[0.0, 0.0, 1.0]);
        let y = DVector::from_column_slice(&[0.5, 0.5, -0.2]);
        let kernel =
            SpectralMixtureKernel::one_dimensional(&[1.0], &[0.5], &[0.5])
                .unwrap();
        let noise = NoiseModel::per_point(DVector::zeros(3)).unwrap();
        let params = GaussianProcessParams::default()
            .with_mean(MeanFunction::Zero)
            .with_noise_model(noise);

        let gp = GaussianProcess::train(
            kernel.clone(),
            x.clone(),
            y.clone(),
            params.clone(),
        )
        .unwrap();
        assert!(gp.jitter() > 0.0);
        assert!(gp.ln_m().is_finite());

        let no_retry =
            params.with_jitter(JitterParams::default().with_max_attempts(0));
        assert_eq!(
            GaussianProcess::train(kernel, x, y, no_retry).unwrap_err(),
            GaussianProcessError::IllConditioned { attempts: 0 }
        );
    }

    #[test]
    fn predict_requires_eval_mode() {
        let mut gp = toy_gp();
        let xs = DMatrix::from_column_slice(2, 1, &[0.0, 0.5]);
        assert_eq!(
            gp.predict(&xs).unwrap_err(),
            GaussianProcessError::WrongMode {
                expected: Mode::Eval,
                current: Mode::Train
            }
        );

        gp.set_mode(Mode::Eval);
        assert!(gp.predict(&xs).is_ok());
        assert_eq!(
            gp.predict(&DMatrix::zeros(2, 3)).unwrap_err(),
            GaussianProcessError::DimensionMismatch {
                expected: 1,
                given: 3
            }
        );
    }

    #[test]
    fn predict_matches_dense_formula() {
        let mut gp = toy_gp();
        gp.set_mode(Mode::Eval);
        let (x_train, y_train) = toy_data();
        let xs = DMatrix::from_column_slice(3, 1, &[-0.8, 0.0, 1.5]);
        let pred = gp.predict(&xs).unwrap();

        let kernel = toy_kernel();
        let k_inv = (kernel.covariance(&x_train, &x_train)
            + DMatrix::identity(5, 5) * 0.05)
            .try_inverse()
            .unwrap();
        let k_trans = kernel.covariance(&xs, &x_train);
        let mean =
            (&k_trans * &k_inv * y_train.add_scalar(-0.1)).add_scalar(0.1);
        let cov = kernel.covariance(&xs, &xs)
            - &k_trans * &k_inv * k_trans.transpose();

        assert!(pred.mean().relative_eq(&mean, 1E-8, 1E-8));
        assert!(pred.cov().relative_eq(&cov, 1E-8, 1E-8));
    }

    #[test]
    fn predict_observed_adds_noise() {
        let mut gp = toy_gp();
        gp.set_mode(Mode::Eval);
        let xs = DMatrix::from_column_slice(2, 1, &[0.1, 2.0]);
        let latent = gp.predict(&xs).unwrap();
        let observed = gp.predict_observed(&xs).unwrap();

        assert_eq!(latent.mean(), observed.mean());
        let diff = observed.variance() - latent.variance();
        assert::close(diff[0], 0.05, 1E-12);
        assert::close(diff[1], 0.05, 1E-12);
    }
}
