//! Random processes and their hyper-parameter fitting
use std::fmt;

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, Gradient, State,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::info;
use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

pub mod gaussian;
pub mod training;

use training::{TrainError, TrainParams, TrainReport};

/// Whether a model is being fit or used for prediction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Hyper-parameters are being optimized
    #[default]
    Train,
    /// Hyper-parameters are fixed; predictions are available
    Eval,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Eval => write!(f, "eval"),
        }
    }
}

/// A random process with a differentiable marginal likelihood over a flat
/// vector of unconstrained parameters.
pub trait RandomProcess
where
    Self: Sized,
{
    /// Error from evaluating or rebuilding the process
    type Error: std::error::Error + Send + Sync + 'static;

    /// Compute the log marginal likelihood
    fn ln_m(&self) -> f64;

    /// Compute the log marginal likelihood with an different set of
    /// parameters, and its gradient with respect to them.
    fn ln_m_with_parameters(
        &self,
        parameters: &DVector<f64>,
    ) -> Result<(f64, DVector<f64>), Self::Error>;

    /// Get the parameters
    fn parameters(&self) -> DVector<f64>;

    /// Rebuild the process from the given parameters. On error the process
    /// is left unchanged.
    fn set_parameters(
        &mut self,
        parameters: &DVector<f64>,
    ) -> Result<(), Self::Error>;

    /// Number of observations the likelihood is computed over
    fn n_observations(&self) -> usize;

    /// Current mode
    fn mode(&self) -> Mode;

    /// Switch mode
    fn set_mode(&mut self, mode: Mode);

    /// Training loss, `-ln_m / N`, and its gradient
    fn loss_with_parameters(
        &self,
        parameters: &DVector<f64>,
    ) -> Result<(f64, DVector<f64>), Self::Error> {
        let n = self.n_observations().max(1) as f64;
        let (ln_m, grad) = self.ln_m_with_parameters(parameters)?;
        Ok((-ln_m / n, grad / -n))
    }

    /// Fit the parameters with Adam; see [`training::fit`]
    fn fit(
        self,
        params: &TrainParams,
    ) -> Result<(Self, TrainReport), TrainError<Self::Error>> {
        training::fit(self, params)
    }
}

/// Random Process which can be optimized to reach a maximum likelihood
/// estimate with L-BFGS.
pub trait RandomProcessMle: RandomProcess {
    /// Run the optimization for at most `max_iters` iterations. The
    /// returned process is in [`Mode::Eval`].
    fn optimize(mut self, max_iters: u64) -> Result<Self, ArgminError> {
        self.set_mode(Mode::Train);
        let params = self.parameters();
        let best = {
            let op = RandomProcessMleOp { process: &self };
            let solver = LBFGS::new(MoreThuenteLineSearch::new(), 7);

            let res = Executor::new(op, solver)
                .configure(|state| state.param(params).max_iters(max_iters))
                .run()?;
            info!(
                "L-BFGS stopped after {} iterations, best loss {:.3}",
                res.state().get_iter(),
                res.state().get_best_cost()
            );
            res.state().get_best_param().cloned().ok_or_else(|| {
                ArgminError::msg("optimizer produced no parameters")
            })?
        };
        self.set_parameters(&best)?;
        self.set_mode(Mode::Eval);
        Ok(self)
    }
}

impl<P> RandomProcessMle for P where P: RandomProcess {}

/// The negative scaled log marginal likelihood of a process, as an argmin
/// problem
pub struct RandomProcessMleOp<'a, P>
where
    P: RandomProcess,
{
    process: &'a P,
}

impl<'a, P> CostFunction for RandomProcessMleOp<'a, P>
where
    P: RandomProcess,
{
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.process.loss_with_parameters(param)?.0)
    }
}

impl<'a, P> Gradient for RandomProcessMleOp<'a, P>
where
    P: RandomProcess,
{
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(
        &self,
        param: &Self::Param,
    ) -> Result<Self::Gradient, ArgminError> {
        Ok(self.process.loss_with_parameters(param)?.1)
    }
}
