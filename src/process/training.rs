//! Type-II maximum likelihood fitting with Adam
use std::fmt;

use log::{debug, info, warn};
use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{Mode, RandomProcess};
use crate::optim::{Adam, AdamParams};

/// Parameters for the training loop
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct TrainParams {
    /// Number of iterations to run
    pub max_iters: usize,
    /// Optimizer parameters
    pub adam: AdamParams,
    /// Stop early once the absolute change in loss falls below this
    pub tolerance: Option<f64>,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            max_iters: 100,
            adam: AdamParams::default(),
            tolerance: None,
        }
    }
}

impl TrainParams {
    /// Set the number of iterations
    #[must_use]
    pub fn with_max_iters(self, max_iters: usize) -> Self {
        Self { max_iters, ..self }
    }

    /// Set the Adam learning rate
    #[must_use]
    pub fn with_learning_rate(self, learning_rate: f64) -> Self {
        Self {
            adam: self.adam.with_learning_rate(learning_rate),
            ..self
        }
    }

    /// Set the optimizer parameters
    #[must_use]
    pub fn with_adam(self, adam: AdamParams) -> Self {
        Self { adam, ..self }
    }

    /// Set the convergence tolerance
    #[must_use]
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self {
            tolerance: Some(tolerance),
            ..self
        }
    }
}

/// Summary of a training run
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct TrainReport {
    /// Loss at each evaluated iteration
    pub losses: Vec<f64>,
    /// Number of iterations run
    pub iterations: usize,
    /// Whether training stopped on the tolerance
    pub converged: bool,
}

impl TrainReport {
    /// Loss at the first iteration
    pub fn initial_loss(&self) -> Option<f64> {
        self.losses.first().copied()
    }

    /// Loss at the last iteration
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

/// Errors from the training loop
#[derive(Clone, Debug, PartialEq)]
pub enum TrainError<E> {
    /// The loss, its gradient, or the updated parameters became
    /// non-finite, or the process could not be rebuilt from them.
    Divergence {
        /// Iteration, counted from 1 as logged, at which training failed
        iteration: usize,
        /// Last parameters with a finite loss and gradient
        last_good: DVector<f64>,
    },
    /// The process failed at its initial parameters
    Process(E),
}

impl<E> std::error::Error for TrainError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Process(e) => Some(e),
            Self::Divergence { .. } => None,
        }
    }
}

impl<E> fmt::Display for TrainError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Divergence { iteration, .. } => write!(
                f,
                "training diverged at iteration {iteration}; \
                 retry with a smaller learning rate"
            ),
            Self::Process(e) => write!(f, "training failed: {e}"),
        }
    }
}

fn is_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Minimize `-ln_m / N` of `process` with Adam.
///
/// Each iteration evaluates the loss and gradient, logs the loss at `info`,
/// and takes one Adam step. The loop runs `max_iters` iterations, or stops
/// once the loss changes by less than `tolerance`. The returned process is
/// refit at the final parameters and is in [`Mode::Eval`].
pub fn fit<P>(
    mut process: P,
    params: &TrainParams,
) -> Result<(P, TrainReport), TrainError<P::Error>>
where
    P: RandomProcess,
{
    process.set_mode(Mode::Train);

    let mut theta = process.parameters();
    let mut last_good = theta.clone();
    let mut adam = Adam::new(theta.len(), params.adam.clone());
    let mut losses: Vec<f64> = Vec::with_capacity(params.max_iters);
    let mut converged = false;

    for i in 1..=params.max_iters {
        let (loss, grad) = match process.loss_with_parameters(&theta) {
            Ok(res) => res,
            Err(err) if i == 1 => return Err(TrainError::Process(err)),
            Err(err) => {
                warn!(
                    "Iter {}/{} - parameters rejected: {}",
                    i, params.max_iters, err
                );
                return Err(TrainError::Divergence {
                    iteration: i,
                    last_good,
                });
            }
        };
        info!("Iter {}/{} - Loss: {:.3}", i, params.max_iters, loss);

        if !loss.is_finite() || !is_finite(&grad) {
            return Err(TrainError::Divergence {
                iteration: i,
                last_good,
            });
        }
        last_good.copy_from(&theta);

        let prev = losses.last().copied();
        losses.push(loss);
        if let (Some(tol), Some(prev)) = (params.tolerance, prev) {
            if (prev - loss).abs() < tol {
                converged = true;
                break;
            }
        }

        adam.step(&mut theta, &grad);
        if !is_finite(&theta) {
            return Err(TrainError::Divergence {
                iteration: i,
                last_good,
            });
        }
    }
    debug!("final parameters: {}", theta.transpose());

    if let Err(err) = process.set_parameters(&theta) {
        warn!("final parameters rejected: {}", err);
        return Err(TrainError::Divergence {
            iteration: losses.len(),
            last_good,
        });
    }
    process.set_mode(Mode::Eval);

    let report = TrainReport {
        iterations: losses.len(),
        losses,
        converged,
    };
    Ok((process, report))
}
