//! Adaptive moment estimation (Adam)
use log::debug;
use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Parameters for the Adam optimizer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct AdamParams {
    /// Step size
    pub learning_rate: f64,
    /// Decay rate of the first moment estimate
    pub beta1: f64,
    /// Decay rate of the second moment estimate
    pub beta2: f64,
    /// Added to the root of the second moment before division
    pub epsilon: f64,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1E-8,
        }
    }
}

impl AdamParams {
    /// Set the learning rate
    #[must_use]
    pub fn with_learning_rate(self, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..self
        }
    }

    /// Set the moment decay rates
    #[must_use]
    pub fn with_betas(self, beta1: f64, beta2: f64) -> Self {
        Self {
            beta1,
            beta2,
            ..self
        }
    }

    /// Set the denominator epsilon
    #[must_use]
    pub fn with_epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }
}

/// Adam optimizer state for a parameter vector of fixed length
///
/// Implements the bias-corrected update
/// ```text
/// m = β₁ m + (1 - β₁) g
/// v = β₂ v + (1 - β₂) g²
/// θ = θ - lr · m̂ / (√v̂ + ε)
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Adam {
    params: AdamParams,
    first_moment: DVector<f64>,
    second_moment: DVector<f64>,
    t: i32,
}

impl Adam {
    /// Create a new optimizer for `n` parameters
    pub fn new(n: usize, params: AdamParams) -> Self {
        Self {
            params,
            first_moment: DVector::zeros(n),
            second_moment: DVector::zeros(n),
            t: 0,
        }
    }

    /// Parameters of this optimizer
    pub fn params(&self) -> &AdamParams {
        &self.params
    }

    /// Number of steps taken so far
    pub fn steps(&self) -> usize {
        self.t as usize
    }

    /// Clear the moment estimates and the step counter
    pub fn reset(&mut self) {
        self.first_moment.fill(0.0);
        self.second_moment.fill(0.0);
        self.t = 0;
    }

    /// Take one descent step on `theta` given the gradient of the objective
    ///
    /// # Panics
    /// If `theta` or `grad` differ in length from the optimizer state.
    pub fn step(&mut self, theta: &mut DVector<f64>, grad: &DVector<f64>) {
        assert_eq!(theta.len(), self.first_moment.len());
        assert_eq!(grad.len(), self.first_moment.len());

        let AdamParams {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.params;

        self.t += 1;
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        self.first_moment
            .zip_apply(grad, |m, g| *m = beta1 * *m + (1.0 - beta1) * g);
        self.second_moment
            .zip_apply(grad, |v, g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        theta
            .iter_mut()
            .zip(self.first_moment.iter().zip(self.second_moment.iter()))
            .for_each(|(th, (m, v))| {
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                *th -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });

        debug!("adam: t = {}, theta = {}", self.t, theta);
    }
}
