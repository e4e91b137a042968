//! Damped Newton (Levenberg-Marquardt style) minimizer.
//!
//! Each iteration:
//! 1. accumulates the global gradient `g` and Hessian `H` over all points,
//! 2. solves `(H + λ·D) · Δ = g` with `D = diag(H)`,
//! 3. updates `θ ← θ − Δ`,
//! 4. stops once `‖Δ‖ ≤ threshold` or the iteration budget is spent.
//!
//! A small `λ` gives nearly pure Newton steps; a large `λ` shrinks them
//! towards gradient descent scaled by the Hessian diagonal.
//!
//! # Example
//!
//! ```no_run
//! use sq_fitter::core::{SamplerConfig, SuperquadricParams, sample_surface};
//! use sq_fitter::factors::SuperquadricFactor;
//! use sq_fitter::optimizer::{DampedNewton, MinimizerConfig};
//!
//! # fn main() -> Result<(), sq_fitter::SqFitError> {
//! let truth = SuperquadricParams::new([1.0, 0.7, 0.5], [0.6, 0.9], [0.0; 3], [0.0; 3]);
//! let cloud = sample_surface(&truth, &SamplerConfig::default());
//!
//! let mut initial = truth;
//! initial.a1 += 0.05;
//!
//! let solver = DampedNewton::with_config(SuperquadricFactor::new(), MinimizerConfig::default());
//! let result = solver.minimize(&cloud, &initial)?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::accumulator::{Accumulator, NonFiniteContribution};
use super::convergence::{ControllerState, ConvergenceController, Outcome};
use super::{ConvergenceInfo, OptimizationStatus, OptimizerError, SolverResult};
use crate::core::{HessianMatrix, ParameterVector, PointSource, SuperquadricParams};
use crate::error::SqFitResult;
use crate::factors::{DerivativeProvider, SuperquadricFactor};
use crate::linalg::{DenseLinearSolver, LinAlgResult, LinearSolverType, create_linear_solver};
use crate::observers::{IterationState, OptObserver, OptObserverVec};

/// What to do when the damped system is singular or its solution is not finite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonFinitePolicy {
    /// Log the failure, let NaN flow into the parameters, and rely on the
    /// iteration budget to end the fit
    #[default]
    Propagate,
    /// End the fit immediately with [`OptimizationStatus::NumericalFailure`]
    /// and return the last finite parameters
    FailFast,
}

/// Configuration of the damped Newton minimizer.
#[derive(Debug, Clone)]
pub struct MinimizerConfig {
    /// Damping coefficient λ applied to the Hessian diagonal
    pub damping_coefficient: f64,
    /// Iteration budget
    pub max_iterations: usize,
    /// Largest step norm `‖θ_new − θ_old‖` considered converged
    pub convergence_threshold: f64,
    /// Backend for the damped system
    pub linear_solver_type: LinearSolverType,
    /// Handling of singular systems and non-finite updates
    pub non_finite_policy: NonFinitePolicy,
    /// Evaluate per-point derivatives on the rayon thread pool
    pub parallel: bool,
    /// Refuse to fit an empty point collection instead of returning the
    /// initial guess as a trivial fixed point
    pub reject_empty_input: bool,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            damping_coefficient: 0.1,
            max_iterations: 1000,
            convergence_threshold: 0.005,
            linear_solver_type: LinearSolverType::default(),
            non_finite_policy: NonFinitePolicy::default(),
            parallel: false,
            reject_empty_input: false,
        }
    }
}

impl MinimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_damping_coefficient(mut self, damping_coefficient: f64) -> Self {
        self.damping_coefficient = damping_coefficient;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, convergence_threshold: f64) -> Self {
        self.convergence_threshold = convergence_threshold;
        self
    }

    pub fn with_linear_solver_type(mut self, linear_solver_type: LinearSolverType) -> Self {
        self.linear_solver_type = linear_solver_type;
        self
    }

    pub fn with_non_finite_policy(mut self, non_finite_policy: NonFinitePolicy) -> Self {
        self.non_finite_policy = non_finite_policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_reject_empty_input(mut self, reject_empty_input: bool) -> Self {
        self.reject_empty_input = reject_empty_input;
        self
    }

    /// Damping and threshold must be finite and non-negative.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !self.damping_coefficient.is_finite() || self.damping_coefficient < 0.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "damping coefficient must be finite and non-negative, got {}",
                self.damping_coefficient
            )));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "convergence threshold must be finite and non-negative, got {}",
                self.convergence_threshold
            )));
        }
        Ok(())
    }
}

impl fmt::Display for MinimizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MinimizerConfig {{ damping_coefficient: {}, max_iterations: {}, convergence_threshold: {}, linear_solver_type: {}, non_finite_policy: {:?}, parallel: {}, reject_empty_input: {} }}",
            self.damping_coefficient,
            self.max_iterations,
            self.convergence_threshold,
            self.linear_solver_type,
            self.non_finite_policy,
            self.parallel,
            self.reject_empty_input
        )
    }
}

/// Solve the damped system for the update `Δ` in `θ_new = θ_old − Δ`.
///
/// A zero gradient yields a zero update without touching the solver, which
/// keeps the all-zero system of an empty point collection well defined.
pub fn compute_update(
    gradient: &ParameterVector,
    hessian: &HessianMatrix,
    damping: f64,
    solver: &mut dyn DenseLinearSolver,
) -> LinAlgResult<ParameterVector> {
    if gradient.iter().all(|g| *g == 0.0) {
        return Ok(ParameterVector::zeros());
    }
    solver.solve_damped(hessian, gradient, damping)
}

/// Damped Newton minimizer over an injected [`DerivativeProvider`].
pub struct DampedNewton<D> {
    config: MinimizerConfig,
    provider: D,
    observers: OptObserverVec,
}

impl<D: DerivativeProvider> DampedNewton<D> {
    /// Create a minimizer with the default configuration.
    pub fn new(provider: D) -> Self {
        Self::with_config(provider, MinimizerConfig::default())
    }

    pub fn with_config(provider: D, config: MinimizerConfig) -> Self {
        Self {
            config,
            provider,
            observers: OptObserverVec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn OptObserver>) {
        self.observers.add(observer);
    }

    /// Refine `initial` against `points`.
    ///
    /// Non-convergence and numerical failure are reported through
    /// [`SolverResult::status`] together with the final parameters. `Err` is
    /// only returned for an invalid configuration, or for an empty point
    /// collection when `reject_empty_input` is set.
    pub fn minimize<S>(
        &self,
        points: &S,
        initial: &SuperquadricParams,
    ) -> SqFitResult<SolverResult>
    where
        S: PointSource + ?Sized,
    {
        self.config.validate()?;

        if points.is_empty() {
            if self.config.reject_empty_input {
                return Err(OptimizerError::EmptyPointCloud.into());
            }
            warn!("Fitting an empty point cloud; the initial guess is a trivial fixed point");
        }

        let start_time = Instant::now();
        let accumulator =
            Accumulator::new(&self.provider, points).with_parallel(self.config.parallel);
        let mut linear_solver = create_linear_solver(self.config.linear_solver_type);
        let mut controller = ConvergenceController::new(
            self.config.max_iterations,
            self.config.convergence_threshold,
        );

        let mut params = initial.to_vector();
        let mut convergence_info = ConvergenceInfo::default();
        let mut diagnostics: Vec<NonFiniteContribution> = Vec::new();
        let mut numerical_failure = false;

        info!(
            "Starting damped Newton fit: {} points, λ = {}, max {} iterations, threshold {}, {} solver",
            points.len(),
            self.config.damping_coefficient,
            self.config.max_iterations,
            self.config.convergence_threshold,
            linear_solver.name()
        );
        info!("Initial guess: {}", initial);

        while controller.is_running() {
            let old_params = params;
            let accumulation = accumulator.evaluate(&old_params);
            convergence_info.gradient_evaluations += 1;
            convergence_info.degenerate_contributions += accumulation.diagnostics.len();
            convergence_info.final_gradient_norm = accumulation.gradient.norm();

            let update = compute_update(
                &accumulation.gradient,
                &accumulation.hessian,
                self.config.damping_coefficient,
                linear_solver.as_mut(),
            );
            diagnostics = accumulation.diagnostics;

            let delta = match update {
                Ok(delta) => delta,
                Err(e) => match self.config.non_finite_policy {
                    NonFinitePolicy::FailFast => {
                        warn!(
                            "Iteration {}: damped system failed ({}), stopping",
                            controller.iteration() + 1,
                            e
                        );
                        numerical_failure = true;
                        break;
                    }
                    NonFinitePolicy::Propagate => {
                        warn!(
                            "Iteration {}: damped system failed ({}), continuing with a non-finite update",
                            controller.iteration() + 1,
                            e
                        );
                        ParameterVector::repeat(f64::NAN)
                    }
                },
            };

            let new_params = old_params - delta;
            if self.config.non_finite_policy == NonFinitePolicy::FailFast
                && !new_params.iter().all(|v| v.is_finite())
            {
                warn!(
                    "Iteration {}: update produced non-finite parameters, stopping",
                    controller.iteration() + 1
                );
                numerical_failure = true;
                break;
            }
            params = new_params;

            let step_norm = (params - old_params).norm();
            convergence_info.final_parameter_update_norm = step_norm;
            if step_norm.is_finite() {
                convergence_info.max_parameter_update_norm =
                    convergence_info.max_parameter_update_norm.max(step_norm);
            }

            controller.record_step(step_norm);
            debug!(
                "Iteration {}: step norm = {:.6e}, gradient norm = {:.6e}",
                controller.iteration(),
                step_norm,
                convergence_info.final_gradient_norm
            );

            self.observers.notify(&IterationState {
                iteration: controller.iteration(),
                parameters: &params,
                step_norm,
                gradient_norm: convergence_info.final_gradient_norm,
                degenerate_contributions: diagnostics.len(),
            });
        }

        let status = if numerical_failure {
            OptimizationStatus::NumericalFailure
        } else {
            match controller.state() {
                ControllerState::Done(Outcome::Converged) => OptimizationStatus::Converged,
                ControllerState::Done(Outcome::Exhausted) | ControllerState::Running => {
                    OptimizationStatus::MaxIterationsReached
                }
            }
        };

        let parameters = SuperquadricParams::from_vector(&params);
        let iterations = controller.iteration();
        match status {
            OptimizationStatus::Converged => {
                info!("Converged in {} iterations", iterations)
            }
            OptimizationStatus::MaxIterationsReached => {
                warn!("Did not converge after {} iterations", iterations)
            }
            OptimizationStatus::NumericalFailure => {
                warn!("Stopped on a numerical failure after {} iterations", iterations)
            }
        }
        info!("Final parameters: {}", parameters);

        self.observers.notify_complete(&parameters, iterations);

        Ok(SolverResult {
            parameters,
            status,
            iterations,
            elapsed_time: start_time.elapsed(),
            convergence_info,
            diagnostics,
        })
    }
}

impl Default for DampedNewton<SuperquadricFactor> {
    fn default() -> Self {
        Self::new(SuperquadricFactor::new())
    }
}
