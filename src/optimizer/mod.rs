//! Damped Newton minimization of the superquadric fitting error.
//!
//! The pieces of one fit:
//! - [`accumulator`]: global gradient and Hessian from per-point contributions
//! - [`damped_newton`]: the regularized Newton update and the fit loop
//! - [`convergence`]: when to stop

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::core::SuperquadricParams;

pub mod accumulator;
pub mod convergence;
pub mod damped_newton;

pub use accumulator::{Accumulation, Accumulator, ContributionEntry, NonFiniteContribution};
pub use convergence::{ControllerState, ConvergenceController, Outcome};
pub use damped_newton::{DampedNewton, MinimizerConfig, NonFinitePolicy, compute_update};

/// Errors that prevent a fit from starting
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizerError {
    #[error("point cloud is empty")]
    EmptyPointCloud,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Status of a finished fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Step norm dropped to the convergence threshold
    Converged,
    /// Iteration budget exhausted before the threshold was met
    MaxIterationsReached,
    /// Singular or non-finite damped system with [`NonFinitePolicy::FailFast`]
    NumericalFailure,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::Converged => write!(f, "Converged"),
            OptimizationStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            OptimizationStatus::NumericalFailure => write!(f, "Numerical failure"),
        }
    }
}

/// Detailed convergence information.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceInfo {
    /// Norm of the last parameter update (NaN once the parameters are corrupted)
    pub final_parameter_update_norm: f64,
    /// Largest finite parameter update norm seen
    pub max_parameter_update_norm: f64,
    /// Gradient norm of the last accumulation pass
    pub final_gradient_norm: f64,
    /// Accumulation passes performed
    pub gradient_evaluations: usize,
    /// Non-finite entries skipped over the whole fit
    pub degenerate_contributions: usize,
}

impl fmt::Display for ConvergenceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Final update norm: {:.2e}, Max update norm: {:.2e}, Final gradient norm: {:.2e}, Gradient evaluations: {}, Degenerate contributions: {}",
            self.final_parameter_update_norm,
            self.max_parameter_update_norm,
            self.final_gradient_norm,
            self.gradient_evaluations,
            self.degenerate_contributions
        )
    }
}

/// Result of a fit. The parameters are returned whatever the status.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub parameters: SuperquadricParams,
    pub status: OptimizationStatus,
    /// Completed iterations
    pub iterations: usize,
    pub elapsed_time: Duration,
    pub convergence_info: ConvergenceInfo,
    /// Entries skipped in the last accumulation pass
    pub diagnostics: Vec<NonFiniteContribution>,
}

impl SolverResult {
    pub fn is_converged(&self) -> bool {
        self.status == OptimizationStatus::Converged
    }
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Superquadric Fit Summary ===")?;
        writeln!(f, "Status:                    {}", self.status)?;
        writeln!(f, "Iterations:                {}", self.iterations)?;
        writeln!(f, "Total time:                {:?}", self.elapsed_time)?;
        writeln!(f, "Parameters:                {}", self.parameters)?;
        writeln!(f, "{}", self.convergence_info)
    }
}
