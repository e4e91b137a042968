//! Dense linear solvers for the damped Newton system.
//!
//! Every iteration solves `(H + λ·D) · Δ = g` where `D = diag(H)`. The system
//! is small (11×11) and dense, and `H + λ·D` is not guaranteed to be positive
//! definite, so the backends are general-purpose factorizations:
//! - partial-pivot LU (default)
//! - Householder QR with a rank check

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::core::{HessianMatrix, NUM_PARAMS, ParameterVector};

pub mod lu;
pub mod qr;

pub use lu::DenseLuSolver;
pub use qr::DenseQrSolver;

/// Errors raised by the dense linear solvers
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LinAlgError {
    #[error("{solver}: matrix is singular")]
    SingularMatrix { solver: &'static str },

    #[error("{solver}: solution contains non-finite values")]
    NonFiniteSolution { solver: &'static str },
}

pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Linear solver backend used for the damped system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolverType {
    #[default]
    DenseLu,
    DenseQr,
}

impl fmt::Display for LinearSolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearSolverType::DenseLu => write!(f, "Dense LU"),
            LinearSolverType::DenseQr => write!(f, "Dense QR"),
        }
    }
}

impl FromStr for LinearSolverType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lu" => Ok(LinearSolverType::DenseLu),
            "qr" => Ok(LinearSolverType::DenseQr),
            other => Err(format!("unknown linear solver '{other}', expected 'lu' or 'qr'")),
        }
    }
}

/// Common interface of the dense solvers
pub trait DenseLinearSolver: Send + Sync {
    /// Solve `matrix · x = rhs`.
    fn solve(&mut self, matrix: &HessianMatrix, rhs: &ParameterVector)
    -> LinAlgResult<ParameterVector>;

    fn name(&self) -> &'static str;

    /// Solve the damped system `(H + λ·diag(H)) · Δ = g`.
    fn solve_damped(
        &mut self,
        hessian: &HessianMatrix,
        gradient: &ParameterVector,
        damping: f64,
    ) -> LinAlgResult<ParameterVector> {
        self.solve(&damped_system(hessian, damping), gradient)
    }
}

/// Create the solver backend for `solver_type`.
pub fn create_linear_solver(solver_type: LinearSolverType) -> Box<dyn DenseLinearSolver> {
    match solver_type {
        LinearSolverType::DenseLu => Box::new(DenseLuSolver::new()),
        LinearSolverType::DenseQr => Box::new(DenseQrSolver::new()),
    }
}

/// `H + λ·D` with `D` the diagonal of `H`.
pub fn damped_system(hessian: &HessianMatrix, damping: f64) -> HessianMatrix {
    let mut system = *hessian;
    for i in 0..NUM_PARAMS {
        system[(i, i)] += damping * hessian[(i, i)];
    }
    system
}

pub(crate) fn check_finite(
    solution: ParameterVector,
    solver: &'static str,
) -> LinAlgResult<ParameterVector> {
    if solution.iter().all(|v| v.is_finite()) {
        Ok(solution)
    } else {
        Err(LinAlgError::NonFiniteSolution { solver })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Well-conditioned, non-symmetric test system
    pub(crate) fn test_system() -> (HessianMatrix, ParameterVector) {
        let matrix = HessianMatrix::from_fn(|i, j| {
            if i == j {
                10.0 + i as f64
            } else {
                0.1 * (i as f64 - j as f64) + 0.05
            }
        });
        let rhs = ParameterVector::from_fn(|i, _| i as f64 - 4.0);
        (matrix, rhs)
    }

    #[test]
    fn test_damped_system_scales_diagonal_only() {
        let (matrix, _) = test_system();
        let damped = damped_system(&matrix, 0.1);
        for i in 0..NUM_PARAMS {
            for j in 0..NUM_PARAMS {
                let expected = if i == j {
                    1.1 * matrix[(i, j)]
                } else {
                    matrix[(i, j)]
                };
                assert!((damped[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_backends_agree() {
        let (matrix, rhs) = test_system();
        let x_lu = DenseLuSolver::new().solve(&matrix, &rhs).unwrap();
        let x_qr = DenseQrSolver::new().solve(&matrix, &rhs).unwrap();
        assert!((x_lu - x_qr).norm() < 1e-10);
        assert!((matrix * x_lu - rhs).norm() < 1e-10);
    }

    #[test]
    fn test_backends_report_singular() {
        let matrix = HessianMatrix::zeros();
        let rhs = ParameterVector::repeat(1.0);
        for solver_type in [LinearSolverType::DenseLu, LinearSolverType::DenseQr] {
            let mut solver = create_linear_solver(solver_type);
            assert!(solver.solve(&matrix, &rhs).is_err(), "{solver_type}");
        }
    }

    #[test]
    fn test_solver_type_from_str() {
        assert_eq!("lu".parse::<LinearSolverType>(), Ok(LinearSolverType::DenseLu));
        assert_eq!("QR".parse::<LinearSolverType>(), Ok(LinearSolverType::DenseQr));
        assert!("cholesky".parse::<LinearSolverType>().is_err());
    }

    #[test]
    fn test_factory_names() {
        assert_eq!(create_linear_solver(LinearSolverType::DenseLu).name(), "DenseLU");
        assert_eq!(create_linear_solver(LinearSolverType::DenseQr).name(), "DenseQR");
    }
}
