use super::{DenseLinearSolver, LinAlgError, LinAlgResult, check_finite};
use crate::core::{HessianMatrix, NUM_PARAMS, ParameterVector};

const NAME: &str = "DenseQR";

/// Householder QR solver.
///
/// More robust than LU on badly scaled systems. Rank deficiency is detected
/// from the diagonal of `R` relative to its largest entry.
#[derive(Debug, Clone)]
pub struct DenseQrSolver {
    rank_tolerance: f64,
}

impl DenseQrSolver {
    pub fn new() -> Self {
        DenseQrSolver {
            rank_tolerance: 1e-12,
        }
    }
}

impl Default for DenseQrSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseLinearSolver for DenseQrSolver {
    fn solve(
        &mut self,
        matrix: &HessianMatrix,
        rhs: &ParameterVector,
    ) -> LinAlgResult<ParameterVector> {
        let qr = matrix.qr();
        let r = qr.r();

        let max_pivot = (0..NUM_PARAMS)
            .map(|i| r[(i, i)].abs())
            .fold(0.0_f64, f64::max);
        let threshold = self.rank_tolerance * max_pivot;
        if max_pivot == 0.0 || (0..NUM_PARAMS).any(|i| r[(i, i)].abs() <= threshold) {
            return Err(LinAlgError::SingularMatrix { solver: NAME });
        }

        let solution = qr
            .solve(rhs)
            .ok_or(LinAlgError::SingularMatrix { solver: NAME })?;
        check_finite(solution, NAME)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
