use super::{DenseLinearSolver, LinAlgError, LinAlgResult, check_finite};
use crate::core::{HessianMatrix, ParameterVector};

const NAME: &str = "DenseLU";

/// Partial-pivot LU solver
#[derive(Debug, Clone, Default)]
pub struct DenseLuSolver;

impl DenseLuSolver {
    pub fn new() -> Self {
        DenseLuSolver
    }
}

impl DenseLinearSolver for DenseLuSolver {
    fn solve(
        &mut self,
        matrix: &HessianMatrix,
        rhs: &ParameterVector,
    ) -> LinAlgResult<ParameterVector> {
        let solution = matrix
            .lu()
            .solve(rhs)
            .ok_or(LinAlgError::SingularMatrix { solver: NAME })?;
        check_finite(solution, NAME)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
