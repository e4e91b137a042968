use nalgebra::Point3;

use super::{DerivativeProvider, PointDerivatives};
use crate::core::superquadric::residual;
use crate::core::{NUM_PARAMS, ParameterVector, SuperquadricParams};

/// Derivatives of the squared superquadric residual `r²` of one point.
///
/// `∇r` is taken by central differences with a step relative to each
/// parameter's magnitude. The gradient is `2·r·∇r` and the Hessian uses the
/// Gauss-Newton form `2·∇r·∇rᵀ`, which drops the `r·∇²r` term and is exact for
/// points on the surface.
#[derive(Debug, Clone)]
pub struct SuperquadricFactor {
    relative_step: f64,
}

impl SuperquadricFactor {
    pub fn new() -> Self {
        Self {
            relative_step: 1e-7,
        }
    }

    /// Residual of `point` and its gradient with respect to the 11 parameters.
    pub fn linearize(
        &self,
        params: &ParameterVector,
        point: &Point3<f64>,
    ) -> (f64, ParameterVector) {
        let r = residual(&SuperquadricParams::from_vector(params), point);

        let mut jacobian = ParameterVector::zeros();
        for i in 0..NUM_PARAMS {
            let h = self.relative_step * params[i].abs().max(1.0);
            let mut plus = *params;
            let mut minus = *params;
            plus[i] += h;
            minus[i] -= h;

            let r_plus = residual(&SuperquadricParams::from_vector(&plus), point);
            let r_minus = residual(&SuperquadricParams::from_vector(&minus), point);
            jacobian[i] = (r_plus - r_minus) / (2.0 * h);
        }

        (r, jacobian)
    }
}

impl Default for SuperquadricFactor {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivativeProvider for SuperquadricFactor {
    fn derivatives(&self, params: &ParameterVector, point: &Point3<f64>) -> PointDerivatives {
        let (r, jacobian) = self.linearize(params, point);
        let gradient = jacobian * (2.0 * r);
        let hessian = jacobian * jacobian.transpose() * 2.0;
        (gradient, hessian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::superquadric::surface_point;

    fn reference() -> SuperquadricParams {
        SuperquadricParams::new([1.0, 0.7, 0.5], [0.6, 0.9], [0.5, -0.3, 1.2], [0.2, -0.1, 0.35])
    }

    #[test]
    fn test_surface_point_has_zero_gradient() {
        let params = reference();
        let point = surface_point(&params, 0.3, 1.1);
        let (gradient, hessian) =
            SuperquadricFactor::new().derivatives(&params.to_vector(), &point);

        assert!(gradient.norm() < 1e-6);
        assert!(hessian.iter().all(|v| v.is_finite()));
        // Gauss-Newton Hessian is symmetric positive semi-definite
        assert!((hessian - hessian.transpose()).norm() < 1e-12);
        for i in 0..NUM_PARAMS {
            assert!(hessian[(i, i)] >= 0.0);
        }
    }

    #[test]
    fn test_gradient_matches_squared_residual_difference() {
        let params = reference().to_vector();
        let point = Point3::new(1.4, -0.2, 1.5);
        let factor = SuperquadricFactor::new();
        let (gradient, _) = factor.derivatives(&params, &point);

        let epsilon = 1e-6;
        for i in 0..NUM_PARAMS {
            let mut plus = params;
            let mut minus = params;
            plus[i] += epsilon;
            minus[i] -= epsilon;
            let e_plus = residual(&SuperquadricParams::from_vector(&plus), &point).powi(2);
            let e_minus = residual(&SuperquadricParams::from_vector(&minus), &point).powi(2);
            let fd = (e_plus - e_minus) / (2.0 * epsilon);
            assert!(
                (gradient[i] - fd).abs() < 1e-4 * fd.abs().max(1.0),
                "gradient mismatch at {i}: {} vs {fd}",
                gradient[i]
            );
        }
    }

    #[test]
    fn test_degenerate_size_yields_non_finite_entries() {
        let mut params = reference();
        params.a1 = 0.0;
        let point = Point3::new(0.9, 0.1, 1.0);
        let (gradient, _) = SuperquadricFactor::new().derivatives(&params.to_vector(), &point);
        assert!(gradient.iter().any(|v| !v.is_finite()));
    }
}
