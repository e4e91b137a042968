//! Per-point derivative providers.
//!
//! The minimizer never evaluates the error functional itself. It asks a
//! [`DerivativeProvider`] for the gradient and Hessian contribution of each
//! sample point and sums them. Any `Fn(&ParameterVector, &Point3<f64>)`
//! closure with the right signature is a provider, which keeps synthetic
//! providers in tests short.

use nalgebra::Point3;

use crate::core::{HessianMatrix, ParameterVector};

pub mod superquadric_factor;

pub use superquadric_factor::SuperquadricFactor;

/// Gradient and Hessian contribution of a single sample point.
pub type PointDerivatives = (ParameterVector, HessianMatrix);

/// Source of per-point gradient and Hessian contributions.
///
/// Implementations must be deterministic and free of side effects. Entries
/// may be non-finite for degenerate configurations (for example a point at
/// the shape's center); the accumulator skips those entries.
pub trait DerivativeProvider: Send + Sync {
    fn derivatives(&self, params: &ParameterVector, point: &Point3<f64>) -> PointDerivatives;
}

impl<F> DerivativeProvider for F
where
    F: Fn(&ParameterVector, &Point3<f64>) -> PointDerivatives + Send + Sync,
{
    fn derivatives(&self, params: &ParameterVector, point: &Point3<f64>) -> PointDerivatives {
        self(params, point)
    }
}
