//! Superquadric geometry: inside-outside function, fitting residual, surface points.
//!
//! A point is expressed in the shape frame through `x_local = Rᵀ (x − p)` with
//! `R = Rz(ya) · Ry(pa) · Rx(ra)`. In that frame the inside-outside function is
//!
//! ```text
//! F(x, y, z) = (|x/a1|^(2/e2) + |y/a2|^(2/e2))^(e2/e1) + |z/a3|^(2/e1)
//! ```
//!
//! which is `< 1` inside the surface, `1` on it and `> 1` outside.

use nalgebra::{Point3, Vector3};

use super::params::SuperquadricParams;

/// `sign(x) · |x|^p`
#[inline]
pub fn signed_pow(x: f64, p: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x.signum() * x.abs().powf(p)
    }
}

/// Express a world point in the superquadric's local frame.
#[inline]
pub fn to_local(params: &SuperquadricParams, point: &Point3<f64>) -> Vector3<f64> {
    params.rotation().inverse() * (point.coords - params.position())
}

/// Inside-outside function `F` evaluated at a world point.
pub fn inside_outside(params: &SuperquadricParams, point: &Point3<f64>) -> f64 {
    let local = to_local(params, point);
    let xy = (local.x / params.a1).abs().powf(2.0 / params.e2)
        + (local.y / params.a2).abs().powf(2.0 / params.e2);
    xy.powf(params.e2 / params.e1) + (local.z / params.a3).abs().powf(2.0 / params.e1)
}

/// Volume-weighted radial residual `sqrt(a1·a2·a3) · (F^e1 − 1)`.
///
/// Zero for points on the surface. The `F^e1` exponent keeps the residual
/// roughly proportional to the radial distance, and the volume factor stops
/// the fit from inflating the shape to drive `F` towards one.
pub fn residual(params: &SuperquadricParams, point: &Point3<f64>) -> f64 {
    let f = inside_outside(params, point);
    params.size().product().sqrt() * (f.powf(params.e1) - 1.0)
}

/// Surface point at latitude `eta` ∈ [−π/2, π/2] and longitude `omega` ∈ [−π, π].
pub fn surface_point(params: &SuperquadricParams, eta: f64, omega: f64) -> Point3<f64> {
    let cos_eta = signed_pow(eta.cos(), params.e1);
    let local = Vector3::new(
        params.a1 * cos_eta * signed_pow(omega.cos(), params.e2),
        params.a2 * cos_eta * signed_pow(omega.sin(), params.e2),
        params.a3 * signed_pow(eta.sin(), params.e1),
    );
    Point3::from(params.rotation() * local + params.position())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOLERANCE: f64 = 1e-9;

    fn reference() -> SuperquadricParams {
        SuperquadricParams::new([1.2, 0.8, 0.5], [0.7, 1.3], [0.4, -1.0, 2.0], [0.3, -0.2, 0.9])
    }

    #[test]
    fn test_signed_pow() {
        assert_eq!(signed_pow(0.0, 0.5), 0.0);
        assert!((signed_pow(-4.0, 0.5) + 2.0).abs() < TOLERANCE);
        assert!((signed_pow(8.0, 1.0 / 3.0) - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_surface_points_have_zero_residual() {
        let params = reference();
        for i in 0..7 {
            for j in 0..9 {
                let eta = -FRAC_PI_2 + PI * (i as f64 + 0.5) / 7.0;
                let omega = -PI + 2.0 * PI * j as f64 / 9.0;
                let p = surface_point(&params, eta, omega);
                assert!((inside_outside(&params, &p) - 1.0).abs() < 1e-8);
                assert!(residual(&params, &p).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_center_is_inside_and_far_point_outside() {
        let params = reference();
        let center = Point3::from(params.position());
        assert!(inside_outside(&params, &center) < 1.0);
        assert!(residual(&params, &center) < 0.0);

        let far = Point3::new(10.0, 10.0, 10.0);
        assert!(inside_outside(&params, &far) > 1.0);
        assert!(residual(&params, &far) > 0.0);
    }

    #[test]
    fn test_to_local_inverts_pose() {
        let params = reference();
        let local = Vector3::new(0.3, -0.2, 0.1);
        let world = Point3::from(params.rotation() * local + params.position());
        assert!((to_local(&params, &world) - local).norm() < TOLERANCE);
    }
}
