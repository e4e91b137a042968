//! Superquadric parameters and their flat-vector codec.
//!
//! The minimizer works on a statically sized [`ParameterVector`] while callers
//! deal with named fields. The mapping between the two is fixed:
//!
//! | index | field | meaning                   |
//! |-------|-------|---------------------------|
//! | 0..3  | a1 a2 a3 | size along local x, y, z |
//! | 3..5  | e1 e2 | shape exponents           |
//! | 5..8  | px py pz | position                |
//! | 8..11 | ra pa ya | roll, pitch, yaw        |

use nalgebra::{Rotation3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of superquadric parameters.
pub const NUM_PARAMS: usize = 11;

/// Flat parameter vector `[a1, a2, a3, e1, e2, px, py, pz, ra, pa, ya]`.
pub type ParameterVector = SVector<f64, NUM_PARAMS>;

/// Dense 11×11 matrix used for Hessians and damped systems.
pub type HessianMatrix = SMatrix<f64, NUM_PARAMS, NUM_PARAMS>;

/// Errors raised when decoding a parameter vector from untyped data
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    #[error("expected {expected} parameter values, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Named superquadric parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SuperquadricParams {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub e1: f64,
    pub e2: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub ra: f64,
    pub pa: f64,
    pub ya: f64,
}

impl SuperquadricParams {
    /// Build from size, shape exponents, position and roll/pitch/yaw.
    pub fn new(size: [f64; 3], exponents: [f64; 2], position: [f64; 3], rpy: [f64; 3]) -> Self {
        Self {
            a1: size[0],
            a2: size[1],
            a3: size[2],
            e1: exponents[0],
            e2: exponents[1],
            px: position[0],
            py: position[1],
            pz: position[2],
            ra: rpy[0],
            pa: rpy[1],
            ya: rpy[2],
        }
    }

    /// Encode into the flat solver vector.
    pub fn to_vector(&self) -> ParameterVector {
        ParameterVector::from_column_slice(&[
            self.a1, self.a2, self.a3, self.e1, self.e2, self.px, self.py, self.pz, self.ra,
            self.pa, self.ya,
        ])
    }

    /// Decode from the flat solver vector.
    pub fn from_vector(v: &ParameterVector) -> Self {
        Self {
            a1: v[0],
            a2: v[1],
            a3: v[2],
            e1: v[3],
            e2: v[4],
            px: v[5],
            py: v[6],
            pz: v[7],
            ra: v[8],
            pa: v[9],
            ya: v[10],
        }
    }

    /// Decode from an untyped slice, which must hold exactly [`NUM_PARAMS`] values.
    pub fn try_from_slice(values: &[f64]) -> Result<Self, CodecError> {
        if values.len() != NUM_PARAMS {
            return Err(CodecError::WrongLength {
                expected: NUM_PARAMS,
                actual: values.len(),
            });
        }
        Ok(Self::from_vector(&ParameterVector::from_column_slice(values)))
    }

    /// Semi-axis lengths `(a1, a2, a3)`.
    pub fn size(&self) -> Vector3<f64> {
        Vector3::new(self.a1, self.a2, self.a3)
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.px, self.py, self.pz)
    }

    /// Rotation from the shape frame to the world frame, `Rz(ya) * Ry(pa) * Rx(ra)`.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.ra, self.pa, self.ya)
    }

    /// True when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|v| v.is_finite())
    }
}

impl From<ParameterVector> for SuperquadricParams {
    fn from(v: ParameterVector) -> Self {
        Self::from_vector(&v)
    }
}

impl From<&SuperquadricParams> for ParameterVector {
    fn from(p: &SuperquadricParams) -> Self {
        p.to_vector()
    }
}

impl fmt::Display for SuperquadricParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SuperquadricParams [ size: ({:.4}, {:.4}, {:.4}), exponents: ({:.4}, {:.4}), position: ({:.4}, {:.4}, {:.4}), rpy: ({:.4}, {:.4}, {:.4}) ]",
            self.a1,
            self.a2,
            self.a3,
            self.e1,
            self.e2,
            self.px,
            self.py,
            self.pz,
            self.ra,
            self.pa,
            self.ya
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_sign() -> SuperquadricParams {
        SuperquadricParams::new(
            [0.3, -1.25, 2.0],
            [0.1, -0.9],
            [-4.5, 0.0, 7.25],
            [-0.5, 1.0, -3.0],
        )
    }

    #[test]
    fn test_field_order_matches_vector_layout() {
        let v = mixed_sign().to_vector();
        let expected = [
            0.3, -1.25, 2.0, 0.1, -0.9, -4.5, 0.0, 7.25, -0.5, 1.0, -3.0,
        ];
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(v[i], *value, "mismatch at index {i}");
        }
    }

    #[test]
    fn test_decode_encode_identity() {
        let all_zero = SuperquadricParams::default();
        let all_one = SuperquadricParams::from_vector(&ParameterVector::repeat(1.0));
        for p in [all_zero, all_one, mixed_sign()] {
            assert_eq!(SuperquadricParams::from_vector(&p.to_vector()), p);
        }
    }

    #[test]
    fn test_encode_decode_identity() {
        let v = ParameterVector::from_fn(|i, _| (i as f64 - 5.0) * 0.75);
        assert_eq!(SuperquadricParams::from(v).to_vector(), v);
    }

    #[test]
    fn test_try_from_slice_rejects_wrong_length() {
        let err = SuperquadricParams::try_from_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            CodecError::WrongLength {
                expected: NUM_PARAMS,
                actual: 3
            }
        );

        let ok = SuperquadricParams::try_from_slice(&[0.0; NUM_PARAMS]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rotation_is_identity_for_zero_angles() {
        let p = SuperquadricParams::new([1.0, 1.0, 1.0], [1.0, 1.0], [0.0; 3], [0.0; 3]);
        let r = p.rotation();
        assert!((r.matrix() - nalgebra::Matrix3::identity()).norm() < 1e-15);
    }

    #[test]
    fn test_is_finite() {
        let mut p = mixed_sign();
        assert!(p.is_finite());
        p.pa = f64::NAN;
        assert!(!p.is_finite());
    }
}
