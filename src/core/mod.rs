//! Core types: superquadric parameters, point collections and surface geometry.

pub mod params;
pub mod point_cloud;
pub mod sampler;
pub mod superquadric;

pub use params::{CodecError, HessianMatrix, NUM_PARAMS, ParameterVector, SuperquadricParams};
pub use point_cloud::{PointCloud, PointSource};
pub use sampler::{SamplerConfig, sample_surface};
