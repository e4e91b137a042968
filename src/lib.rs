//! Superquadric fitting by damped Newton minimization.
//!
//! A fit takes a point cloud, an initial [`SuperquadricParams`] guess and a
//! [`DerivativeProvider`](factors::DerivativeProvider), and iterates
//! `θ ← θ − (H + λ·diag(H))⁻¹ g` until the update is small enough or the
//! iteration budget runs out.

pub mod core;
pub mod error;
pub mod factors;
pub mod io;
pub mod linalg;
pub mod logger;
pub mod observers;
pub mod optimizer;

pub use crate::core::{PointCloud, PointSource, SamplerConfig, SuperquadricParams, sample_surface};
pub use error::{SqFitError, SqFitResult};
pub use factors::{DerivativeProvider, SuperquadricFactor};
pub use io::{PcdLoader, PointCloudLoader, XyzLoader, load_point_cloud, write_point_cloud};
pub use logger::{init_logger, init_logger_with_level};
pub use observers::{OptObserver, TraceRecorder};
pub use optimizer::{DampedNewton, MinimizerConfig, OptimizationStatus, SolverResult};
