//! Deterministic point sampling on a known superquadric surface.

use std::f64::consts::{FRAC_PI_2, PI};

use super::params::SuperquadricParams;
use super::point_cloud::PointCloud;
use super::superquadric::surface_point;

/// Configuration for [`sample_surface`].
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Number of latitude rings
    pub eta_steps: usize,
    /// Number of samples per ring
    pub omega_steps: usize,
    /// Relative radial perturbation applied to each sample (0 disables noise)
    pub noise_amplitude: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            eta_steps: 10,
            omega_steps: 10,
            noise_amplitude: 0.0,
        }
    }
}

impl SamplerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, eta_steps: usize, omega_steps: usize) -> Self {
        self.eta_steps = eta_steps;
        self.omega_steps = omega_steps;
        self
    }

    pub fn with_noise(mut self, noise_amplitude: f64) -> Self {
        self.noise_amplitude = noise_amplitude;
        self
    }
}

/// Reproducible pseudo-noise in `[-1, 1)` derived from the sample index.
fn index_noise(index: usize) -> f64 {
    let u = ((index * 12345 + 67890) % 10000) as f64 / 10000.0;
    2.0 * u - 1.0
}

/// Sample `eta_steps × omega_steps` points on the surface of `params`.
///
/// Rings are placed at the centers of equal latitude bands so the poles are
/// never sampled repeatedly. Noise scales each sample radially about the
/// shape's center.
pub fn sample_surface(params: &SuperquadricParams, config: &SamplerConfig) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(config.eta_steps * config.omega_steps);
    let center = params.position();

    for i in 0..config.eta_steps {
        let eta = -FRAC_PI_2 + PI * (i as f64 + 0.5) / config.eta_steps as f64;
        for j in 0..config.omega_steps {
            let omega = -PI + 2.0 * PI * j as f64 / config.omega_steps as f64;
            let mut point = surface_point(params, eta, omega);

            if config.noise_amplitude > 0.0 {
                let scale = 1.0 + config.noise_amplitude * index_noise(i * config.omega_steps + j);
                point.coords = center + (point.coords - center) * scale;
            }
            cloud.push(point);
        }
    }

    cloud
}
