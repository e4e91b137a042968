//! Accumulation of per-point derivative contributions.
//!
//! One pass evaluates the derivative provider at every sample point and sums
//! the contributions into the global gradient and Hessian. Non-finite entries
//! are skipped individually and reported as [`NonFiniteContribution`]s, so a
//! single degenerate point cannot poison the totals.

use std::fmt;

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::{HessianMatrix, NUM_PARAMS, ParameterVector, PointSource};
use crate::factors::DerivativeProvider;

/// Entry of a per-point contribution that was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContributionEntry {
    /// Gradient entry `i`
    Gradient(usize),
    /// Hessian entry `(row, col)`
    Hessian(usize, usize),
}

/// A non-finite entry detected while accumulating one point's contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonFiniteContribution {
    pub point_index: usize,
    pub entry: ContributionEntry,
}

impl fmt::Display for NonFiniteContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            ContributionEntry::Gradient(i) => {
                write!(f, "[Gradient] non-finite value in ({i}) for point {}", self.point_index)
            }
            ContributionEntry::Hessian(row, col) => write!(
                f,
                "[Hessian] non-finite value in ({row}, {col}) for point {}",
                self.point_index
            ),
        }
    }
}

/// Global gradient and Hessian of one accumulation pass
#[derive(Debug, Clone)]
pub struct Accumulation {
    pub gradient: ParameterVector,
    pub hessian: HessianMatrix,
    /// Skipped entries, ordered by point index
    pub diagnostics: Vec<NonFiniteContribution>,
}

impl Accumulation {
    pub fn zeros() -> Self {
        Self {
            gradient: ParameterVector::zeros(),
            hessian: HessianMatrix::zeros(),
            diagnostics: Vec::new(),
        }
    }

    /// Add one point's contribution entry by entry, skipping non-finite values.
    pub fn add_contribution(
        &mut self,
        point_index: usize,
        gradient: &ParameterVector,
        hessian: &HessianMatrix,
    ) {
        for i in 0..NUM_PARAMS {
            if gradient[i].is_finite() {
                self.gradient[i] += gradient[i];
            } else {
                self.diagnostics.push(NonFiniteContribution {
                    point_index,
                    entry: ContributionEntry::Gradient(i),
                });
            }
        }

        for row in 0..NUM_PARAMS {
            for col in 0..NUM_PARAMS {
                let value = hessian[(row, col)];
                if value.is_finite() {
                    self.hessian[(row, col)] += value;
                } else {
                    self.diagnostics.push(NonFiniteContribution {
                        point_index,
                        entry: ContributionEntry::Hessian(row, col),
                    });
                }
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.gradient += other.gradient;
        self.hessian += other.hessian;
        self.diagnostics.extend(other.diagnostics);
        self
    }
}

/// Sums derivative contributions of a point collection.
pub struct Accumulator<'a, D: ?Sized, S: ?Sized> {
    provider: &'a D,
    points: &'a S,
    parallel: bool,
}

impl<'a, D, S> Accumulator<'a, D, S>
where
    D: DerivativeProvider + ?Sized,
    S: PointSource + ?Sized,
{
    pub fn new(provider: &'a D, points: &'a S) -> Self {
        Self {
            provider,
            points,
            parallel: false,
        }
    }

    /// Evaluate points on the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compute the global gradient and Hessian at `params`.
    ///
    /// Skipped entries are returned in [`Accumulation::diagnostics`], logged
    /// one by one at DEBUG level and summarized at WARN level.
    pub fn evaluate(&self, params: &ParameterVector) -> Accumulation {
        let points = self.points.points();

        let mut accumulation = if self.parallel {
            let mut acc = points
                .par_iter()
                .enumerate()
                .fold(Accumulation::zeros, |mut acc, (index, point)| {
                    self.add_point(&mut acc, params, index, point);
                    acc
                })
                .reduce(Accumulation::zeros, Accumulation::merge);
            acc.diagnostics.sort_unstable();
            acc
        } else {
            points
                .iter()
                .enumerate()
                .fold(Accumulation::zeros(), |mut acc, (index, point)| {
                    self.add_point(&mut acc, params, index, point);
                    acc
                })
        };

        if !accumulation.diagnostics.is_empty() {
            for diagnostic in &accumulation.diagnostics {
                debug!("{}", diagnostic);
            }
            warn!(
                "Skipped {} non-finite derivative entries from {} points",
                accumulation.diagnostics.len(),
                count_points(&accumulation.diagnostics)
            );
        }
        accumulation
    }

    #[inline]
    fn add_point(
        &self,
        acc: &mut Accumulation,
        params: &ParameterVector,
        index: usize,
        point: &Point3<f64>,
    ) {
        let (gradient, hessian) = self.provider.derivatives(params, point);
        acc.add_contribution(index, &gradient, &hessian);
    }
}

/// Number of distinct points in a point-ordered diagnostic list.
fn count_points(diagnostics: &[NonFiniteContribution]) -> usize {
    let mut count = 0;
    let mut last = None;
    for d in diagnostics {
        if last != Some(d.point_index) {
            count += 1;
            last = Some(d.point_index);
        }
    }
    count
}
