//! Observer hooks for the damped Newton minimizer.
//!
//! Observers are notified after every completed iteration and once when the
//! fit ends. They receive read-only views; they cannot alter the fit.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sq_fitter::observers::{OptObserverVec, TraceRecorder};
//!
//! let trace = Arc::new(TraceRecorder::new());
//! let mut observers = OptObserverVec::new();
//! observers.add(trace.clone());
//! // ... hand `observers` to the minimizer, then:
//! trace.write_csv("trace.csv").ok();
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::core::{ParameterVector, SuperquadricParams};

pub mod trace;

pub use trace::{IterationRecord, TraceRecorder};

/// Errors raised while exporting observer data
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ObserverError {
    /// Log the error at ERROR level and hand it back.
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

pub type ObserverResult<T> = Result<T, ObserverError>;

/// Snapshot of one completed iteration
#[derive(Debug, Clone, Copy)]
pub struct IterationState<'a> {
    /// 1-based iteration number
    pub iteration: usize,
    /// Parameters after the update
    pub parameters: &'a ParameterVector,
    /// `‖new − old‖`
    pub step_norm: f64,
    /// Norm of the global gradient the step was computed from
    pub gradient_norm: f64,
    /// Number of entries skipped by the accumulator in this iteration
    pub degenerate_contributions: usize,
}

pub trait OptObserver: Send + Sync {
    /// Called after every completed iteration.
    fn on_step(&self, state: &IterationState<'_>);

    /// Called once when the fit ends, whatever the outcome.
    fn on_optimization_complete(&self, _parameters: &SuperquadricParams, _iterations: usize) {}
}

/// Fan-out list of observers
#[derive(Default, Clone)]
pub struct OptObserverVec {
    observers: Vec<Arc<dyn OptObserver>>,
}

impl OptObserverVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: Arc<dyn OptObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&self, state: &IterationState<'_>) {
        for observer in &self.observers {
            observer.on_step(state);
        }
    }

    pub fn notify_complete(&self, parameters: &SuperquadricParams, iterations: usize) {
        for observer in &self.observers {
            observer.on_optimization_complete(parameters, iterations);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        steps: AtomicUsize,
        completed: AtomicUsize,
    }

    impl OptObserver for CountingObserver {
        fn on_step(&self, _state: &IterationState<'_>) {
            self.steps.fetch_add(1, Ordering::SeqCst);
        }

        fn on_optimization_complete(&self, _parameters: &SuperquadricParams, iterations: usize) {
            self.completed.store(iterations, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observer_vec_fans_out() {
        let first = Arc::new(CountingObserver::default());
        let second = Arc::new(CountingObserver::default());
        let mut observers = OptObserverVec::new();
        observers.add(first.clone());
        observers.add(second.clone());
        assert_eq!(observers.len(), 2);

        let params = ParameterVector::zeros();
        let state = IterationState {
            iteration: 1,
            parameters: &params,
            step_norm: 0.5,
            gradient_norm: 1.0,
            degenerate_contributions: 0,
        };
        observers.notify(&state);
        observers.notify(&state);
        observers.notify_complete(&SuperquadricParams::default(), 2);

        for observer in [first, second] {
            assert_eq!(observer.steps.load(Ordering::SeqCst), 2);
            assert_eq!(observer.completed.load(Ordering::SeqCst), 2);
        }
    }
}
