//! Termination policy of the damped Newton loop.
//!
//! The controller is a two-state machine. It starts `Running` with a zero
//! iteration count and moves to `Done` as soon as either the iteration budget
//! is spent or the last step was no longer than the threshold. The budget is
//! checked first: a step that meets the threshold on the last budgeted
//! iteration still ends as [`Outcome::Exhausted`].

/// Terminal outcome of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Step norm dropped to the threshold within the budget
    Converged,
    /// Iteration budget spent
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Done(Outcome),
}

#[derive(Debug, Clone)]
pub struct ConvergenceController {
    max_iterations: usize,
    threshold: f64,
    iteration: usize,
    last_step_norm: Option<f64>,
    state: ControllerState,
}

impl ConvergenceController {
    /// A zero budget starts (and stays) `Done(Exhausted)`.
    pub fn new(max_iterations: usize, threshold: f64) -> Self {
        let state = if max_iterations == 0 {
            ControllerState::Done(Outcome::Exhausted)
        } else {
            ControllerState::Running
        };
        Self {
            max_iterations,
            threshold,
            iteration: 0,
            last_step_norm: None,
            state,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ControllerState::Running
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Norm of the last recorded step, `None` before the first iteration.
    pub fn last_step_norm(&self) -> Option<f64> {
        self.last_step_norm
    }

    /// Record one completed iteration with step norm `‖new − old‖`.
    ///
    /// A NaN step norm never satisfies the threshold. Calls after `Done` are
    /// ignored.
    pub fn record_step(&mut self, step_norm: f64) -> ControllerState {
        if !self.is_running() {
            return self.state;
        }

        self.iteration += 1;
        self.last_step_norm = Some(step_norm);

        if self.iteration >= self.max_iterations {
            self.state = ControllerState::Done(Outcome::Exhausted);
        } else if step_norm <= self.threshold {
            self.state = ControllerState::Done(Outcome::Converged);
        }
        self.state
    }
}
