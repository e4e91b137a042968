use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::{IterationState, ObserverResult, OptObserver};

/// One row of an optimization trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub step_norm: f64,
    pub gradient_norm: f64,
    pub degenerate_contributions: usize,
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

impl From<&IterationState<'_>> for IterationRecord {
    fn from(state: &IterationState<'_>) -> Self {
        let p = state.parameters;
        Self {
            iteration: state.iteration,
            step_norm: state.step_norm,
            gradient_norm: state.gradient_norm,
            degenerate_contributions: state.degenerate_contributions,
            a1: p[0],
            a2: p[1],
            a3: p[2],
            e1: p[3],
            e2: p[4],
            px: p[5],
            py: p[6],
            pz: p[7],
            ra: p[8],
            pa: p[9],
            ya: p[10],
        }
    }
}

/// Records every iteration and exports the trace as CSV
#[derive(Debug, Default)]
pub struct TraceRecorder {
    records: Mutex<Vec<IterationRecord>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<IterationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the recorded rows.
    pub fn records(&self) -> Vec<IterationRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Write the trace as CSV with a header row.
    pub fn write_to<W: Write>(&self, writer: W) -> ObserverResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in self.lock().iter() {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> ObserverResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }
}

impl OptObserver for TraceRecorder {
    fn on_step(&self, state: &IterationState<'_>) {
        self.lock().push(IterationRecord::from(state));
    }
}
