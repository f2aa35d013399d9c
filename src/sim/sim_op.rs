mod sim_op_progress_reporter;
mod sim_op_series_writer;
mod sim_op_snapshot_writer;

pub use sim_op_progress_reporter::ProgressReporterOp;
pub use sim_op_series_writer::SeriesWriterOp;
pub use sim_op_snapshot_writer::SnapshotWriterOp;

use crate::error::SimulationError;
use crate::sim::simulation::ColumnSimulation;

/// A diagnostics/output stage run by the controller around the stepping
/// loop. Operators see the simulation after a step has converged and its
/// state snapshot has been advanced; any error they return aborts the run.
pub trait SimOp {
    /// The name of this operator (for identification and lookup)
    fn name(&self) -> &str;

    /// Called once before the first time step
    fn init_sim(&mut self, _sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Called after every accepted time step
    fn update_sim(&mut self, _sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Called once after the last time step
    fn after_sim(&mut self, _sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        Ok(())
    }
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}
