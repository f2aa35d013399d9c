use crate::error::SimulationError;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::simulation::ColumnSimulation;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Snapshot writer operator
///
/// Emits a full-field snapshot whenever the elapsed simulation time crosses
/// the next multiple of the output frequency. Each snapshot is a
/// tab-delimited file of cell-centered rows (position, theta-blended
/// temperature, ice saturation) named `solution_1d_step_<n>.dat`.
pub struct SnapshotWriterOp {
    pub output_directory: PathBuf,
    pub output_frequency_s: f64,
    output_count: u32,
}

impl SnapshotWriterOp {
    pub fn new(output_directory: PathBuf, output_frequency_s: f64) -> Self {
        Self {
            output_directory,
            output_frequency_s,
            output_count: 0,
        }
    }

    pub fn handle(output_directory: PathBuf, output_frequency_s: f64) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(output_directory, output_frequency_s)))
    }
}

impl SimOp for SnapshotWriterOp {
    fn name(&self) -> &str {
        "SnapshotWriterOp"
    }

    fn init_sim(&mut self, _sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        fs::create_dir_all(&self.output_directory)?;
        Ok(())
    }

    fn update_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        let state = sim.state();
        if self.output_frequency_s == 0.0
            || state.time_s <= self.output_count as f64 * self.output_frequency_s
        {
            return Ok(());
        }

        let filename = self
            .output_directory
            .join(format!("solution_1d_step_{}.dat", state.step));
        let mut file = fs::File::create(filename)?;
        for row in sim.snapshot_field()? {
            writeln!(
                file,
                "{:.6}\t{:.5}\t{:.5}",
                row.position_m, row.temperature_c, row.ice_saturation
            )?;
        }
        self.output_count += 1;
        Ok(())
    }
}
