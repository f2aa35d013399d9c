use crate::error::SimulationError;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::simulation::ColumnSimulation;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Time-series writer operator
///
/// Appends one tab-delimited row per accepted time step:
/// step, elapsed time, the temperature at each configured sample depth, and
/// the column-integrated thermal energy.
pub struct SeriesWriterOp {
    pub file_path: PathBuf,
}

impl SeriesWriterOp {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn handle(file_path: PathBuf) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(file_path)))
    }
}

impl SimOp for SeriesWriterOp {
    fn name(&self) -> &str {
        "SeriesWriterOp"
    }

    fn init_sim(&mut self, _sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        // Truncate any output left over from a previous run
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.file_path)?;
        Ok(())
    }

    fn update_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        let mut file = OpenOptions::new().append(true).open(&self.file_path)?;

        let state = sim.state();
        write!(file, "{}\t{}", state.step, state.time_s)?;
        for temperature in sim.sampled_temperatures()? {
            write!(file, "\t{temperature:.5}")?;
        }
        writeln!(file, "\t{:.5}", state.column_thermal_energy_j)?;
        Ok(())
    }
}
