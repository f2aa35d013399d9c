use crate::error::SimulationError;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::simulation::ColumnSimulation;

/// Progress reporter operator
///
/// Prints one terminal line per reported step with the elapsed time, the
/// step size and the number of fixed-point iterations the step needed.
#[derive(Debug, Clone)]
pub struct ProgressReporterOp {
    pub report_interval: u32,
}

impl ProgressReporterOp {
    pub fn new(report_interval: u32) -> Self {
        Self {
            report_interval: report_interval.max(1),
        }
    }

    pub fn handle(report_interval: u32) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(report_interval)))
    }
}

impl SimOp for ProgressReporterOp {
    fn name(&self) -> &str {
        "ProgressReporterOp"
    }

    fn init_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        println!(
            "Starting column simulation: {} layers, {} dofs, {} steps of {} s",
            sim.layers().len(),
            sim.n_dofs(),
            sim.timestep_count(),
            sim.state().time_step_s
        );
        // Effective properties of each layer at 25 C, before any freezing
        for layer in sim.layers().layers() {
            let conductivity = layer.material.thermal_conductivity(
                layer.model,
                layer.porosity,
                layer.degree_of_saturation,
            );
            let heat_capacity = layer.material.volumetric_heat_capacity(
                layer.porosity,
                layer.degree_of_saturation,
                25.0,
            );
            println!(
                "\t{} ({}): k = {:.3} W/mK, C = {:.3} MJ/m3K",
                layer.name,
                layer.model.as_str(),
                conductivity,
                heat_capacity / 1.0e6
            );
        }
        Ok(())
    }

    fn update_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        let state = sim.state();
        if state.step % self.report_interval == 0 {
            println!(
                "Time step {}\ttime: {:.2} min\tDt: {} s\t#it: {}",
                state.step,
                state.time_s / 60.0,
                state.time_step_s,
                state.fixed_point_iterations
            );
        }
        Ok(())
    }

    fn after_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        let state = sim.state();
        println!(
            "Simulation complete: {} steps, {:.2} h simulated, column energy {:.5e} J",
            state.step,
            state.time_s / 3600.0,
            state.column_thermal_energy_j
        );
        Ok(())
    }
}
