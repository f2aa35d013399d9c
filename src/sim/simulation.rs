// src/sim/simulation.rs - The transient controller: owns the layer stack,
// the forcing provider and the FE system, and drives the theta-weighted
// stepping loop with a nonlinear fixed-point iteration inside each step.

use crate::config::{SimulationConfig, TopBoundary};
use crate::constants::{FIXED_POINT_RELAXATION, LINEAR_SOLVE_RELATIVE_TOLERANCE};
use crate::error::SimulationError;
use crate::fem::{l2_norm, HeatSystem, Mesh1d};
use crate::forcing::{BoundaryForcing, ForcingSample};
use crate::layers::LayerStack;
use crate::sim::sim_op::{ProgressReporterOp, SeriesWriterOp, SimOpHandle, SnapshotWriterOp};
use crate::state::ThermalState;
use crate::tables::{read_depth_coordinates, InterpolationTable};
use std::mem;

/// One cell-centered row of a full-field snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRow {
    pub position_m: f64,
    pub temperature_c: f64,
    pub ice_saturation: f64,
}

pub struct ColumnSimulation {
    layers: LayerStack,
    forcing: BoundaryForcing,
    system: HeatSystem,
    solution: Vec<f64>,
    old_solution: Vec<f64>,
    previous_iterate: Vec<f64>,
    state: ThermalState,
    ops: Vec<SimOpHandle>,

    timestep_count: u32,
    convergence_tolerance: f64,
    max_fixed_point_iterations: u32,
    top_boundary: TopBoundary,
    bottom_fixed_value_c: Option<f64>,
    heat_loss_factor_w_m3_k: f64,
    point_source_vector: Option<Vec<f64>>,
    sample_depths_m: Vec<f64>,
}

impl ColumnSimulation {
    pub fn new(
        config: &SimulationConfig,
        ops: Vec<SimOpHandle>,
    ) -> Result<Self, SimulationError> {
        let mesh = Mesh1d::new(config.domain_size_m, config.refinement_level)?;
        let system = HeatSystem::new(mesh);

        let layers = config.build_layer_stack()?;
        let forcing = config.build_forcing()?;
        let top_boundary = config.top_boundary()?;
        let sample_depths_m = read_depth_coordinates(&config.depths_file)?;

        // The initial-condition table maps positive depth to temperature;
        // mesh coordinates run negative downward.
        let initial = InterpolationTable::from_file(&config.initial_condition_file, 0, 1)?;
        let solution = system.project(|x| initial.interpolate(-x))?;
        let old_solution = solution.clone();
        let previous_iterate = solution.clone();

        let point_source_vector = match forcing.point_source() {
            Some(source) => Some(system.point_source_vector(-source.depth_m)?),
            None => None,
        };

        Ok(ColumnSimulation {
            layers,
            forcing,
            system,
            solution,
            old_solution,
            previous_iterate,
            state: ThermalState::initial(config.time_step_s, config.theta),
            ops,
            timestep_count: config.timestep_count,
            convergence_tolerance: config.convergence_tolerance,
            max_fixed_point_iterations: config.max_fixed_point_iterations,
            top_boundary,
            bottom_fixed_value_c: config.bottom_fixed_value_c,
            heat_loss_factor_w_m3_k: config.heat_loss_factor_w_m3_k,
            point_source_vector,
            sample_depths_m,
        })
    }

    /// The default output pipeline for a configuration: the time-series
    /// writer always runs, snapshots and terminal reporting only when the
    /// configuration asks for them.
    pub fn standard_ops(config: &SimulationConfig) -> Vec<SimOpHandle> {
        let mut ops = vec![SeriesWriterOp::handle(config.output_file.clone())];
        if let Some(directory) = &config.output_directory {
            if config.output_frequency_s > 0.0 {
                ops.push(SnapshotWriterOp::handle(
                    directory.clone(),
                    config.output_frequency_s,
                ));
            }
        }
        if config.output_data_in_terminal {
            ops.push(ProgressReporterOp::handle(1));
        }
        ops
    }

    pub fn state(&self) -> ThermalState {
        self.state
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn n_dofs(&self) -> usize {
        self.system.n_dofs()
    }

    pub fn timestep_count(&self) -> u32 {
        self.timestep_count
    }

    pub fn sample_depths_m(&self) -> &[f64] {
        &self.sample_depths_m
    }

    pub fn solution(&self) -> &[f64] {
        &self.solution
    }

    /// Temperature at a positive depth below the surface.
    pub fn temperature_at_depth(&self, depth_m: f64) -> Result<f64, SimulationError> {
        self.system.point_value(&self.solution, -depth_m)
    }

    /// Temperatures at the configured sample depths, in file order.
    pub fn sampled_temperatures(&self) -> Result<Vec<f64>, SimulationError> {
        self.sample_depths_m
            .iter()
            .map(|&depth| self.temperature_at_depth(depth))
            .collect()
    }

    /// Cell-centered field rows for snapshot output: position, theta-blended
    /// temperature and the ice saturation of the cell's layer at that
    /// temperature.
    pub fn snapshot_field(&self) -> Result<Vec<SnapshotRow>, SimulationError> {
        let mesh = *self.system.mesh();
        let theta = self.state.theta;
        (0..mesh.n_cells())
            .map(|e| {
                let position_m = mesh.cell_center(e);
                let t_new = 0.5 * (self.solution[e] + self.solution[e + 1]);
                let t_old = 0.5 * (self.old_solution[e] + self.old_solution[e + 1]);
                let temperature_c = theta * t_new + (1.0 - theta) * t_old;
                let medium = self.layers.resolve(position_m)?;
                Ok(SnapshotRow {
                    position_m,
                    temperature_c,
                    ice_saturation: medium.ice_saturation(temperature_c),
                })
            })
            .collect()
    }

    /// Assemble the theta-weighted system with coefficients evaluated at the
    /// current iterate and solve it, overwriting `solution`. Returns the
    /// column-integrated thermal energy of the blended field.
    fn assemble_and_solve(&mut self, forcing: &ForcingSample) -> Result<f64, SimulationError> {
        let mesh = *self.system.mesh();
        let theta = self.state.theta;
        let dt = self.state.time_step_s;

        self.system.begin_assembly();
        let mut column_energy_j = 0.0;

        for e in 0..mesh.n_cells() {
            let center = mesh.cell_center(e);
            let t_old = 0.5 * (self.old_solution[e] + self.old_solution[e + 1]);
            let t_new = 0.5 * (self.solution[e] + self.solution[e + 1]);
            let t_blend = theta * t_new + (1.0 - theta) * t_old;

            let medium = self.layers.resolve(center)?;
            let coefficients = medium.coefficients(center, t_blend)?;
            column_energy_j += mesh.cell_size_m() * medium.thermal_energy(t_blend);

            // Volumetric coupling to the room-temperature series; zero factor
            // turns the term off entirely.
            let source_old =
                -self.heat_loss_factor_w_m3_k * (t_old - forcing.old_room_temperature_c);
            let source_new =
                -self.heat_loss_factor_w_m3_k * (t_new - forcing.new_room_temperature_c);

            self.system.add_cell(
                e,
                coefficients.thermal_conductivity,
                coefficients.volumetric_heat_capacity,
                source_old,
                source_new,
                theta,
                dt,
            );
        }

        match self.top_boundary {
            TopBoundary::FirstKind => {}
            TopBoundary::SecondKind { inbound_flux_w_m2 } => {
                self.system.add_top_boundary_terms(
                    0.0,
                    inbound_flux_w_m2,
                    inbound_flux_w_m2,
                    theta,
                    dt,
                );
            }
            // Convective exchange h*(T_room - T_surface): the outbound part
            // lands on the matrix diagonal, the inbound part on the rhs.
            TopBoundary::ThirdKind {
                convective_coefficient_w_m2_k,
            } => {
                self.system.add_top_boundary_terms(
                    convective_coefficient_w_m2_k,
                    convective_coefficient_w_m2_k * forcing.old_room_temperature_c,
                    convective_coefficient_w_m2_k * forcing.new_room_temperature_c,
                    theta,
                    dt,
                );
            }
        }

        if let Some(source_vector) = &self.point_source_vector {
            let magnitude = forcing.new_point_source_magnitude * theta * dt
                + forcing.old_point_source_magnitude * (1.0 - theta) * dt;
            self.system.add_point_source(source_vector, magnitude);
        }

        self.system.finalize(&self.old_solution, theta, dt);

        if self.top_boundary == TopBoundary::FirstKind {
            let surface = theta * forcing.new_surface_temperature_c
                + (1.0 - theta) * forcing.old_surface_temperature_c;
            let top = self.system.top_node();
            self.system.apply_dirichlet(top, surface);
        }
        if let Some(value) = self.bottom_fixed_value_c {
            let bottom = self.system.bottom_node();
            self.system.apply_dirichlet(bottom, value);
        }

        self.system
            .solve(&mut self.solution, LINEAR_SOLVE_RELATIVE_TOLERANCE)?;
        Ok(column_energy_j)
    }

    /// Fixed-point iteration of one time step: reassemble with coefficients
    /// from the latest iterate until the solution norm settles, or fail with
    /// the iteration count and residual once the cap is hit.
    ///
    /// Iterates after the first are under-relaxed toward the previous one.
    /// The first solve starts from the accepted field and stays exact for
    /// temperature-independent coefficients, so the relaxation only engages
    /// where the nonlinearity actually moves the solution between solves.
    fn converge_step(
        &mut self,
        forcing: &ForcingSample,
    ) -> Result<(f64, u32), SimulationError> {
        let mut iterations = 0u32;
        loop {
            let previous_norm = l2_norm(&self.solution);
            self.previous_iterate.copy_from_slice(&self.solution);
            let column_energy_j = self.assemble_and_solve(forcing)?;
            iterations += 1;

            if iterations > 1 {
                for (value, previous) in
                    self.solution.iter_mut().zip(&self.previous_iterate)
                {
                    *value = FIXED_POINT_RELAXATION * *value
                        + (1.0 - FIXED_POINT_RELAXATION) * previous;
                }
            }

            let current_norm = l2_norm(&self.solution);
            let relative_error = if current_norm == 0.0 {
                0.0
            } else {
                1.0 - (previous_norm / current_norm).abs()
            };

            if relative_error.abs() <= self.convergence_tolerance {
                return Ok((column_energy_j, iterations));
            }
            if iterations >= self.max_fixed_point_iterations {
                return Err(SimulationError::ConvergenceFailure {
                    step: self.state.step + 1,
                    iterations,
                    relative_error,
                });
            }
        }
    }

    fn advance_one_step(&mut self, step: u32) -> Result<(), SimulationError> {
        let forcing = self.forcing.update(step)?;
        let (column_energy_j, iterations) = self.converge_step(&forcing)?;
        self.state = self.state.advanced(forcing, column_energy_j, iterations);
        Ok(())
    }

    /// Run the full transient: init every operator, step `timestep_count`
    /// times with the operators observing each accepted step, then finish.
    /// The operator list is moved out during the loop so operators can take
    /// `&mut self`, and restored before returning on every path.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        let mut ops = mem::take(&mut self.ops);
        let result = self.run_with_ops(&mut ops);
        self.ops = ops;
        result
    }

    fn run_with_ops(&mut self, ops: &mut [SimOpHandle]) -> Result<(), SimulationError> {
        for handle in ops.iter_mut() {
            handle.op.init_sim(self)?;
        }

        for step in 1..=self.timestep_count {
            self.advance_one_step(step)?;
            // Operators see both time levels: old_solution still holds the
            // previously accepted field, so theta-blended diagnostics work.
            for handle in ops.iter_mut() {
                handle.op.update_sim(self)?;
            }
            self.old_solution.copy_from_slice(&self.solution);
        }

        for handle in ops.iter_mut() {
            handle.op.after_sim(self)?;
        }
        Ok(())
    }
}
