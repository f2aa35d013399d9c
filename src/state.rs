// src/state.rs - Versioned scalar state of the transient controller.

use crate::forcing::ForcingSample;

/// Scalar snapshot of the controller after an accepted time step.
///
/// A fresh snapshot replaces the previous one once a step converges; nothing
/// here is mutated mid-step, which keeps the stepping loop auditable: every
/// quantity a step used is visible on the state it produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalState {
    pub step: u32,
    pub time_s: f64,
    pub time_step_s: f64,
    pub theta: f64,
    pub forcing: ForcingSample,
    pub column_thermal_energy_j: f64,
    pub fixed_point_iterations: u32,
}

impl ThermalState {
    pub fn initial(time_step_s: f64, theta: f64) -> Self {
        ThermalState {
            step: 0,
            time_s: 0.0,
            time_step_s,
            theta,
            forcing: ForcingSample::default(),
            column_thermal_energy_j: 0.0,
            fixed_point_iterations: 0,
        }
    }

    /// The state after accepting one more step.
    pub fn advanced(
        &self,
        forcing: ForcingSample,
        column_thermal_energy_j: f64,
        fixed_point_iterations: u32,
    ) -> Self {
        ThermalState {
            step: self.step + 1,
            time_s: self.time_s + self.time_step_s,
            time_step_s: self.time_step_s,
            theta: self.theta,
            forcing,
            column_thermal_energy_j,
            fixed_point_iterations,
        }
    }
}
