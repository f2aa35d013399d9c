//! Error types for the frozen-column simulation.
//!
//! One variant per failure category: configuration problems, physical
//! invariant violations during coefficient evaluation, fixed-point
//! convergence failure, layer resolution misses and linear-solve failure.
//! Every variant is fatal; `ConvergenceFailure` is kept distinct so a caller
//! can recognise it and retry with a smaller time step.

use std::error::Error;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// Unknown material or relationship name, malformed boundary-condition
    /// selection, missing/unreadable input file, out-of-range interpolation
    /// query. Raised during configuration load or table access.
    Configuration {
        reason: String,
    },
    /// A computed conductivity or volumetric heat capacity came out negative
    /// or non-finite, reported with the inputs that produced it.
    PhysicalInvariant {
        position_m: f64,
        temperature_c: f64,
        ice_saturation: f64,
        thermal_conductivity: f64,
        volumetric_heat_capacity: f64,
    },
    /// The per-step fixed-point iteration did not reach tolerance within the
    /// iteration cap.
    ConvergenceFailure {
        step: u32,
        iterations: u32,
        relative_error: f64,
    },
    /// Layer resolution found no interval containing the position. Cannot
    /// occur for a well-formed stack (the last layer is open-ended) but is
    /// checked defensively.
    PositionOutOfRange {
        position_m: f64,
    },
    /// The conjugate-gradient solve failed to reach its residual tolerance.
    LinearSolveFailed {
        iterations: usize,
        residual: f64,
    },
}

impl SimulationError {
    pub fn config(reason: impl Into<String>) -> Self {
        SimulationError::Configuration {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "configuration error: {reason}"),
            Self::PhysicalInvariant {
                position_m,
                temperature_c,
                ice_saturation,
                thermal_conductivity,
                volumetric_heat_capacity,
            } => write!(
                f,
                "physical invariant violated at x = {position_m} m: \
                 k = {thermal_conductivity} W/mK, Cp = {volumetric_heat_capacity} J/m3K \
                 (T = {temperature_c} C, Si = {ice_saturation})"
            ),
            Self::ConvergenceFailure {
                step,
                iterations,
                relative_error,
            } => write!(
                f,
                "fixed-point iteration for time step {step} did not converge \
                 after {iterations} iterations (relative error {relative_error:.3e})"
            ),
            Self::PositionOutOfRange { position_m } => {
                write!(f, "no layer contains position {position_m} m")
            }
            Self::LinearSolveFailed {
                iterations,
                residual,
            } => write!(
                f,
                "linear solve failed to converge after {iterations} iterations \
                 (residual {residual:.3e})"
            ),
        }
    }
}

impl Error for SimulationError {}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::Configuration {
            reason: format!("i/o error: {err}"),
        }
    }
}
