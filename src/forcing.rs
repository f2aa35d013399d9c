// src/forcing.rs - Time-dependent boundary data: room/surface temperatures
// and the optional point-source magnitude, sampled at the old and new time
// levels of each step.

use crate::constants::*;
use crate::error::SimulationError;
use crate::tables::InterpolationTable;
use std::f64::consts::PI;

/// Boundary scalars for the step about to be solved, sampled at the previous
/// and current time instants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForcingSample {
    pub old_room_temperature_c: f64,
    pub new_room_temperature_c: f64,
    pub old_surface_temperature_c: f64,
    pub new_surface_temperature_c: f64,
    pub old_point_source_magnitude: f64,
    pub new_point_source_magnitude: f64,
}

fn diurnal_wave(mean: f64, amplitude: f64, period_s: f64, phase_shift_s: f64, t_s: f64) -> f64 {
    mean + amplitude * ((2.0 * PI / period_s) * (t_s - phase_shift_s)).cos()
}

/// Source of the room and surface temperature series. Both the tabulated and
/// the analytic path are first-class strategies selected in configuration.
#[derive(Debug, Clone)]
pub enum ForcingStrategy {
    /// Interpolated from a tabulated time series (time, surface, room).
    Tabulated {
        surface: InterpolationTable,
        room: InterpolationTable,
    },
    /// Sinusoidal diurnal model.
    Diurnal {
        mean_c: f64,
        amplitude_c: f64,
        period_s: f64,
        phase_shift_s: f64,
    },
}

impl ForcingStrategy {
    /// The reference diurnal model: 15 + 10*cos(2*pi/86400 * (t - 54000)).
    pub fn diurnal_reference() -> Self {
        ForcingStrategy::Diurnal {
            mean_c: DIURNAL_MEAN_C,
            amplitude_c: DIURNAL_AMPLITUDE_C,
            period_s: DIURNAL_PERIOD_S,
            phase_shift_s: DIURNAL_PHASE_SHIFT_S,
        }
    }

    /// (room, surface) temperatures at time `t_s`.
    fn temperatures_at(&self, t_s: f64) -> Result<(f64, f64), SimulationError> {
        match self {
            ForcingStrategy::Tabulated { surface, room } => {
                Ok((room.interpolate(t_s)?, surface.interpolate(t_s)?))
            }
            ForcingStrategy::Diurnal {
                mean_c,
                amplitude_c,
                period_s,
                phase_shift_s,
            } => {
                let value = diurnal_wave(*mean_c, *amplitude_c, *period_s, *phase_shift_s, t_s);
                Ok((value, value))
            }
        }
    }
}

/// Interior point source: fixed depth, tabulated time-varying magnitude,
/// optionally modulated by the diurnal sine as in the reference run.
#[derive(Debug, Clone)]
pub struct PointSource {
    pub depth_m: f64,
    pub magnitudes: InterpolationTable,
    pub diurnal_modulation: bool,
}

impl PointSource {
    fn magnitude_at(&self, t_s: f64) -> Result<f64, SimulationError> {
        let tabulated = self.magnitudes.interpolate(t_s)?;
        if self.diurnal_modulation {
            Ok(-tabulated * ((2.0 * PI / DIURNAL_PERIOD_S) * (t_s - DIURNAL_PHASE_SHIFT_S)).sin())
        } else {
            Ok(tabulated)
        }
    }
}

/// Supplies old/new boundary scalars for each time step. Pure: `update`
/// computes a fresh [`ForcingSample`] and mutates nothing.
#[derive(Debug, Clone)]
pub struct BoundaryForcing {
    strategy: ForcingStrategy,
    point_source: Option<PointSource>,
    time_step_s: f64,
}

impl BoundaryForcing {
    pub fn new(
        strategy: ForcingStrategy,
        point_source: Option<PointSource>,
        time_step_s: f64,
    ) -> Self {
        BoundaryForcing {
            strategy,
            point_source,
            time_step_s,
        }
    }

    pub fn point_source(&self) -> Option<&PointSource> {
        self.point_source.as_ref()
    }

    /// Boundary scalars for 1-based time step `step`: "old" values at
    /// `(step - 1) * dt`, "new" values at `step * dt`.
    pub fn update(&self, step: u32) -> Result<ForcingSample, SimulationError> {
        let t_old = (step as f64 - 1.0) * self.time_step_s;
        let t_new = step as f64 * self.time_step_s;

        let (old_room, old_surface) = self.strategy.temperatures_at(t_old)?;
        let (new_room, new_surface) = self.strategy.temperatures_at(t_new)?;

        let (old_magnitude, new_magnitude) = match &self.point_source {
            Some(source) => (source.magnitude_at(t_old)?, source.magnitude_at(t_new)?),
            None => (0.0, 0.0),
        };

        Ok(ForcingSample {
            old_room_temperature_c: old_room,
            new_room_temperature_c: new_room,
            old_surface_temperature_c: old_surface,
            new_surface_temperature_c: new_surface,
            old_point_source_magnitude: old_magnitude,
            new_point_source_magnitude: new_magnitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn diurnal_peaks_at_phase_shift() {
        let forcing = BoundaryForcing::new(ForcingStrategy::diurnal_reference(), None, 54_000.0);
        // step 1 -> new values at t = 54000 s, the crest of the wave
        let sample = forcing.update(1).unwrap();
        assert_relative_eq!(sample.new_surface_temperature_c, 25.0, max_relative = 1e-12);
        assert_relative_eq!(sample.new_room_temperature_c, 25.0, max_relative = 1e-12);
    }

    #[test]
    fn old_values_of_step_n_equal_new_values_of_previous_step() {
        let forcing = BoundaryForcing::new(ForcingStrategy::diurnal_reference(), None, 3600.0);
        let previous = forcing.update(4).unwrap();
        let current = forcing.update(5).unwrap();
        assert_eq!(
            current.old_surface_temperature_c,
            previous.new_surface_temperature_c
        );
        assert_eq!(
            current.old_room_temperature_c,
            previous.new_room_temperature_c
        );
    }

    #[test]
    fn tabulated_strategy_interpolates_both_series() {
        let surface =
            InterpolationTable::new(vec![(0.0, 0.0), (7200.0, 10.0)]).unwrap();
        let room = InterpolationTable::new(vec![(0.0, 20.0), (7200.0, 20.0)]).unwrap();
        let forcing = BoundaryForcing::new(
            ForcingStrategy::Tabulated { surface, room },
            None,
            3600.0,
        );
        let sample = forcing.update(1).unwrap();
        assert_relative_eq!(sample.old_surface_temperature_c, 0.0);
        assert_relative_eq!(sample.new_surface_temperature_c, 5.0);
        assert_relative_eq!(sample.new_room_temperature_c, 20.0);
    }

    #[test]
    fn tabulated_strategy_rejects_steps_past_the_table() {
        let surface = InterpolationTable::new(vec![(0.0, 0.0), (3600.0, 1.0)]).unwrap();
        let room = surface.clone();
        let forcing = BoundaryForcing::new(
            ForcingStrategy::Tabulated { surface, room },
            None,
            3600.0,
        );
        assert!(forcing.update(1).is_ok());
        assert!(forcing.update(2).is_err());
    }

    #[test]
    fn point_source_modulation_follows_the_diurnal_sine() {
        let magnitudes =
            InterpolationTable::new(vec![(0.0, 100.0), (200_000.0, 100.0)]).unwrap();
        let source = PointSource {
            depth_m: 0.5,
            magnitudes,
            diurnal_modulation: true,
        };
        let forcing = BoundaryForcing::new(
            ForcingStrategy::diurnal_reference(),
            Some(source),
            (54_000.0 + 21_600.0) / 1.0,
        );
        // new time = 75600 s = phase shift + quarter period: sin = 1, so the
        // modulated magnitude is -100
        let sample = forcing.update(1).unwrap();
        assert_relative_eq!(
            sample.new_point_source_magnitude,
            -100.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn unmodulated_point_source_uses_tabulated_value() {
        let magnitudes = InterpolationTable::new(vec![(0.0, 40.0), (7200.0, 80.0)]).unwrap();
        let source = PointSource {
            depth_m: 0.5,
            magnitudes,
            diurnal_modulation: false,
        };
        let forcing =
            BoundaryForcing::new(ForcingStrategy::diurnal_reference(), Some(source), 3600.0);
        let sample = forcing.update(1).unwrap();
        assert_relative_eq!(sample.old_point_source_magnitude, 40.0);
        assert_relative_eq!(sample.new_point_source_magnitude, 60.0);
    }
}
