// src/config.rs - Run configuration: a JSON file deserialized with serde,
// then validated into the runtime types. Every string-tagged selection is
// converted to a closed enum here so a typo fails at load time, not inside
// the per-cell coefficient loop.

use crate::constants::*;
use crate::error::SimulationError;
use crate::forcing::{BoundaryForcing, ForcingStrategy, PointSource};
use crate::layers::{LayerSpec, LayerStack};
use crate::material::{ConductivityModel, FreezingLaw, MaterialSample, PhaseProperties};
use crate::tables::{read_numeric_table, InterpolationTable};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-surface boundary condition, validated from the configuration's
/// "first" / "second" / "third" selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopBoundary {
    /// Dirichlet: the theta-blended surface temperature is imposed directly.
    FirstKind,
    /// Fixed inbound flux (W/m2).
    SecondKind { inbound_flux_w_m2: f64 },
    /// Convective exchange with the surface-temperature series:
    /// h*(T_surface - T) enters the matrix (outbound) and rhs (inbound).
    ThirdKind { convective_coefficient_w_m2_k: f64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopBoundaryConfig {
    pub kind: String,
    pub inbound_flux_w_m2: Option<f64>,
    pub convective_coefficient_w_m2_k: Option<f64>,
}

/// Solid constituent selection: a named table entry or explicit properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaterialConfig {
    Named(String),
    Explicit {
        thermal_conductivity_w_m_k: f64,
        density_kg_m3: f64,
        specific_heat_j_per_kg_k: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub material: MaterialConfig,
    pub porosity: f64,
    pub degree_of_saturation: f64,
    pub relationship: String,
    pub depth_m: f64,
    pub thickness_m: f64,
    #[serde(default)]
    pub liquid: Option<PhaseProperties>,
    #[serde(default)]
    pub gas: Option<PhaseProperties>,
    #[serde(default)]
    pub ice: Option<PhaseProperties>,
    #[serde(default)]
    pub freezing: Option<FreezingLaw>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForcingConfig {
    /// "diurnal" (analytic sinusoidal model) or "tabulated" (file with
    /// time / surface / room columns).
    pub kind: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointSourceConfig {
    pub depth_m: f64,
    pub file: PathBuf,
    #[serde(default = "default_true")]
    pub diurnal_modulation: bool,
}

fn default_true() -> bool {
    true
}

fn default_tolerance() -> f64 {
    DEFAULT_CONVERGENCE_TOLERANCE
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_FIXED_POINT_ITERATIONS
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub domain_size_m: f64,
    pub refinement_level: u32,
    pub time_step_s: f64,
    pub timestep_count: u32,
    pub theta: f64,
    #[serde(default = "default_tolerance")]
    pub convergence_tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_fixed_point_iterations: u32,
    pub top_boundary: TopBoundaryConfig,
    #[serde(default)]
    pub bottom_fixed_value_c: Option<f64>,
    /// Volumetric room-coupling coefficient (W/m3K); 0 disables the term.
    #[serde(default)]
    pub heat_loss_factor_w_m3_k: f64,
    pub layers: Vec<LayerConfig>,
    pub forcing: ForcingConfig,
    #[serde(default)]
    pub point_source: Option<PointSourceConfig>,
    pub depths_file: PathBuf,
    pub initial_condition_file: PathBuf,
    pub output_file: PathBuf,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    /// Snapshot emission period in seconds; 0 disables snapshots.
    #[serde(default)]
    pub output_frequency_s: f64,
    #[serde(default)]
    pub output_data_in_terminal: bool,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SimulationError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| SimulationError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(SimulationError::config(format!(
                "theta {} outside [0, 1]",
                self.theta
            )));
        }
        if self.time_step_s <= 0.0 {
            return Err(SimulationError::config(format!(
                "time step {} must be positive",
                self.time_step_s
            )));
        }
        if self.timestep_count == 0 {
            return Err(SimulationError::config("timestep count must be at least 1"));
        }
        if self.max_fixed_point_iterations == 0 {
            return Err(SimulationError::config(
                "fixed-point iteration cap must be at least 1",
            ));
        }
        if self.convergence_tolerance <= 0.0 {
            return Err(SimulationError::config(format!(
                "convergence tolerance {} must be positive",
                self.convergence_tolerance
            )));
        }
        Ok(())
    }

    /// Resolve the top boundary selector, applying the reference defaults
    /// when the optional values are omitted.
    pub fn top_boundary(&self) -> Result<TopBoundary, SimulationError> {
        match self.top_boundary.kind.as_str() {
            "first" => Ok(TopBoundary::FirstKind),
            "second" => Ok(TopBoundary::SecondKind {
                inbound_flux_w_m2: self
                    .top_boundary
                    .inbound_flux_w_m2
                    .unwrap_or(DEFAULT_FIXED_INBOUND_FLUX_W_M2),
            }),
            "third" => Ok(TopBoundary::ThirdKind {
                convective_coefficient_w_m2_k: self
                    .top_boundary
                    .convective_coefficient_w_m2_k
                    .unwrap_or(DEFAULT_CONVECTIVE_COEFFICIENT_W_M2_K),
            }),
            other => Err(SimulationError::config(format!(
                "unknown top boundary condition '{other}' (expected first/second/third)"
            ))),
        }
    }

    /// Build the validated layer stack, resolving material names and
    /// relationship selectors.
    pub fn build_layer_stack(&self) -> Result<LayerStack, SimulationError> {
        let layers = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let mut material = match &layer.material {
                    MaterialConfig::Named(name) => MaterialSample::from_name(name)?,
                    MaterialConfig::Explicit {
                        thermal_conductivity_w_m_k,
                        density_kg_m3,
                        specific_heat_j_per_kg_k,
                    } => MaterialSample::from_solid_properties(PhaseProperties {
                        thermal_conductivity_w_m_k: *thermal_conductivity_w_m_k,
                        density_kg_m3: *density_kg_m3,
                        specific_heat_j_per_kg_k: *specific_heat_j_per_kg_k,
                    }),
                };
                if let Some(liquid) = layer.liquid {
                    material = material.with_liquid_properties(liquid);
                }
                if let Some(gas) = layer.gas {
                    material = material.with_gas_properties(gas);
                }
                if let Some(ice) = layer.ice {
                    material = material.with_ice_properties(ice);
                }
                if let Some(freezing) = layer.freezing {
                    material = material.with_freezing_law(freezing);
                }
                let model = ConductivityModel::from_str(&layer.relationship).ok_or_else(|| {
                    SimulationError::config(format!(
                        "layer {i}: unknown conductivity relationship '{}'",
                        layer.relationship
                    ))
                })?;
                Ok(LayerSpec {
                    name: layer.name.clone().unwrap_or_else(|| match &layer.material {
                        MaterialConfig::Named(name) => name.clone(),
                        MaterialConfig::Explicit { .. } => format!("layer_{i}"),
                    }),
                    material,
                    porosity: layer.porosity,
                    degree_of_saturation: layer.degree_of_saturation,
                    model,
                    depth_top_m: layer.depth_m,
                    thickness_m: layer.thickness_m,
                })
            })
            .collect::<Result<Vec<_>, SimulationError>>()?;
        LayerStack::new(layers)
    }

    /// Build the boundary forcing provider, loading tabulated series lazily
    /// here (once for the whole run).
    pub fn build_forcing(&self) -> Result<BoundaryForcing, SimulationError> {
        let strategy = match self.forcing.kind.as_str() {
            "diurnal" => ForcingStrategy::diurnal_reference(),
            "tabulated" => {
                let file = self.forcing.file.as_ref().ok_or_else(|| {
                    SimulationError::config("tabulated forcing requires a 'file' entry")
                })?;
                let rows = read_numeric_table(file)?;
                ForcingStrategy::Tabulated {
                    surface: InterpolationTable::from_rows(&rows, 0, 1)?,
                    room: InterpolationTable::from_rows(&rows, 0, 2)?,
                }
            }
            other => Err(SimulationError::config(format!(
                "unknown forcing strategy '{other}' (expected diurnal/tabulated)"
            )))?,
        };

        let point_source = match &self.point_source {
            Some(source) => {
                let rows = read_numeric_table(&source.file)?;
                Some(PointSource {
                    depth_m: source.depth_m,
                    magnitudes: InterpolationTable::from_rows(&rows, 0, 1)?,
                    diurnal_modulation: source.diurnal_modulation,
                })
            }
            None => None,
        };

        Ok(BoundaryForcing::new(strategy, point_source, self.time_step_s))
    }
}
