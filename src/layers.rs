// src/layers.rs - Layer stack: maps a 1-D mesh coordinate to the porous
// medium active at that depth.

use crate::error::SimulationError;
use crate::material::{ConductivityModel, MaterialSample};

/// One depth interval of the column with uniform composition.
///
/// `depth_top_m` and `thickness_m` are positive depths below the surface;
/// mesh coordinates run negative downward (the surface is at x = 0). The
/// deepest layer of a stack is treated as semi-infinite.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub material: MaterialSample,
    pub porosity: f64,
    pub degree_of_saturation: f64,
    pub model: ConductivityModel,
    pub depth_top_m: f64,
    pub thickness_m: f64,
}

impl LayerSpec {
    fn depth_bottom_m(&self) -> f64 {
        self.depth_top_m + self.thickness_m
    }
}

/// Invariant-checked per-cell coefficient set handed to the assembly loop.
#[derive(Debug, Clone, Copy)]
pub struct CellCoefficients {
    pub thermal_conductivity: f64,
    pub volumetric_heat_capacity: f64,
    pub ice_saturation: f64,
}

/// The medium resolved at one position: a borrowed material sample plus the
/// owning layer's composition and homogenization relationship.
#[derive(Debug, Clone, Copy)]
pub struct LayerMedium<'a> {
    pub sample: &'a MaterialSample,
    pub porosity: f64,
    pub degree_of_saturation: f64,
    pub model: ConductivityModel,
    pub layer_index: usize,
}

impl LayerMedium<'_> {
    pub fn thermal_conductivity(&self) -> f64 {
        self.sample
            .thermal_conductivity(self.model, self.porosity, self.degree_of_saturation)
    }

    pub fn volumetric_heat_capacity(&self, temperature_c: f64) -> f64 {
        self.sample
            .volumetric_heat_capacity(self.porosity, self.degree_of_saturation, temperature_c)
    }

    pub fn thermal_energy(&self, temperature_c: f64) -> f64 {
        self.sample
            .thermal_energy(self.porosity, self.degree_of_saturation, temperature_c)
    }

    pub fn ice_saturation(&self, temperature_c: f64) -> f64 {
        self.sample.degree_of_saturation_ice(temperature_c)
    }

    /// Evaluate the coefficients the FE assembly needs, rejecting negative
    /// or non-finite values with the offending inputs attached.
    pub fn coefficients(
        &self,
        position_m: f64,
        temperature_c: f64,
    ) -> Result<CellCoefficients, SimulationError> {
        let thermal_conductivity = self.thermal_conductivity();
        let volumetric_heat_capacity = self.volumetric_heat_capacity(temperature_c);
        let ice_saturation = self.ice_saturation(temperature_c);

        if !thermal_conductivity.is_finite()
            || !volumetric_heat_capacity.is_finite()
            || thermal_conductivity <= 0.0
            || volumetric_heat_capacity <= 0.0
        {
            return Err(SimulationError::PhysicalInvariant {
                position_m,
                temperature_c,
                ice_saturation,
                thermal_conductivity,
                volumetric_heat_capacity,
            });
        }

        Ok(CellCoefficients {
            thermal_conductivity,
            volumetric_heat_capacity,
            ice_saturation,
        })
    }
}

/// Ordered, gap-free sequence of layers. Built once at configuration time
/// and immutable afterwards; resolution is a linear scan over the (few)
/// layers.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<LayerSpec>,
}

impl LayerStack {
    pub fn new(layers: Vec<LayerSpec>) -> Result<Self, SimulationError> {
        if layers.is_empty() {
            return Err(SimulationError::config("layer stack is empty"));
        }
        for (i, layer) in layers.iter().enumerate() {
            if !(0.0..=1.0).contains(&layer.porosity) {
                return Err(SimulationError::config(format!(
                    "layer {i} ('{}'): porosity {} outside [0, 1]",
                    layer.name, layer.porosity
                )));
            }
            if !(0.0..=1.0).contains(&layer.degree_of_saturation) {
                return Err(SimulationError::config(format!(
                    "layer {i} ('{}'): degree of saturation {} outside [0, 1]",
                    layer.name, layer.degree_of_saturation
                )));
            }
            if layer.thickness_m <= 0.0 {
                return Err(SimulationError::config(format!(
                    "layer {i} ('{}'): thickness {} must be positive",
                    layer.name, layer.thickness_m
                )));
            }
        }
        if layers[0].depth_top_m != 0.0 {
            return Err(SimulationError::config(format!(
                "first layer must start at the surface, starts at {} m",
                layers[0].depth_top_m
            )));
        }
        for i in 1..layers.len() {
            let expected = layers[i - 1].depth_bottom_m();
            if (layers[i].depth_top_m - expected).abs() > 1e-9 {
                return Err(SimulationError::config(format!(
                    "layer {i} ('{}') starts at {} m, expected {} m (layers must \
                     partition the column with no gaps)",
                    layers[i].name, layers[i].depth_top_m, expected
                )));
            }
        }
        Ok(LayerStack { layers })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Resolve the medium at a mesh coordinate (x <= 0 inside the column).
    ///
    /// Intervals are checked from shallowest to deepest. A position exactly
    /// on an interface belongs to the deeper layer; the first layer has no
    /// upper bound and the deepest layer extends downward without limit.
    pub fn resolve(&self, position_m: f64) -> Result<LayerMedium<'_>, SimulationError> {
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let above_bottom = position_m > -layer.depth_bottom_m();
            let below_top = position_m <= -layer.depth_top_m;
            let matches = match (i == 0, i == last) {
                (true, true) => true,
                (true, false) => above_bottom,
                (false, true) => below_top,
                (false, false) => below_top && above_bottom,
            };
            if matches {
                return Ok(LayerMedium {
                    sample: &layer.material,
                    porosity: layer.porosity,
                    degree_of_saturation: layer.degree_of_saturation,
                    model: layer.model,
                    layer_index: i,
                });
            }
        }
        Err(SimulationError::PositionOutOfRange { position_m })
    }
}
