// src/material.rs - Porous material constitutive model: effective thermal
// conductivity, freezing law, apparent heat capacity and stored energy.

use crate::constants::*;
use crate::error::SimulationError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

/// Homogenization relationship used to estimate the bulk effective
/// conductivity of the multi-phase medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConductivityModel {
    /// Donazzi (1979). Neglects the gas contribution but includes the degree
    /// of saturation, so it is applicable to unsaturated granular media.
    Donazzi,
    /// Haigh (2012) ellipsoidal-inclusion model. Undefined input when the
    /// liquid/solid or gas/solid conductivity ratio approaches 1 (the closed
    /// form divides by `(1 - ratio)^2`); the invariant check at the
    /// coefficient call site catches the resulting non-finite value.
    Haigh,
    /// Returns the solid conductivity unchanged. Meant for non-porous layers
    /// (plastics) or for calibrating the input value directly.
    Bulk,
}

impl ConductivityModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConductivityModel::Donazzi => "donazzi",
            ConductivityModel::Haigh => "haigh",
            ConductivityModel::Bulk => "bulk",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "donazzi" => Some(ConductivityModel::Donazzi),
            "haigh" => Some(ConductivityModel::Haigh),
            "bulk" => Some(ConductivityModel::Bulk),
            _ => None,
        }
    }
}

/// Conductivity / density / specific heat of a single constituent phase.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PhaseProperties {
    pub thermal_conductivity_w_m_k: f64,
    pub density_kg_m3: f64,
    pub specific_heat_j_per_kg_k: f64,
}

/// Freezing-point-depression parameters for the pore liquid.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FreezingLaw {
    pub freezing_point_c: f64,
    pub coefficient_alpha: f64,
    pub reference_temperature_c: f64,
    pub latent_heat_of_fusion_j_per_kg: f64,
}

impl Default for FreezingLaw {
    fn default() -> Self {
        FreezingLaw {
            freezing_point_c: FREEZING_POINT_C,
            coefficient_alpha: FREEZING_COEFFICIENT_ALPHA,
            reference_temperature_c: REFERENCE_TEMPERATURE_C,
            latent_heat_of_fusion_j_per_kg: LATENT_HEAT_OF_FUSION_J_PER_KG,
        }
    }
}

/// Solid-constituent property table, keyed by material name.
pub static SOLID_MATERIALS: Lazy<HashMap<&'static str, PhaseProperties>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("dummy_1", PhaseProperties {
        thermal_conductivity_w_m_k: 1.0,
        density_kg_m3: 2.0,
        specific_heat_j_per_kg_k: 3.0,
    });
    m.insert("dummy_2", PhaseProperties {
        thermal_conductivity_w_m_k: 4.0,
        density_kg_m3: 5.0,
        specific_heat_j_per_kg_k: 6.0,
    });
    m.insert("quartz_1", PhaseProperties {
        thermal_conductivity_w_m_k: 8.79,
        density_kg_m3: 2660.0,
        specific_heat_j_per_kg_k: 2010.0,
    });
    m.insert("pvc_1", PhaseProperties {
        thermal_conductivity_w_m_k: 0.22,
        density_kg_m3: 1200.0,
        specific_heat_j_per_kg_k: 1200.0,
    });
    m.insert("glass_beads", PhaseProperties {
        thermal_conductivity_w_m_k: 0.80,
        density_kg_m3: 2500.0,
        specific_heat_j_per_kg_k: 1175.0,
    });
    m.insert("pvc_2", PhaseProperties {
        thermal_conductivity_w_m_k: 0.16,
        density_kg_m3: 1440.0,
        specific_heat_j_per_kg_k: 900.0,
    });

    m
});

/// Fully parameterized constituent set for one homogeneous porous medium.
///
/// Each sample carries a solid phase plus liquid/gas/ice phases (defaulting
/// to water/air/ice) and a freezing law. Immutable after construction; all
/// thermal operations are pure functions of (porosity, saturation,
/// temperature).
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSample {
    pub solid: PhaseProperties,
    pub liquid: PhaseProperties,
    pub gas: PhaseProperties,
    pub ice: PhaseProperties,
    pub freezing: FreezingLaw,
}

impl MaterialSample {
    /// Look up a named solid constituent; liquid/gas/ice and the freezing
    /// law take the standard water/air/ice defaults.
    pub fn from_name(name: &str) -> Result<Self, SimulationError> {
        let solid = SOLID_MATERIALS
            .get(name)
            .copied()
            .ok_or_else(|| SimulationError::config(format!("unknown material '{name}'")))?;
        Ok(Self::from_solid_properties(solid))
    }

    /// Build a sample from explicit solid-phase properties.
    pub fn from_solid_properties(solid: PhaseProperties) -> Self {
        MaterialSample {
            solid,
            liquid: PhaseProperties {
                thermal_conductivity_w_m_k: LIQUID_THERMAL_CONDUCTIVITY_W_M_K,
                density_kg_m3: LIQUID_DENSITY_KG_M3,
                specific_heat_j_per_kg_k: LIQUID_SPECIFIC_HEAT_J_PER_KG_K,
            },
            gas: PhaseProperties {
                thermal_conductivity_w_m_k: GAS_THERMAL_CONDUCTIVITY_W_M_K,
                density_kg_m3: GAS_DENSITY_KG_M3,
                specific_heat_j_per_kg_k: GAS_SPECIFIC_HEAT_J_PER_KG_K,
            },
            ice: PhaseProperties {
                thermal_conductivity_w_m_k: ICE_THERMAL_CONDUCTIVITY_W_M_K,
                density_kg_m3: ICE_DENSITY_KG_M3,
                specific_heat_j_per_kg_k: ICE_SPECIFIC_HEAT_J_PER_KG_K,
            },
            freezing: FreezingLaw::default(),
        }
    }

    pub fn with_liquid_properties(mut self, liquid: PhaseProperties) -> Self {
        self.liquid = liquid;
        self
    }

    pub fn with_gas_properties(mut self, gas: PhaseProperties) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_ice_properties(mut self, ice: PhaseProperties) -> Self {
        self.ice = ice;
        self
    }

    pub fn with_freezing_law(mut self, freezing: FreezingLaw) -> Self {
        self.freezing = freezing;
        self
    }

    /// Effective thermal conductivity of the medium under the selected
    /// homogenization relationship.
    pub fn thermal_conductivity(
        &self,
        model: ConductivityModel,
        porosity: f64,
        degree_of_saturation: f64,
    ) -> f64 {
        let k_solid = self.solid.thermal_conductivity_w_m_k;
        match model {
            ConductivityModel::Donazzi => {
                let k_liquid = self.liquid.thermal_conductivity_w_m_k;
                1.0 / ((1.0 / k_liquid).powf(porosity)
                    * (1.0 / k_solid).powf(1.0 - porosity)
                    * (DONAZZI_SATURATION_EXPONENT * (1.0 - degree_of_saturation) * porosity)
                        .exp())
            }
            ConductivityModel::Haigh => {
                let void_ratio = porosity / (1.0 - porosity);
                let xi = (2.0 * void_ratio - 1.0) / 3.0;
                let b = (1.0 / 3.0)
                    * ((2.0 * (1.0 + 3.0 * xi) * (1.0 - degree_of_saturation)
                        - (1.0 + xi).powi(3))
                        / (1.0 + xi).powi(3))
                    .acos();
                let x = 0.5 * (1.0 + xi) * (1.0 + b.cos() - 3.0_f64.sqrt() * b.sin());
                let a_w = self.liquid.thermal_conductivity_w_m_k / k_solid;
                let a_a = self.gas.thermal_conductivity_w_m_k / k_solid;

                HAIGH_LEADING_COEFFICIENT
                    * k_solid
                    * (2.0 * (1.0 + xi).powi(2)
                        * ((a_w / (1.0 - a_w).powi(2))
                            * (((1.0 + xi) + (a_w - 1.0) * x) / (xi + a_w)).ln()
                            + (a_a / (1.0 - a_a).powi(2))
                                * ((1.0 + xi) / ((1.0 + xi) + (a_a - 1.0) * x)).ln())
                        + (2.0 * (1.0 + xi) / ((1.0 - a_w) * (1.0 - a_a)))
                            * ((a_w - a_a) * x - (1.0 - a_a) * a_w))
            }
            ConductivityModel::Bulk => k_solid,
        }
    }

    /// Fraction of the pore liquid that is frozen at `temperature_c`.
    ///
    /// Power-law freezing-point depression: `1 - (1 - (T - T_f))^alpha` below
    /// the freezing point, exactly 0 above it. Continuous at `T = T_f` and
    /// monotonically increasing as the temperature drops.
    pub fn degree_of_saturation_ice(&self, temperature_c: f64) -> f64 {
        if temperature_c <= self.freezing.freezing_point_c {
            1.0 - (1.0 - (temperature_c - self.freezing.freezing_point_c))
                .powf(self.freezing.coefficient_alpha)
        } else {
            0.0
        }
    }

    /// Analytic derivative of [`Self::degree_of_saturation_ice`] with respect
    /// to temperature. Feeds the apparent-heat-capacity latent term.
    pub fn degree_of_saturation_ice_derivative(&self, temperature_c: f64) -> f64 {
        if temperature_c <= self.freezing.freezing_point_c {
            self.freezing.coefficient_alpha
                * (1.0 - (temperature_c - self.freezing.freezing_point_c))
                    .powf(self.freezing.coefficient_alpha - 1.0)
        } else {
            0.0
        }
    }

    // Sensible volumetric heat capacity: unfrozen liquid + gas + solid +
    // frozen liquid fractions, each weighted by its volume fraction.
    fn sensible_heat_capacity(
        &self,
        porosity: f64,
        degree_of_saturation: f64,
        temperature_c: f64,
    ) -> f64 {
        let ice_saturation = self.degree_of_saturation_ice(temperature_c);
        (1.0 - ice_saturation)
            * porosity
            * degree_of_saturation
            * self.liquid.specific_heat_j_per_kg_k
            * self.liquid.density_kg_m3
            + porosity
                * self.gas.specific_heat_j_per_kg_k
                * self.gas.density_kg_m3
                * (1.0 - degree_of_saturation)
            + self.solid.specific_heat_j_per_kg_k * self.solid.density_kg_m3 * (1.0 - porosity)
            + porosity
                * degree_of_saturation
                * ice_saturation
                * self.ice.specific_heat_j_per_kg_k
                * self.ice.density_kg_m3
    }

    /// Apparent volumetric heat capacity (J/m3K).
    ///
    /// Sensible capacities of all four fractions plus a latent term
    /// proportional to dSi/dT, which embeds the latent heat released or
    /// absorbed by phase change into a single effective coefficient instead
    /// of tracking a moving freezing front.
    pub fn volumetric_heat_capacity(
        &self,
        porosity: f64,
        degree_of_saturation: f64,
        temperature_c: f64,
    ) -> f64 {
        let hc = self.sensible_heat_capacity(porosity, degree_of_saturation, temperature_c);
        let a = (temperature_c - self.freezing.reference_temperature_c)
            * (degree_of_saturation
                * self.ice.density_kg_m3
                * self.ice.specific_heat_j_per_kg_k
                - degree_of_saturation
                    * self.liquid.density_kg_m3
                    * self.liquid.specific_heat_j_per_kg_k);
        let b = degree_of_saturation
            * self.ice.density_kg_m3
            * self.freezing.latent_heat_of_fusion_j_per_kg;
        hc + porosity * self.degree_of_saturation_ice_derivative(temperature_c) * (a - b)
    }

    /// Stored thermal energy per unit volume (J/m3) relative to the
    /// reference temperature, minus the latent heat bound in the current ice
    /// fraction. Diagnostics only, never used in the solve.
    pub fn thermal_energy(
        &self,
        porosity: f64,
        degree_of_saturation: f64,
        temperature_c: f64,
    ) -> f64 {
        let hc = self.sensible_heat_capacity(porosity, degree_of_saturation, temperature_c);
        hc * (temperature_c - self.freezing.reference_temperature_c)
            - self.freezing.latent_heat_of_fusion_j_per_kg
                * porosity
                * degree_of_saturation
                * self.degree_of_saturation_ice(temperature_c)
                * self.ice.density_kg_m3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use more_asserts::{assert_ge, assert_gt, assert_le};

    fn quartz() -> MaterialSample {
        MaterialSample::from_name("quartz_1").unwrap()
    }

    #[test]
    fn unknown_material_name_is_rejected() {
        let result = MaterialSample::from_name("kryptonite");
        assert!(result.is_err());
    }

    #[test]
    fn relationship_name_round_trip() {
        for model in [
            ConductivityModel::Donazzi,
            ConductivityModel::Haigh,
            ConductivityModel::Bulk,
        ] {
            assert_eq!(ConductivityModel::from_str(model.as_str()), Some(model));
        }
        assert_eq!(ConductivityModel::from_str("johansen"), None);
    }

    #[test]
    fn bulk_returns_solid_conductivity_unchanged() {
        let sample = quartz();
        for (porosity, saturation) in [(0.0, 0.0), (0.3, 0.5), (0.9, 1.0)] {
            assert_eq!(
                sample.thermal_conductivity(ConductivityModel::Bulk, porosity, saturation),
                sample.solid.thermal_conductivity_w_m_k
            );
        }
    }

    #[test]
    fn donazzi_degenerates_to_solid_at_zero_porosity() {
        let sample = quartz();
        assert_relative_eq!(
            sample.thermal_conductivity(ConductivityModel::Donazzi, 0.0, 0.5),
            sample.solid.thermal_conductivity_w_m_k,
            max_relative = 1e-12
        );
    }

    #[test]
    fn donazzi_conductivity_increases_with_saturation() {
        // The exponential drying penalty shrinks as S rises, so effective
        // conductivity must be strictly increasing in S for porous media.
        let sample = quartz();
        let porosity = 0.35;
        let mut previous =
            sample.thermal_conductivity(ConductivityModel::Donazzi, porosity, 0.0);
        for i in 1..=10 {
            let s = i as f64 / 10.0;
            let k = sample.thermal_conductivity(ConductivityModel::Donazzi, porosity, s);
            assert_gt!(k, previous, "k should increase with saturation (S = {s})");
            previous = k;
        }
    }

    #[test]
    fn haigh_conductivity_is_finite_and_positive_for_typical_soil() {
        let sample = quartz();
        let k = sample.thermal_conductivity(ConductivityModel::Haigh, 0.35, 0.6);
        assert!(k.is_finite());
        assert_gt!(k, 0.0);
    }

    #[test]
    fn ice_saturation_zero_above_and_at_freezing_point() {
        let sample = quartz();
        assert_eq!(sample.degree_of_saturation_ice(5.0), 0.0);
        assert_eq!(sample.degree_of_saturation_ice(0.001), 0.0);
        // Continuous at the freezing point: the power law gives exactly 0
        assert_eq!(sample.degree_of_saturation_ice(0.0), 0.0);
    }

    #[test]
    fn ice_saturation_monotone_and_bounded_below_freezing() {
        let sample = quartz();
        let mut previous = 0.0;
        for i in 1..=400 {
            let t = -0.1 * i as f64;
            let si = sample.degree_of_saturation_ice(t);
            assert_ge!(si, 0.0);
            assert_le!(si, 1.0);
            assert_ge!(si, previous, "ice fraction must not decrease as T drops (T = {t})");
            previous = si;
        }
        // Deep freeze approaches full ice saturation
        assert_gt!(sample.degree_of_saturation_ice(-40.0), 0.99);
    }

    #[test]
    fn ice_saturation_derivative_matches_numerical_derivative() {
        let sample = quartz();
        let dt = 1e-6;
        // Sample strictly below the freezing point; the law is not
        // differentiable at the boundary itself. At deep-freeze temperatures
        // the derivative shrinks to ~1e-6 and cancellation dominates the
        // central difference, so the tolerance is relative but not tight.
        for i in 1..=80 {
            let t = -0.5 * i as f64;
            let numerical = (sample.degree_of_saturation_ice(t + dt)
                - sample.degree_of_saturation_ice(t - dt))
                / (2.0 * dt);
            let analytic = sample.degree_of_saturation_ice_derivative(t);
            assert_relative_eq!(analytic, numerical, max_relative = 1e-4);
        }
        assert_eq!(sample.degree_of_saturation_ice_derivative(1.0), 0.0);
    }

    #[test]
    fn volumetric_heat_capacity_positive_over_wide_range() {
        for name in ["quartz_1", "glass_beads", "pvc_1", "pvc_2"] {
            let sample = MaterialSample::from_name(name).unwrap();
            for (porosity, saturation) in [(0.0, 0.0), (0.2, 0.3), (0.4, 0.8), (0.6, 1.0)] {
                for i in 0..=160 {
                    let t = -40.0 + 0.5 * i as f64;
                    let cp = sample.volumetric_heat_capacity(porosity, saturation, t);
                    assert!(
                        cp.is_finite() && cp > 0.0,
                        "Cp = {cp} for {name} at T = {t}, porosity = {porosity}, S = {saturation}"
                    );
                }
            }
        }
    }

    #[test]
    fn thermal_energy_is_sensible_heat_when_unfrozen() {
        let sample = quartz();
        let (porosity, saturation) = (0.35, 0.7);
        let t = 20.0;
        // No ice above freezing, so stored energy is plain Hc * (T - T_ref)
        let hc = sample.volumetric_heat_capacity(porosity, saturation, t);
        let energy = sample.thermal_energy(porosity, saturation, t);
        assert_relative_eq!(energy, hc * t, max_relative = 1e-12);
    }

    #[test]
    fn thermal_energy_drops_when_latent_heat_is_bound_in_ice() {
        let sample = quartz();
        let (porosity, saturation) = (0.35, 0.9);
        let above = sample.thermal_energy(porosity, saturation, 1.0);
        let below = sample.thermal_energy(porosity, saturation, -5.0);
        assert_gt!(above, below);
        assert!(below < 0.0);
    }
}
