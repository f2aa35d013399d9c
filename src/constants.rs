// Physical constants for the frozen-column model. The pore fluid is assumed
// to be water, the gas fraction air and the frozen fraction ice for every
// layer; only the solid constituent varies between layers.

pub const LIQUID_THERMAL_CONDUCTIVITY_W_M_K: f64 = 0.57;
pub const LIQUID_DENSITY_KG_M3: f64 = 1000.0;
pub const LIQUID_SPECIFIC_HEAT_J_PER_KG_K: f64 = 4186.0;

pub const GAS_THERMAL_CONDUCTIVITY_W_M_K: f64 = 0.025;
pub const GAS_DENSITY_KG_M3: f64 = 1.25;
pub const GAS_SPECIFIC_HEAT_J_PER_KG_K: f64 = 1.256;

pub const ICE_THERMAL_CONDUCTIVITY_W_M_K: f64 = 2.22; // @ 0C
pub const ICE_DENSITY_KG_M3: f64 = 920.0; // @ -30C
pub const ICE_SPECIFIC_HEAT_J_PER_KG_K: f64 = 1844.0; // @ -30C

// Freezing-point-depression law defaults
pub const FREEZING_POINT_C: f64 = 0.0;
pub const FREEZING_COEFFICIENT_ALPHA: f64 = -5.0;
pub const REFERENCE_TEMPERATURE_C: f64 = 0.0;
pub const LATENT_HEAT_OF_FUSION_J_PER_KG: f64 = 334_000.0;

// Donazzi (1979) exponential coefficient for the unsaturated pore fraction
pub const DONAZZI_SATURATION_EXPONENT: f64 = 3.08;
// Haigh (2012) leading coefficient
pub const HAIGH_LEADING_COEFFICIENT: f64 = 1.58;

// Analytic diurnal forcing: T(t) = mean + amplitude * cos(2*pi/period * (t - phase))
pub const DIURNAL_PERIOD_S: f64 = 86_400.0;
pub const DIURNAL_MEAN_C: f64 = 15.0;
pub const DIURNAL_AMPLITUDE_C: f64 = 10.0;
pub const DIURNAL_PHASE_SHIFT_S: f64 = 54_000.0;

// Default solver settings
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 5.0e-4;
pub const DEFAULT_MAX_FIXED_POINT_ITERATIONS: u32 = 50;
pub const LINEAR_SOLVE_RELATIVE_TOLERANCE: f64 = 1.0e-8;
// Under-relaxation of the inner fixed-point iterate from the second
// iteration on. The latent-heat spike in the apparent heat capacity makes
// the undamped iteration oscillate around the freezing front.
pub const FIXED_POINT_RELAXATION: f64 = 0.5;

// Default top-boundary values
pub const DEFAULT_CONVECTIVE_COEFFICIENT_W_M2_K: f64 = 10.0;
pub const DEFAULT_FIXED_INBOUND_FLUX_W_M2: f64 = -100.0;
