pub mod config;
pub mod constants;
pub mod error;
pub mod fem;
pub mod forcing;
pub mod layers;
pub mod material;
pub mod math_utils;
pub mod sim;
pub mod state;
pub mod tables;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use sim::ColumnSimulation;
