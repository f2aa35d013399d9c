use frost_column_rust::sim::ColumnSimulation;
use frost_column_rust::SimulationConfig;
use std::env;
use std::process;

fn main() {
    let mut args = env::args().skip(1);
    let config_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: frost-column-rust <config.json>");
            process::exit(1);
        }
    };

    let config = match SimulationConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error loading {config_path}: {e}");
            process::exit(1);
        }
    };

    let ops = ColumnSimulation::standard_ops(&config);
    let mut simulation = match ColumnSimulation::new(&config, ops) {
        Ok(simulation) => simulation,
        Err(e) => {
            eprintln!("error building simulation: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = simulation.run() {
        eprintln!("simulation failed: {e}");
        process::exit(1);
    }
}
