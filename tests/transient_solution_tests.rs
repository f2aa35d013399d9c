// End-to-end runs of the transient controller through the public API, with
// configurations and input tables written to a scratch directory.

use approx::assert_relative_eq;
use frost_column_rust::assert_deviation;
use frost_column_rust::error::SimulationError;
use frost_column_rust::material::MaterialSample;
use frost_column_rust::sim::sim_op::{SimOp, SimOpHandle};
use frost_column_rust::sim::simulation::SnapshotRow;
use frost_column_rust::sim::ColumnSimulation;
use frost_column_rust::SimulationConfig;
use more_asserts::{assert_ge, assert_gt, assert_le, assert_lt};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "frost_column_it_{name}_{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        Scratch { dir }
    }

    fn write(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

/// Shared fixture: a one-metre quartz column with standard input tables.
/// The forcing file holds constant surface and room temperatures, the
/// initial condition is uniform.
fn column_config(
    scratch: &Scratch,
    surface_c: f64,
    initial_c: f64,
    boundary: &str,
    extra: &str,
) -> SimulationConfig {
    let forcing = scratch.write(
        "forcing.dat",
        &format!("0 {surface_c} {surface_c}\n1000000000 {surface_c} {surface_c}\n"),
    );
    let depths = scratch.write("depths.dat", "0 0 0.25\n0 0 0.5\n0 0 0.75\n");
    let initial = scratch.write(
        "initial.dat",
        &format!("0.0 {initial_c}\n1.0 {initial_c}\n"),
    );
    let output = scratch.path("series.dat");

    let json = format!(
        r#"{{
            "domain_size_m": 1.0,
            "refinement_level": 4,
            "time_step_s": 600.0,
            "timestep_count": 20,
            "theta": 1.0,
            "top_boundary": {{ "kind": "{boundary}" }},
            "layers": [
                {{
                    "material": "quartz_1",
                    "porosity": 0.3,
                    "degree_of_saturation": 0.5,
                    "relationship": "donazzi",
                    "depth_m": 0.0,
                    "thickness_m": 1.0
                }}
            ],
            "forcing": {{ "kind": "tabulated", "file": "{forcing}" }},
            "depths_file": "{depths}",
            "initial_condition_file": "{initial}",
            "output_file": "{output}"
            {extra}
        }}"#,
        forcing = forcing.display(),
        depths = depths.display(),
        initial = initial.display(),
        output = output.display(),
    );
    SimulationConfig::from_json(&json).unwrap()
}

fn run(config: &SimulationConfig) -> ColumnSimulation {
    let ops = ColumnSimulation::standard_ops(config);
    let mut simulation = ColumnSimulation::new(config, ops).unwrap();
    simulation.run().unwrap();
    simulation
}

#[test]
fn fixed_cold_surface_cools_the_column_monotonically_in_time() {
    let scratch = Scratch::new("cooling");
    let mut config = column_config(
        &scratch,
        0.0,
        10.0,
        "first",
        r#", "bottom_fixed_value_c": 0.0"#,
    );

    config.timestep_count = 10;
    let halfway = run(&config);
    config.timestep_count = 20;
    let further = run(&config);

    // a quarter column below the cold surface the decay signal is strong
    let upper_halfway = halfway.temperature_at_depth(0.25).unwrap();
    let upper_further = further.temperature_at_depth(0.25).unwrap();
    assert_lt!(upper_halfway, 10.0);
    assert_lt!(upper_further, upper_halfway);
    assert_gt!(upper_further, 0.0);

    // no node may overshoot the initial data anywhere in the column
    for node in further.solution() {
        assert_le!(*node, 10.0 + 1e-6);
        assert_ge!(*node, -1e-6);
    }

    // above freezing the coefficients are constant, so the fixed-point
    // iteration settles almost immediately
    assert_le!(further.state().fixed_point_iterations, 3);
    assert_eq!(further.state().step, 20);
}

#[test]
fn series_writer_emits_one_row_per_step() {
    let scratch = Scratch::new("series");
    let config = column_config(
        &scratch,
        0.0,
        10.0,
        "first",
        r#", "bottom_fixed_value_c": 0.0"#,
    );
    run(&config);

    let content = fs::read_to_string(scratch.path("series.dat")).unwrap();
    let rows: Vec<&str> = content.lines().collect();
    assert_eq!(rows.len(), config.timestep_count as usize);
    for row in rows {
        // step, time, three sample depths, column energy
        assert_eq!(row.split('\t').count(), 6);
    }
}

#[test]
fn steady_uniform_column_reports_its_sensible_energy() {
    let scratch = Scratch::new("energy");
    let config = column_config(
        &scratch,
        10.0,
        10.0,
        "first",
        r#", "bottom_fixed_value_c": 10.0"#,
    );
    let simulation = run(&config);

    for depth in [0.25, 0.5, 0.75] {
        assert_relative_eq!(
            simulation.temperature_at_depth(depth).unwrap(),
            10.0,
            max_relative = 1e-9
        );
    }

    let quartz = MaterialSample::from_name("quartz_1").unwrap();
    let expected = quartz.thermal_energy(0.3, 0.5, 10.0) * 1.0;
    assert_deviation!(
        simulation.state().column_thermal_energy_j,
        expected,
        1e-6,
        "column energy should match the analytic sensible-heat integral"
    );
    assert_eq!(simulation.state().fixed_point_iterations, 1);
}

#[test]
fn outbound_surface_flux_cools_the_top_of_the_column() {
    let scratch = Scratch::new("flux");
    let config = column_config(
        &scratch,
        10.0,
        10.0,
        "second",
        r#", "bottom_fixed_value_c": 10.0"#,
    );
    let simulation = run(&config);

    // default second-kind flux is -100 W/m2, i.e. heat leaving the surface
    let top = simulation.temperature_at_depth(0.01).unwrap();
    let deep = simulation.temperature_at_depth(0.9).unwrap();
    assert_lt!(top, 10.0);
    assert_lt!(top, deep);
}

#[test]
fn convective_exchange_pulls_the_surface_toward_the_air_temperature() {
    let scratch = Scratch::new("convective");
    let config = column_config(
        &scratch,
        25.0,
        10.0,
        "third",
        r#", "bottom_fixed_value_c": 10.0"#,
    );
    let simulation = run(&config);

    let top = simulation.temperature_at_depth(0.01).unwrap();
    assert_gt!(top, 10.0);
    assert_lt!(top, 25.0);
}

#[test]
fn subzero_surface_grows_ice_from_the_top_down() {
    let scratch = Scratch::new("freezing");
    let mut config = column_config(
        &scratch,
        -10.0,
        5.0,
        "first",
        r#", "bottom_fixed_value_c": 5.0"#,
    );
    config.time_step_s = 3600.0;
    config.timestep_count = 50;
    let simulation = run(&config);

    // the damped inner iteration must settle well under the cap even while
    // the latent-heat front is moving
    assert_lt!(
        simulation.state().fixed_point_iterations,
        config.max_fixed_point_iterations
    );

    let rows = simulation.snapshot_field().unwrap();
    let top_cell = rows.last().unwrap();
    let bottom_cell = rows.first().unwrap();

    assert_lt!(top_cell.temperature_c, 0.0);
    assert_gt!(top_cell.ice_saturation, 0.0);
    // the bottom is held above freezing
    assert_gt!(bottom_cell.temperature_c, 0.0);
    assert_eq!(bottom_cell.ice_saturation, 0.0);

    // rows run bottom to top; the column is colder toward the surface, so
    // ice saturation grows upward and stays a valid fraction throughout
    for pair in rows.windows(2) {
        assert_ge!(pair[1].ice_saturation, pair[0].ice_saturation - 1e-9);
    }
    for row in &rows {
        assert_ge!(row.ice_saturation, 0.0);
        assert_le!(row.ice_saturation, 1.0);
    }
}

#[test]
fn interior_point_source_heats_an_otherwise_isolated_column() {
    let scratch = Scratch::new("point_source");
    let magnitudes = scratch.write("source.dat", "0 50\n1000000000 50\n");
    let mut config = column_config(
        &scratch,
        10.0,
        10.0,
        "second",
        &format!(
            r#", "point_source": {{
                   "depth_m": 0.5,
                   "file": "{}",
                   "diurnal_modulation": false
               }}"#,
            magnitudes.display()
        ),
    );
    // neutralize the default outbound flux so the source is the only input
    config.top_boundary.inbound_flux_w_m2 = Some(0.0);
    let simulation = run(&config);

    let at_source = simulation.temperature_at_depth(0.5).unwrap();
    assert_gt!(at_source, 10.0);
    // the peak sits at the source depth
    assert_gt!(at_source, simulation.temperature_at_depth(0.1).unwrap());
    assert_gt!(at_source, simulation.temperature_at_depth(0.9).unwrap());
}

/// Records the nodal field and the snapshot rows at every accepted step.
struct FieldRecorder {
    records: Rc<RefCell<Vec<(Vec<f64>, Vec<SnapshotRow>)>>>,
}

impl SimOp for FieldRecorder {
    fn name(&self) -> &str {
        "FieldRecorder"
    }

    fn update_sim(&mut self, sim: &mut ColumnSimulation) -> Result<(), SimulationError> {
        self.records
            .borrow_mut()
            .push((sim.solution().to_vec(), sim.snapshot_field()?));
        Ok(())
    }
}

#[test]
fn snapshots_blend_old_and_new_fields_by_theta() {
    let scratch = Scratch::new("blend");
    let mut config = column_config(
        &scratch,
        0.0,
        10.0,
        "first",
        r#", "bottom_fixed_value_c": 0.0"#,
    );
    config.theta = 0.5;
    config.timestep_count = 2;

    let records = Rc::new(RefCell::new(Vec::new()));
    let mut ops = ColumnSimulation::standard_ops(&config);
    ops.push(SimOpHandle::new(Box::new(FieldRecorder {
        records: Rc::clone(&records),
    })));
    let mut simulation = ColumnSimulation::new(&config, ops).unwrap();
    simulation.run().unwrap();

    let records = records.borrow();
    assert_eq!(records.len(), 2);
    let (first_field, _) = &records[0];
    let (second_field, second_rows) = &records[1];

    // While an operator observes step 2, the previously accepted field is
    // still the step-1 field, so every snapshot cell must carry the blend of
    // the two time levels rather than the new field alone.
    let mut blend_differs_from_new = false;
    for (e, row) in second_rows.iter().enumerate() {
        let t_new = 0.5 * (second_field[e] + second_field[e + 1]);
        let t_old = 0.5 * (first_field[e] + first_field[e + 1]);
        assert_relative_eq!(
            row.temperature_c,
            0.5 * t_new + 0.5 * t_old,
            max_relative = 1e-12
        );
        if (row.temperature_c - t_new).abs() > 1e-9 {
            blend_differs_from_new = true;
        }
    }
    assert!(blend_differs_from_new, "field did not evolve between steps");
}

#[test]
fn iteration_cap_yields_a_convergence_failure() {
    let scratch = Scratch::new("cap");
    let mut config = column_config(
        &scratch,
        0.0,
        10.0,
        "first",
        r#", "bottom_fixed_value_c": 0.0"#,
    );
    config.convergence_tolerance = 1e-15;
    config.max_fixed_point_iterations = 1;

    let ops = ColumnSimulation::standard_ops(&config);
    let mut simulation = ColumnSimulation::new(&config, ops).unwrap();
    let result = simulation.run();
    match result {
        Err(SimulationError::ConvergenceFailure {
            step, iterations, ..
        }) => {
            assert_eq!(step, 1);
            assert_eq!(iterations, 1);
        }
        other => panic!("expected a convergence failure, got {other:?}"),
    }
}
