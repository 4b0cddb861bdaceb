//! Demo driver for the immersed-boundary core. Builds a single
//! superellipse cell, registers the two core force modules, and runs it
//! for a configurable number of time steps, reporting the elongation
//! shape factor as it relaxes.
//!
//! Archival, VTK/CSV output and real mesh-file ingestion are
//! collaborator concerns outside the core; this binary exists only to
//! exercise the core end to end from a parameter file.

use clap::{App, Arg};
use colored::*;
use ib_core::element::Element;
use ib_core::errors::*;
use ib_core::forces::cell_cell::CellCellForce;
use ib_core::forces::membrane::MembraneForce;
use ib_core::forces::ForceModule;
use ib_core::geometry::Point;
use ib_core::mesh::Mesh;
use ib_core::node::Node;
use ib_core::settings::{self, Settings};
use ib_core::simulation::Simulation;
use log::info;
use pbr::ProgressBar;

fn main() {
    env_logger::init();

    if let Err(ref e) = run() {
        eprintln!("{}: {}", "error".red(), e);
        for cause in e.iter().skip(1) {
            eprintln!("caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("simulation")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a demo immersed-boundary cell relaxation")
        .arg(
            Arg::with_name("parameter_file")
                .short("p")
                .long("parameters")
                .takes_value(true)
                .help("TOML parameter file; a built-in default is used if omitted"),
        )
        .arg(
            Arg::with_name("steps")
                .short("n")
                .long("steps")
                .takes_value(true)
                .default_value("100")
                .help("Number of time steps to run"),
        )
        .arg(
            Arg::with_name("progress_bar")
                .long("progress")
                .help("Show a progress bar"),
        )
        .get_matches();

    let settings = match matches.value_of("parameter_file") {
        Some(path) => settings::read_parameter_file(path)
            .chain_err(|| "Error reading parameter file.")?,
        None => default_settings(),
    };

    let mesh = build_superellipse_mesh(&settings, 128, 0.4 / 2.0, 0.6 / 2.0, 0.3 + 0.2, 0.2 + 0.3)
        .chain_err(|| "Error building demo mesh.")?;

    let membrane: Box<dyn ForceModule> = Box::new(MembraneForce::new(
        settings.membrane.spring_constant,
        settings.membrane.rest_length,
    ));
    let cell_cell: Box<dyn ForceModule> = Box::new(CellCellForce::new(
        settings.cell_cell.spring_constant,
        settings.cell_cell.variant(),
    ));

    let mut simulation = Simulation::new(mesh, &settings, vec![membrane, cell_cell])
        .chain_err(|| "Error constructing simulation.")?;
    simulation
        .setup_solve()
        .chain_err(|| "Error during setup_solve().")?;

    let steps: usize = matches
        .value_of("steps")
        .unwrap()
        .parse()
        .chain_err(|| "steps must be an integer")?;

    let show_progress = matches.is_present("progress_bar");
    let mut pb = ProgressBar::new(steps as u64);
    pb.show_bar = show_progress;
    pb.show_counter = show_progress;
    pb.show_percent = show_progress;
    pb.show_time_left = show_progress;

    for step in 0..steps {
        simulation
            .update_at_end_of_time_step(settings.grid.dt, step)
            .chain_err(|| format!("Error advancing time step {}.", step))?;
        if show_progress {
            pb.inc();
        }
        if step % 10 == 0 {
            let factor = simulation.mesh().elongation_shape_factor(0);
            info!("step {}: elongation shape factor = {:.4}", step, factor);
        }
    }

    if show_progress {
        pb.finish_print(&format!("{} {} steps", "done".green().bold(), steps));
    }

    let final_factor = simulation.mesh().elongation_shape_factor(0);
    println!(
        "final elongation shape factor after {} steps: {:.4}",
        steps, final_factor
    );

    Ok(())
}

fn default_settings() -> Settings {
    use ib_core::settings::{
        CellCellSettings, GridSettings, MembraneSettings, PopulationSettings,
    };
    Settings {
        grid: GridSettings {
            nx: 32,
            ny: 32,
            dt: 0.05,
            re: 1e-4,
            node_neighbour_update_frequency: 1,
            fft_threads: 2,
        },
        membrane: MembraneSettings {
            spring_constant: 1e8,
            rest_length: 0.4 / 128.0,
        },
        cell_cell: CellCellSettings {
            spring_constant: 1e9,
            morse: false,
        },
        population: PopulationSettings {
            interaction_distance: 0.1,
            intrinsic_spacing: 0.4 / 128.0,
            element_division_spacing: None,
        },
    }
}

/// Builds a single closed-polygon cell shaped like an axis-aligned
/// ellipse (a superellipse of exponent 1), with `num_nodes` vertices,
/// half-axes `(a, b)` and centre `(cx, cy)`.
fn build_superellipse_mesh(
    settings: &Settings,
    num_nodes: usize,
    a: f64,
    b: f64,
    cx: f64,
    cy: f64,
) -> Result<Mesh> {
    let nodes: Vec<Node> = (0..num_nodes)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / num_nodes as f64;
            Node::new(i, Point::new(cx + a * theta.cos(), cy + b * theta.sin()))
        })
        .collect();

    let mut elem = Element::new(0, (0..num_nodes).collect());
    elem.membrane_spring_constant = settings.membrane.spring_constant;
    elem.membrane_rest_length = settings.membrane.rest_length;

    Mesh::new(nodes, vec![elem], None, settings.grid.nx, settings.grid.ny)
}
