use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use mac_fluid::{FluidModel, Integrator, PressureMethod, Solver, SolverConfig};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum SimMode {
    Density,
    Liquid,
}

impl SimMode {
    fn config(self, rows: usize, cols: usize) -> SolverConfig {
        match self {
            SimMode::Density => SolverConfig::plume(rows, cols),
            SimMode::Liquid => SolverConfig::liquid(rows, cols),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Dump {
    Density,
    Pressure,
    U,
    V,
    Labels,
}

/// Headless driver for the staggered-grid fluid solver.
#[derive(Parser, Debug)]
#[command(name = "mac_fluid", version, about = "2D MAC-grid fluid solver", long_about = None)]
struct Cli {
    #[arg(long, value_enum, default_value = "density")]
    mode: SimMode,

    #[arg(long, default_value_t = 64)]
    rows: usize,

    #[arg(long, default_value_t = 64)]
    cols: usize,

    #[arg(long, default_value_t = 100)]
    steps: usize,

    /// Overrides the preset timestep.
    #[arg(long)]
    timestep: Option<f64>,

    /// Overrides the preset gravity.
    #[arg(long)]
    gravity: Option<f64>,

    #[arg(long, default_value_t = 30)]
    pressure_iterations: usize,

    /// Use Gauss-Seidel instead of preconditioned CG.
    #[arg(long)]
    gauss_seidel: bool,

    /// First-order backtracing instead of RK3.
    #[arg(long)]
    euler: bool,

    /// Log a summary line every N steps.
    #[arg(long, default_value_t = 10)]
    report_every: usize,

    /// Print ASCII previews of the scalar field while stepping.
    #[arg(long)]
    preview: bool,

    /// Fields printed after the last step.
    #[arg(long, value_enum)]
    dump: Vec<Dump>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .init();
}

fn build_config(cli: &Cli) -> SolverConfig {
    let mut config = cli.mode.config(cli.rows, cli.cols);
    if let Some(dt) = cli.timestep {
        config.timestep = dt;
    }
    if let Some(g) = cli.gravity {
        config.gravity = g;
    }
    config.pressure.max_iterations = cli.pressure_iterations;
    if cli.gauss_seidel {
        config.pressure.method = PressureMethod::GaussSeidel;
    }
    if cli.euler {
        config.integrator = Integrator::Euler;
    }
    config
}

const RAMP: &[u8] = b" .:-=+*#%@";

fn preview(solver: &Solver) -> String {
    let field = solver.density();
    let (width, height) = (field.width(), field.height());
    let mut out = String::with_capacity((width + 1) * height);
    for y in (0..height).rev() {
        for x in 0..width {
            let t = solver.color(x, y).clamp(0.0, 1.0);
            let idx = (t * (RAMP.len() - 1) as f64).round() as usize;
            out.push(RAMP[idx] as char);
        }
        out.push('\n');
    }
    out
}

fn dump(solver: &Solver, which: Dump) {
    match which {
        Dump::Density => println!("DENSITY\n{}", solver.density()),
        Dump::Pressure => println!("PRESSURE\n{}", solver.pressure()),
        Dump::U => println!("U\n{}", solver.u()),
        Dump::V => println!("V\n{}", solver.v()),
        Dump::Labels => println!("LABELS\n{}", solver.labels()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = build_config(&cli);
    let mut solver: Solver =
        Solver::new(&config).with_context(|| format!("invalid {:?} configuration", cli.mode))?;
    log::info!(
        "{:?} run: {}x{} cells, dt = {}, {} steps",
        config.model,
        config.cols,
        config.rows,
        config.timestep,
        cli.steps
    );

    let report_every = cli.report_every.max(1);
    let mut unconverged = 0usize;
    for step in 1..=cli.steps {
        let stats = solver.step();
        if !stats.converged {
            unconverged += 1;
        }
        if step % report_every == 0 || step == cli.steps {
            let (lo, hi) = solver.density().min_max();
            log::info!(
                "step {step}: fluid {}, iterations {}, residual {:.2e}, scalar [{lo:.3}, {hi:.3}], cfl dt {}",
                stats.fluid_cells,
                stats.iterations,
                stats.residual,
                solver
                    .cfl_timestep()
                    .map_or_else(|| "-".to_string(), |dt| format!("{dt:.4}"))
            );
            if cli.preview {
                println!("{}", preview(&solver));
            }
        }
    }
    if unconverged > 0 {
        log::warn!(
            "{unconverged} of {} pressure solves hit the iteration cap",
            cli.steps
        );
    }
    if config.model == FluidModel::Liquid && solver.labels().count(mac_fluid::Label::Fluid) == 0 {
        log::warn!("liquid has no fluid cells left");
    }
    for which in &cli.dump {
        dump(&solver, *which);
    }
    Ok(())
}
