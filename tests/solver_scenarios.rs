use mac_fluid::{
    Classification, ExtrapolationStatus, Extrapolator, Field2, Grid2, Label, LabelGrid, MacGrid2,
    PressureParams, PressureSolver, Real, Solver, SolverConfig, Vec2,
};

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!(
        (a - b).abs() <= tol,
        "expected {a} to be within {tol} of {b}"
    );
}

#[test]
fn still_box_projects_to_zero_pressure() {
    let mut mac: MacGrid2 = MacGrid2::new(4, 4, 0.25);
    mac.s.fill(1.0);
    mac.update_labels(Classification::Density);
    let mut solver = PressureSolver::new(PressureParams::default());
    solver.project(&mut mac, 0.05, 1.0);
    for j in 0..4 {
        for i in 0..4 {
            assert_eq!(mac.p.get(i, j), 0.0);
            assert_eq!(mac.divergence(i, j), 0.0);
        }
    }
    assert!(mac.u.data().iter().all(|u| *u == 0.0));
    assert!(mac.v.data().iter().all(|v| *v == 0.0));
}

#[test]
fn one_pass_reaches_only_orthogonal_neighbours() {
    let grid = Grid2::cell_centered(3, 3, 1.0);
    let mut q = Field2::new(grid, 0.0);
    q.set(1, 1, 5.0);
    let mut labels = LabelGrid::new(3, 3);
    labels.set(1, 1, Label::Fluid);
    let mut extrapolator = Extrapolator::new(&q, &labels);
    assert_eq!(extrapolator.step(&mut q), ExtrapolationStatus::Updated);
    assert_eq!(q.get(0, 1), 5.0);
    assert_eq!(q.get(2, 1), 5.0);
    assert_eq!(q.get(1, 0), 5.0);
    assert_eq!(q.get(1, 2), 5.0);
    for (i, j) in [(0, 0), (2, 0), (0, 2), (2, 2)] {
        assert_eq!(extrapolator.labels().get(i, j), Label::Empty);
    }
}

#[test]
fn solid_border_on_eight_by_six() {
    let mut labels = LabelGrid::new(8, 6);
    labels.set_solid_border();
    for j in 0..6 {
        for i in 0..8 {
            let border = i == 0 || i == 7 || j == 0 || j == 5;
            assert_eq!(labels.is_solid(i, j), border, "({i}, {j})");
            if !border {
                assert!(!labels.is_fluid(i, j));
            }
        }
    }
}

fn injection_box() -> SolverConfig {
    SolverConfig {
        rows: 64,
        cols: 64,
        ..SolverConfig::default()
    }
}

fn inject(solver: &mut Solver) {
    let pos = Vec2::new(0.45, 0.2);
    let size = Vec2::new(0.1, 0.01);
    solver.add_density(pos, size, 1.0);
    solver.add_velocity(pos, size, Vec2::new(0.0, 3.0));
}

#[test]
fn injected_density_stays_local_after_one_step() {
    let mut solver: Solver = Solver::new(&injection_box()).unwrap();
    inject(&mut solver);
    solver.step();
    let density = solver.density();
    let h = solver.mac().dx();
    let mut total = 0.0;
    for j in 0..density.height() {
        for i in 0..density.width() {
            let value = density.get(i, j);
            if value == 0.0 {
                continue;
            }
            total += value;
            let (x, y) = ((i as f64 + 0.5) * h, (j as f64 + 0.5) * h);
            assert!(
                (0.45 - 2.0 * h..=0.55 + 2.0 * h).contains(&x)
                    && (0.2 - 2.0 * h..=0.21 + 4.0 * h).contains(&y),
                "density {value} at cell ({i}, {j})"
            );
        }
    }
    assert!(total > 0.0);
}

#[test]
fn identical_inputs_give_identical_fields() {
    let mut a: Solver = Solver::new(&injection_box()).unwrap();
    let mut b: Solver = Solver::new(&injection_box()).unwrap();
    for _ in 0..4 {
        inject(&mut a);
        inject(&mut b);
        a.step();
        b.step();
    }
    assert_eq!(a.density(), b.density());
    assert_eq!(a.u(), b.u());
    assert_eq!(a.v(), b.v());
    assert_eq!(a.pressure(), b.pressure());
    assert_eq!(a.labels(), b.labels());
}

#[test]
fn enclosed_fluid_cell_has_nowhere_to_spread() {
    let grid = Grid2::cell_centered(5, 5, 1.0);
    let mut q = Field2::from_fn(grid, |x, y| (x + 3 * y) as f64);
    let mut labels = LabelGrid::new(5, 5);
    labels.fill(Label::Solid);
    labels.set(2, 2, Label::Fluid);
    let before = q.clone();
    let mut extrapolator = Extrapolator::new(&q, &labels);
    assert_eq!(extrapolator.run(&mut q), 0);
    assert_eq!(q, before);
}

#[test]
fn plume_keeps_border_faces_closed() {
    let mut solver: Solver = Solver::new(&SolverConfig::plume(32, 32)).unwrap();
    for _ in 0..5 {
        let stats = solver.step();
        assert!(stats.converged || stats.iterations == 30);
    }
    let (u, v) = (solver.u(), solver.v());
    for j in 0..32 {
        assert_eq!(u.get(0, j), 0.0);
        assert_eq!(u.get(32, j), 0.0);
    }
    for i in 0..32 {
        assert_eq!(v.get(i, 0), 0.0);
        assert_eq!(v.get(i, 32), 0.0);
    }
    let stats = solver.last_solve();
    if stats.converged {
        assert!(solver.mac().max_fluid_divergence() < 1e-5 + 1e-9);
    }
    assert_close(solver.density().max_abs(), 1.0, 1e-9);
}

fn fluid_after_steps<T: Real>(config: &SolverConfig, steps: usize) -> usize {
    let mut solver: Solver<T> = Solver::new(config).unwrap();
    for _ in 0..steps {
        solver.step();
    }
    solver.labels().count(Label::Fluid)
}

#[test]
fn both_precisions_agree_on_fluid_region() {
    let config = SolverConfig::plume(16, 16);
    let single = fluid_after_steps::<f32>(&config, 1);
    let double = fluid_after_steps::<f64>(&config, 1);
    assert!(double > 0);
    assert!(single.abs_diff(double) <= 2, "f32 {single} vs f64 {double}");
}
