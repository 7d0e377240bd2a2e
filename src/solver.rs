use crate::{
    Advector, Classification, ConfigError, Extrapolator, Field2, FluidModel, LabelGrid, MacGrid2,
    PressureSolver, Real, Redistancer, SolveStats, SolverConfig, SourceShape, Vec2,
};

/// Operator-splitting solver owning one [`MacGrid2`].
///
/// Every [`Solver::step`] runs, in order: label update, velocity
/// extrapolation, advection, forces, label update, projection, and for
/// liquids a redistancing pass over the level set.
#[derive(Clone, Debug)]
pub struct Solver<T: Real = f64> {
    config: SolverConfig,
    mac: MacGrid2<T>,
    timestep: T,
    density: T,
    extrapolate_u: Extrapolator<T>,
    extrapolate_v: Extrapolator<T>,
    advect_s: Advector<T>,
    advect_u: Advector<T>,
    advect_v: Advector<T>,
    pressure: PressureSolver<T>,
    redistancer: Option<Redistancer<T>>,
    last_solve: SolveStats,
    steps: u64,
}

impl<T: Real> Solver<T> {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut mac = MacGrid2::new(config.rows, config.cols, T::lit(config.cell_size()))
            .with_scalar_interpolation(config.scalar_interpolation);
        let redistancer = match config.model {
            FluidModel::Density => None,
            FluidModel::Liquid => {
                seed_drop(&mut mac.s, config.initial_drop_radius);
                Some(Redistancer::new(&mac.s, config.redistance))
            }
        };
        let classification = classification_for(config.model);
        mac.update_labels(classification);
        log::debug!(
            "solver: {}x{} cells, h = {}, dt = {}, {:?}",
            mac.nx(),
            mac.ny(),
            config.cell_size(),
            config.timestep,
            config.model
        );
        Ok(Self {
            timestep: T::lit(config.timestep),
            density: T::lit(config.density),
            extrapolate_u: Extrapolator::new(&mac.u, &mac.labels),
            extrapolate_v: Extrapolator::new(&mac.v, &mac.labels),
            advect_s: Advector::new(&mac.s, config.integrator),
            advect_u: Advector::new(&mac.u, config.integrator),
            advect_v: Advector::new(&mac.v, config.integrator),
            pressure: PressureSolver::new(config.pressure),
            redistancer,
            last_solve: SolveStats::default(),
            steps: 0,
            config: config.clone(),
            mac,
        })
    }

    /// Advances by the configured timestep.
    pub fn step(&mut self) -> SolveStats {
        self.step_by(self.timestep)
    }

    pub fn step_by(&mut self, dt: T) -> SolveStats {
        let classification = classification_for(self.config.model);
        self.mac.update_labels(classification);
        self.extrapolate();
        self.advect(dt);
        self.add_forces(dt);
        self.mac.update_labels(classification);
        self.last_solve = self.pressure.project(&mut self.mac, dt, self.density);
        if let Some(redistancer) = self.redistancer.as_mut() {
            redistancer.redistance(&mut self.mac.s);
        }
        self.steps += 1;
        log::debug!(
            "step {}: {} fluid cells, cg {} iterations, residual {:.3e}",
            self.steps,
            self.last_solve.fluid_cells,
            self.last_solve.iterations,
            self.last_solve.residual
        );
        self.last_solve
    }

    fn extrapolate(&mut self) {
        self.extrapolate_u.reset(&self.mac.labels);
        let u_passes = self.extrapolate_u.run(&mut self.mac.u);
        self.extrapolate_v.reset(&self.mac.labels);
        let v_passes = self.extrapolate_v.run(&mut self.mac.v);
        log::trace!("extrapolated velocity: {u_passes} u passes, {v_passes} v passes");
    }

    fn advect(&mut self, dt: T) {
        let mac = &self.mac;
        let labels = Some(&mac.labels);
        self.advect_s.advect_masked(&mac.s, &mac.u, &mac.v, labels, dt);
        self.advect_u.advect_masked(&mac.u, &mac.u, &mac.v, labels, dt);
        self.advect_v.advect_masked(&mac.v, &mac.u, &mac.v, labels, dt);
        self.advect_s.swap(&mut self.mac.s);
        self.advect_u.swap(&mut self.mac.u);
        self.advect_v.swap(&mut self.mac.v);
        log::trace!("advected with dt = {dt}");
    }

    fn add_forces(&mut self, dt: T) {
        for k in 0..self.config.sources.len() {
            let source = self.config.sources[k];
            let pos = Vec2::new(T::lit(source.position[0]), T::lit(source.position[1]));
            let size = Vec2::new(T::lit(source.size[0]), T::lit(source.size[1]));
            self.add_density(pos, size, T::lit(source.density));
            let velocity = Vec2::new(T::lit(source.velocity[0]), T::lit(source.velocity[1]));
            self.add_velocity(pos, size, velocity);
        }
        let gravity = T::lit(self.config.gravity);
        if gravity != T::zero() {
            let dv = gravity * dt;
            self.mac.v.update_with_index(|_, _, v| v + dv);
        }
    }

    fn source_shape(&self) -> SourceShape {
        match self.config.model {
            FluidModel::Density => SourceShape::Box,
            FluidModel::Liquid => SourceShape::Smooth,
        }
    }

    /// Writes `value` into the scalar over a world-space region.
    pub fn add_density(&mut self, world_pos: Vec2<T>, size: Vec2<T>, value: T) {
        let shape = self.source_shape();
        self.mac.s.add_region(world_pos, size, value, shape);
    }

    /// Writes `velocity` into both face components over a world-space region.
    pub fn add_velocity(&mut self, world_pos: Vec2<T>, size: Vec2<T>, velocity: Vec2<T>) {
        let shape = self.source_shape();
        self.mac.u.add_region(world_pos, size, velocity.x, shape);
        self.mac.v.add_region(world_pos, size, velocity.y, shape);
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn mac(&self) -> &MacGrid2<T> {
        &self.mac
    }

    pub fn density(&self) -> &Field2<T> {
        &self.mac.s
    }

    /// Level set of the liquid surface; the same field as [`Self::density`].
    pub fn surface(&self) -> &Field2<T> {
        &self.mac.s
    }

    pub fn pressure(&self) -> &Field2<T> {
        &self.mac.p
    }

    pub fn u(&self) -> &Field2<T> {
        &self.mac.u
    }

    pub fn v(&self) -> &Field2<T> {
        &self.mac.v
    }

    pub fn labels(&self) -> &LabelGrid {
        &self.mac.labels
    }

    /// Display intensity of a cell: the density itself, or `1` inside the liquid.
    pub fn color(&self, x: usize, y: usize) -> T {
        let value = self.mac.s.get(x, y);
        match self.config.model {
            FluidModel::Density => value,
            FluidModel::Liquid if value <= T::lit(0.01) => T::one(),
            FluidModel::Liquid => T::zero(),
        }
    }

    pub fn timestep(&self) -> T {
        self.timestep
    }

    pub fn cfl_timestep(&self) -> Option<T> {
        self.mac.cfl_timestep()
    }

    pub fn last_solve(&self) -> SolveStats {
        self.last_solve
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

fn classification_for(model: FluidModel) -> Classification {
    match model {
        FluidModel::Density => Classification::Density,
        FluidModel::Liquid => Classification::LevelSet,
    }
}

/// Level set of a disc of `radius` cells centered on the grid, in cell units.
fn seed_drop<T: Real>(s: &mut Field2<T>, radius: f64) {
    let cx = (s.width() / 2) as f64;
    let cy = (s.height() / 2) as f64;
    s.fill_with_index(|i, j| {
        let dx = i as f64 - cx;
        let dy = j as f64 - cy;
        T::lit((dx * dx + dy * dy).sqrt() - radius)
    });
}
