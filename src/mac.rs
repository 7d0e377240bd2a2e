use crate::{Field2, Grid2, Interpolation, Label, LabelGrid, Real, Vec2};
use serde::{Deserialize, Serialize};

/// How cells are classified as fluid from the advected scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Positive density marks fluid.
    #[default]
    Density,
    /// Negative level set marks fluid.
    LevelSet,
}

/// Staggered marker-and-cell grid.
///
/// `u` lives on vertical faces (`nx + 1` by `ny`), `v` on horizontal faces
/// (`nx` by `ny + 1`), and `p`, `s` at cell centers. `s` holds density or a
/// level set depending on the [`Classification`] in use.
#[derive(Clone, Debug)]
pub struct MacGrid2<T = f64> {
    pub u: Field2<T>,
    pub v: Field2<T>,
    pub p: Field2<T>,
    pub s: Field2<T>,
    pub labels: LabelGrid,
    nx: usize,
    ny: usize,
    dx: T,
}

impl<T: Real> MacGrid2<T> {
    /// Zero-filled grid with `rows` cells vertically and `cols` horizontally, walled by solids.
    pub fn new(rows: usize, cols: usize, dx: T) -> Self {
        let nx = cols;
        let ny = rows;
        let cell = Grid2::cell_centered(nx, ny, dx);
        let mut labels = LabelGrid::new(nx, ny);
        labels.set_solid_border();
        Self {
            u: Field2::new(Self::u_grid_for(nx, ny, dx), T::zero()),
            v: Field2::new(Self::v_grid_for(nx, ny, dx), T::zero()),
            p: Field2::new(cell, T::zero()),
            s: Field2::new(cell, T::zero()).with_interpolation(Interpolation::Cubic),
            labels,
            nx,
            ny,
            dx,
        }
    }

    pub fn with_scalar_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.s = self.s.with_interpolation(interpolation);
        self
    }

    fn u_grid_for(nx: usize, ny: usize, dx: T) -> Grid2<T> {
        Grid2::new(nx + 1, ny, dx, Vec2::new(T::zero(), T::lit(0.5)))
    }

    fn v_grid_for(nx: usize, ny: usize, dx: T) -> Grid2<T> {
        Grid2::new(nx, ny + 1, dx, Vec2::new(T::lit(0.5), T::zero()))
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn cell_count(&self) -> usize {
        self.nx * self.ny
    }

    pub fn dx(&self) -> T {
        self.dx
    }

    pub fn cell_grid(&self) -> Grid2<T> {
        self.p.grid()
    }

    pub fn u_grid(&self) -> Grid2<T> {
        self.u.grid()
    }

    pub fn v_grid(&self) -> Grid2<T> {
        self.v.grid()
    }

    pub fn world_width(&self) -> T {
        T::from_index(self.nx) * self.dx
    }

    pub fn world_height(&self) -> T {
        T::from_index(self.ny) * self.dx
    }

    /// Re-derives fluid and empty labels from `s`, leaving solids alone.
    pub fn update_labels(&mut self, classification: Classification) {
        self.labels.reset();
        for j in 0..self.ny {
            for i in 0..self.nx {
                if self.labels.is_solid(i as isize, j as isize) {
                    continue;
                }
                let value = self.s.get(i, j);
                let fluid = match classification {
                    Classification::Density => value > T::zero(),
                    Classification::LevelSet => value < T::zero(),
                };
                let label = if fluid { Label::Fluid } else { Label::Empty };
                self.labels.set(i, j, label);
            }
        }
    }

    /// Velocity at a world-space position, interpolated per component.
    pub fn velocity_at(&self, world: Vec2<T>) -> Vec2<T> {
        Vec2::new(self.u.sample_world(world), self.v.sample_world(world))
    }

    /// Discrete divergence of cell `(i, j)`.
    pub fn divergence(&self, i: usize, j: usize) -> T {
        let flux = self.u.get(i + 1, j) - self.u.get(i, j) + self.v.get(i, j + 1) - self.v.get(i, j);
        flux / self.dx
    }

    pub fn max_fluid_divergence(&self) -> T {
        let mut max = T::zero();
        for j in 0..self.ny {
            for i in 0..self.nx {
                if self.labels.is_fluid(i as isize, j as isize) {
                    max = max.max(self.divergence(i, j).abs());
                }
            }
        }
        max
    }

    pub fn max_speed(&self) -> T {
        self.u.max_abs().max(self.v.max_abs())
    }

    /// Timestep that moves the fastest face velocity by one cell, `None` while at rest.
    pub fn cfl_timestep(&self) -> Option<T> {
        let speed = self.max_speed();
        if speed > T::zero() && speed.is_finite() {
            Some(self.dx / speed)
        } else {
            None
        }
    }
}
