use crate::{Label, LabelGrid, MacGrid2, Real};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureMethod {
    /// Conjugate gradient preconditioned with modified incomplete Cholesky.
    #[default]
    Pcg,
    GaussSeidel,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureParams {
    pub method: PressureMethod,
    /// Infinity-norm residual at which the solve stops.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// MIC(0) mixing factor.
    pub tuning: f64,
    /// Pivots below `safety * diagonal` fall back to the diagonal.
    pub safety: f64,
}

impl Default for PressureParams {
    fn default() -> Self {
        Self {
            method: PressureMethod::Pcg,
            tolerance: 1e-5,
            max_iterations: 30,
            tuning: 0.97,
            safety: 0.25,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
    pub fluid_cells: usize,
}

/// Pressure projection over the fluid cells of a [`MacGrid2`].
///
/// Every buffer is indexed by a compacted fluid-cell index assigned in raster
/// order, so solids and empty cells never occupy matrix rows. The scratch
/// vectors are kept between calls and only resized when the fluid set changes.
#[derive(Clone, Debug, Default)]
pub struct PressureSolver<T = f64> {
    params: PressureParams,
    width: usize,
    height: usize,
    index: Vec<Option<usize>>,
    cells: Vec<(usize, usize)>,
    rhs: Vec<T>,
    adiag: Vec<T>,
    ax: Vec<T>,
    ay: Vec<T>,
    precon: Vec<T>,
    pressure: Vec<T>,
    residual: Vec<T>,
    aux: Vec<T>,
    search: Vec<T>,
    forward: Vec<T>,
}

impl<T: Real> PressureSolver<T> {
    pub fn new(params: PressureParams) -> Self {
        Self {
            params,
            width: 0,
            height: 0,
            index: Vec::new(),
            cells: Vec::new(),
            rhs: Vec::new(),
            adiag: Vec::new(),
            ax: Vec::new(),
            ay: Vec::new(),
            precon: Vec::new(),
            pressure: Vec::new(),
            residual: Vec::new(),
            aux: Vec::new(),
            search: Vec::new(),
            forward: Vec::new(),
        }
    }

    pub fn params(&self) -> PressureParams {
        self.params
    }

    pub fn fluid_cells(&self) -> &[(usize, usize)] {
        &self.cells
    }

    /// Makes the velocity of `mac` divergence free over its fluid cells.
    pub fn project(&mut self, mac: &mut MacGrid2<T>, dt: T, density: T) -> SolveStats {
        self.index_cells(&mac.labels);
        self.build_rhs(mac);
        self.build_matrix(&mac.labels, dt / (density * mac.dx() * mac.dx()));
        let stats = match self.params.method {
            PressureMethod::Pcg => {
                self.build_preconditioner();
                self.solve_pcg()
            }
            PressureMethod::GaussSeidel => self.solve_gauss_seidel(),
        };
        self.write_pressure(mac);
        self.update_velocity(mac, dt / (density * mac.dx()));
        zero_border_faces(mac);
        log::debug!(
            "pressure solve: {} fluid cells, {} iterations, residual {:.3e}",
            stats.fluid_cells,
            stats.iterations,
            stats.residual
        );
        if !stats.converged {
            log::debug!(
                "pressure solve stopped at the {} iteration cap above tolerance {:.1e}",
                self.params.max_iterations,
                self.params.tolerance
            );
        }
        stats
    }

    fn index_cells(&mut self, labels: &LabelGrid) {
        self.width = labels.width();
        self.height = labels.height();
        self.index.clear();
        self.index.resize(labels.size(), None);
        self.cells.clear();
        for j in 0..self.height {
            for i in 0..self.width {
                if labels.is_fluid(i as isize, j as isize) {
                    self.index[j * self.width + i] = Some(self.cells.len());
                    self.cells.push((i, j));
                }
            }
        }
        let n = self.cells.len();
        for buffer in [
            &mut self.rhs,
            &mut self.adiag,
            &mut self.ax,
            &mut self.ay,
            &mut self.precon,
            &mut self.pressure,
            &mut self.residual,
            &mut self.aux,
            &mut self.search,
            &mut self.forward,
        ] {
            buffer.clear();
            buffer.resize(n, T::zero());
        }
    }

    /// Compacted index of the fluid cell at `(i + di, j + dj)`.
    fn neighbour(&self, cell: (usize, usize), di: isize, dj: isize) -> Option<usize> {
        let x = cell.0 as isize + di;
        let y = cell.1 as isize + dj;
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        self.index[y as usize * self.width + x as usize]
    }

    fn build_rhs(&mut self, mac: &MacGrid2<T>) {
        let scale = T::one() / mac.dx();
        let labels = &mac.labels;
        for (k, &(i, j)) in self.cells.iter().enumerate() {
            let (x, y) = (i as isize, j as isize);
            let mut div = -scale
                * (mac.u.get(i + 1, j) - mac.u.get(i, j) + mac.v.get(i, j + 1) - mac.v.get(i, j));
            if labels.is_solid(x - 1, y) {
                div = div - scale * mac.u.get(i, j);
            }
            if labels.is_solid(x + 1, y) {
                div = div + scale * mac.u.get(i + 1, j);
            }
            if labels.is_solid(x, y - 1) {
                div = div - scale * mac.v.get(i, j);
            }
            if labels.is_solid(x, y + 1) {
                div = div + scale * mac.v.get(i, j + 1);
            }
            self.rhs[k] = div;
        }
    }

    fn build_matrix(&mut self, labels: &LabelGrid, scale: T) {
        for k in 0..self.cells.len() {
            let (i, j) = self.cells[k];
            let (x, y) = (i as isize, j as isize);
            let mut diag = T::zero();
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if !labels.is_solid(nx, ny) {
                    diag = diag + scale;
                }
            }
            self.adiag[k] = diag;
            self.ax[k] = if labels.is_fluid(x + 1, y) { -scale } else { T::zero() };
            self.ay[k] = if labels.is_fluid(x, y + 1) { -scale } else { T::zero() };
        }
    }

    fn build_preconditioner(&mut self) {
        let tau = T::lit(self.params.tuning);
        let sigma = T::lit(self.params.safety);
        for k in 0..self.cells.len() {
            let cell = self.cells[k];
            let diag = self.adiag[k];
            if diag == T::zero() {
                self.precon[k] = T::zero();
                continue;
            }
            let mut e = diag;
            if let Some(l) = self.neighbour(cell, -1, 0) {
                let x = self.ax[l] * self.precon[l];
                let y = self.ay[l] * self.precon[l];
                e = e - (x * x + tau * x * y);
            }
            if let Some(b) = self.neighbour(cell, 0, -1) {
                let x = self.ax[b] * self.precon[b];
                let y = self.ay[b] * self.precon[b];
                e = e - (y * y + tau * x * y);
            }
            if e < sigma * diag {
                e = diag;
            }
            self.precon[k] = T::one() / e.sqrt();
        }
    }

    /// `dst = M⁻¹ src` by forward then backward substitution.
    fn apply_preconditioner(&mut self, src: &[T], dst: &mut [T]) {
        let n = self.cells.len();
        for k in 0..n {
            let cell = self.cells[k];
            let mut t = src[k];
            if let Some(l) = self.neighbour(cell, -1, 0) {
                t = t - self.ax[l] * self.precon[l] * self.forward[l];
            }
            if let Some(b) = self.neighbour(cell, 0, -1) {
                t = t - self.ay[b] * self.precon[b] * self.forward[b];
            }
            self.forward[k] = t * self.precon[k];
        }
        for k in (0..n).rev() {
            let cell = self.cells[k];
            let mut t = self.forward[k];
            if let Some(r) = self.neighbour(cell, 1, 0) {
                t = t - self.ax[k] * self.precon[k] * dst[r];
            }
            if let Some(a) = self.neighbour(cell, 0, 1) {
                t = t - self.ay[k] * self.precon[k] * dst[a];
            }
            dst[k] = t * self.precon[k];
        }
    }

    /// `dst = A src` over the fluid cells.
    fn apply_matrix(&self, src: &[T], dst: &mut [T]) {
        for (k, &cell) in self.cells.iter().enumerate() {
            let mut t = self.adiag[k] * src[k];
            if let Some(r) = self.neighbour(cell, 1, 0) {
                t = t + self.ax[k] * src[r];
            }
            if let Some(l) = self.neighbour(cell, -1, 0) {
                t = t + self.ax[l] * src[l];
            }
            if let Some(a) = self.neighbour(cell, 0, 1) {
                t = t + self.ay[k] * src[a];
            }
            if let Some(b) = self.neighbour(cell, 0, -1) {
                t = t + self.ay[b] * src[b];
            }
            dst[k] = t;
        }
    }

    fn solve_pcg(&mut self) -> SolveStats {
        let n = self.cells.len();
        let tol = T::lit(self.params.tolerance);
        self.pressure.iter_mut().for_each(|p| *p = T::zero());
        self.residual.clone_from(&self.rhs);
        let mut stats = SolveStats {
            fluid_cells: n,
            ..SolveStats::default()
        };
        let mut norm = max_abs(&self.residual);
        if norm < tol {
            stats.residual = norm.as_f64();
            stats.converged = true;
            return stats;
        }

        let residual = std::mem::take(&mut self.residual);
        let mut aux = std::mem::take(&mut self.aux);
        self.apply_preconditioner(&residual, &mut aux);
        self.residual = residual;
        self.search.clone_from(&aux);
        let mut sigma = dot(&aux, &self.residual);

        while stats.iterations < self.params.max_iterations {
            stats.iterations += 1;
            self.apply_matrix(&self.search, &mut aux);
            let denom = dot(&aux, &self.search);
            if denom == T::zero() {
                break;
            }
            let alpha = sigma / denom;
            for k in 0..n {
                self.pressure[k] = self.pressure[k] + alpha * self.search[k];
                self.residual[k] = self.residual[k] - alpha * aux[k];
            }
            norm = max_abs(&self.residual);
            if norm < tol {
                stats.converged = true;
                break;
            }
            let residual = std::mem::take(&mut self.residual);
            self.apply_preconditioner(&residual, &mut aux);
            self.residual = residual;
            let sigma_new = dot(&aux, &self.residual);
            let beta = sigma_new / sigma;
            for k in 0..n {
                self.search[k] = aux[k] + beta * self.search[k];
            }
            sigma = sigma_new;
        }
        self.aux = aux;
        stats.residual = norm.as_f64();
        stats
    }

    fn solve_gauss_seidel(&mut self) -> SolveStats {
        let n = self.cells.len();
        let tol = T::lit(self.params.tolerance);
        self.pressure.iter_mut().for_each(|p| *p = T::zero());
        let mut stats = SolveStats {
            fluid_cells: n,
            ..SolveStats::default()
        };
        let mut norm = max_abs(&self.rhs);
        while norm >= tol && stats.iterations < self.params.max_iterations {
            stats.iterations += 1;
            for k in 0..n {
                if self.adiag[k] == T::zero() {
                    continue;
                }
                let cell = self.cells[k];
                let mut t = self.rhs[k];
                if let Some(r) = self.neighbour(cell, 1, 0) {
                    t = t - self.ax[k] * self.pressure[r];
                }
                if let Some(l) = self.neighbour(cell, -1, 0) {
                    t = t - self.ax[l] * self.pressure[l];
                }
                if let Some(a) = self.neighbour(cell, 0, 1) {
                    t = t - self.ay[k] * self.pressure[a];
                }
                if let Some(b) = self.neighbour(cell, 0, -1) {
                    t = t - self.ay[b] * self.pressure[b];
                }
                self.pressure[k] = t / self.adiag[k];
            }
            let mut product = std::mem::take(&mut self.aux);
            self.apply_matrix(&self.pressure, &mut product);
            for k in 0..n {
                self.residual[k] = self.rhs[k] - product[k];
            }
            self.aux = product;
            norm = max_abs(&self.residual);
        }
        stats.converged = norm < tol;
        stats.residual = norm.as_f64();
        stats
    }

    fn write_pressure(&self, mac: &mut MacGrid2<T>) {
        mac.p.fill(T::zero());
        for (k, &(i, j)) in self.cells.iter().enumerate() {
            mac.p.set(i, j, self.pressure[k]);
        }
    }

    fn update_velocity(&self, mac: &mut MacGrid2<T>, scale: T) {
        let labels = &mac.labels;
        let p = &mac.p;
        for j in 0..mac.u.height() {
            for i in 0..mac.u.width() {
                let (x, y) = (i as isize, j as isize);
                let (left, right) = (labels.get(x - 1, y), labels.get(x, y));
                if labels.is_solid(x - 1, y) || labels.is_solid(x, y) {
                    mac.u.set(i, j, T::zero());
                } else if left == Label::Fluid || right == Label::Fluid {
                    let delta = p.get(i, j) - p.get(i - 1, j);
                    mac.u.add_at(i, j, -scale * delta);
                }
            }
        }
        for j in 0..mac.v.height() {
            for i in 0..mac.v.width() {
                let (x, y) = (i as isize, j as isize);
                let (below, above) = (labels.get(x, y - 1), labels.get(x, y));
                if labels.is_solid(x, y - 1) || labels.is_solid(x, y) {
                    mac.v.set(i, j, T::zero());
                } else if below == Label::Fluid || above == Label::Fluid {
                    let delta = p.get(i, j) - p.get(i, j - 1);
                    mac.v.add_at(i, j, -scale * delta);
                }
            }
        }
    }
}

/// Zeroes the normal velocity on every outer face of the domain.
pub fn zero_border_faces<T: Real>(mac: &mut MacGrid2<T>) {
    let (nx, ny) = (mac.nx(), mac.ny());
    for j in 0..ny {
        mac.u.set(0, j, T::zero());
        mac.u.set(nx, j, T::zero());
    }
    for i in 0..nx {
        mac.v.set(i, 0, T::zero());
        mac.v.set(i, ny, T::zero());
    }
}

fn dot<T: Real>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (x, y)| acc + *x * *y)
}

fn max_abs<T: Real>(values: &[T]) -> T {
    values.iter().fold(T::zero(), |acc, v| acc.max(v.abs()))
}
