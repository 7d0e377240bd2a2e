use crate::real::signum_ztn;
use crate::{Extrapolator, Field2, Label, LabelGrid, Real};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedistanceParams {
    /// Coarse distance, in cells, given to samples away from the interface.
    pub band: f64,
    /// Smoothing width of the sign function.
    pub epsilon: f64,
    pub iterations: usize,
    /// Pseudo-time step of each relaxation pass, in cells.
    pub relaxation: f64,
    /// Extrapolation passes used to widen the crossing band.
    pub indicator_passes: usize,
}

impl Default for RedistanceParams {
    fn default() -> Self {
        Self {
            band: 2.0,
            epsilon: 0.5,
            iterations: 8,
            relaxation: 0.5,
            indicator_passes: 2,
        }
    }
}

/// Pulls a level set back toward a signed distance function around its zero crossing.
///
/// The level set is measured in cells. Samples whose sign differs from a
/// neighbour mark the interface; the mark is widened by a few extrapolation
/// passes and only that band is relaxed toward `|grad phi| = 1`, each pass
/// stepping from the previous one. Everything else collapses to `±band`.
#[derive(Clone, Debug)]
pub struct Redistancer<T = f64> {
    params: RedistanceParams,
    crossings: Field2<T>,
    crossing_labels: LabelGrid,
    widen: Extrapolator<T>,
    init: Field2<T>,
    ssf: Field2<T>,
    back: Field2<T>,
}

impl<T: Real> Redistancer<T> {
    pub fn new(field: &Field2<T>, params: RedistanceParams) -> Self {
        let grid = field.grid();
        let crossings = Field2::new(grid, T::zero());
        let crossing_labels = LabelGrid::new(grid.width(), grid.height());
        let widen = Extrapolator::new(&crossings, &crossing_labels);
        Self {
            params,
            crossings,
            crossing_labels,
            widen,
            init: field.clone(),
            ssf: Field2::new(grid, T::zero()),
            back: field.clone(),
        }
    }

    pub fn params(&self) -> RedistanceParams {
        self.params
    }

    /// Crossing indicator from the last call, widened by extrapolation.
    pub fn crossings(&self) -> &Field2<T> {
        &self.crossings
    }

    /// Whether `(i, j)` was relaxed in the last call.
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        self.widen.labels().is_near_fluid(i as isize, j as isize)
    }

    /// Redistances `phi` in place, returning how many samples were relaxed.
    pub fn redistance(&mut self, phi: &mut Field2<T>) -> usize {
        assert_eq!(phi.grid(), self.init.grid(), "field grid mismatch");
        self.detect_crossings(phi);
        self.widen.reset(&self.crossing_labels);
        self.widen
            .run_passes(&mut self.crossings, self.params.indicator_passes);

        let band = T::lit(self.params.band);
        let eps2 = T::lit(self.params.epsilon * self.params.epsilon);
        let mut relaxed = 0;
        for j in 0..phi.height() {
            for i in 0..phi.width() {
                let value = phi.get(i, j);
                let coarse = band * signum_ztn(value);
                let init = if self.in_band(i, j) {
                    relaxed += 1;
                    value.max(-band).min(band)
                } else {
                    coarse
                };
                self.init.set(i, j, init);
                self.ssf.set(i, j, init / (init * init + eps2).sqrt());
            }
        }

        // Pseudo-time step, in cells like `phi` and its gradient.
        let step = T::lit(self.params.relaxation);
        phi.copy_from(&self.init);
        for _ in 0..self.params.iterations {
            for j in 0..phi.height() {
                for i in 0..phi.width() {
                    let current = phi.get(i, j);
                    if !self.in_band(i, j) {
                        self.back.set(i, j, current);
                        continue;
                    }
                    let grad = phi.gradient(i, j).length();
                    let next = current - step * self.ssf.get(i, j) * (grad - T::one());
                    self.back.set(i, j, next.max(-band).min(band));
                }
            }
            std::mem::swap(phi, &mut self.back);
        }
        log::trace!("redistanced {relaxed} samples around the interface");
        relaxed
    }

    fn detect_crossings(&mut self, phi: &Field2<T>) {
        let (w, h) = (phi.width(), phi.height());
        for j in 0..h {
            for i in 0..w {
                let inside = phi.get(i, j) >= T::zero();
                let differs = |x: usize, y: usize| (phi.get(x, y) >= T::zero()) != inside;
                let crossing = (i > 0 && differs(i - 1, j))
                    || (i + 1 < w && differs(i + 1, j))
                    || (j > 0 && differs(i, j - 1))
                    || (j + 1 < h && differs(i, j + 1));
                let (value, label) = if crossing {
                    (T::one(), Label::Fluid)
                } else {
                    (T::zero(), Label::Empty)
                };
                self.crossings.set(i, j, value);
                self.crossing_labels.set(i, j, label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grid2;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn root_in_row(phi: &Field2, j: usize) -> Option<f64> {
        (0..phi.width() - 1).find_map(|i| {
            let (a, b) = (phi.get(i, j), phi.get(i + 1, j));
            ((a < 0.0) != (b < 0.0)).then(|| i as f64 + a / (a - b))
        })
    }

    #[test]
    fn planar_distance_keeps_its_interface() {
        let grid = Grid2::cell_centered(16, 16, 1.0 / 16.0);
        let mut phi = Field2::from_fn(grid, |x, _| x as f64 - 7.3);
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        let relaxed = redistancer.redistance(&mut phi);
        assert_eq!(relaxed, 16 * 6);
        for j in 0..16 {
            let root = root_in_row(&phi, j).unwrap();
            assert!((root - 7.3).abs() < 1.0, "row {j}: root at {root}");
            assert_close(phi.get(7, j), -0.3, 1e-9);
            assert_close(phi.get(8, j), 0.7, 1e-9);
        }
        assert_close(phi.get(0, 3), -2.0, 1e-12);
        assert_close(phi.get(15, 3), 2.0, 1e-12);
    }

    fn circle(radius: f64) -> Field2 {
        let grid = Grid2::cell_centered(16, 16, 1.0 / 16.0);
        Field2::from_fn(grid, move |x, y| {
            let dx = x as f64 - 7.5;
            let dy = y as f64 - 7.5;
            (dx * dx + dy * dy).sqrt() - radius
        })
    }

    fn inside(phi: &Field2) -> usize {
        phi.data().iter().filter(|v| **v < 0.0).count()
    }

    #[test]
    fn circular_distance_keeps_its_interface() {
        let exact = circle(5.3);
        let mut phi = exact.clone();
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        redistancer.redistance(&mut phi);

        let (before, after) = (inside(&exact), inside(&phi));
        assert!(before.abs_diff(after) <= 4, "inside cells {before} -> {after}");
        for j in 0..16 {
            for i in 0..16 {
                let reference = exact.get(i, j);
                if reference.abs() < 1.0 {
                    assert!(
                        (phi.get(i, j) - reference).abs() < 0.5,
                        "({i}, {j}): {} vs {reference}",
                        phi.get(i, j)
                    );
                }
            }
            if let (Some(a), Some(b)) = (root_in_row(&exact, j), root_in_row(&phi, j)) {
                assert!((a - b).abs() < 1.0, "row {j}: root {a} -> {b}");
            }
        }
    }

    #[test]
    fn repeated_redistancing_is_stable() {
        let mut phi = circle(4.2);
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        redistancer.redistance(&mut phi);
        let first = inside(&phi);
        for _ in 0..10 {
            redistancer.redistance(&mut phi);
        }
        assert!(first.abs_diff(inside(&phi)) <= 4);
        assert!(phi.get(7, 7) < 0.0);
        assert!(phi.get(0, 0) > 0.0);
    }

    #[test]
    fn crossings_are_widened_by_two_cells() {
        let grid = Grid2::cell_centered(12, 4, 1.0);
        let mut phi = Field2::from_fn(grid, |x, _| x as f64 - 5.5);
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        redistancer.redistance(&mut phi);
        for i in 0..12 {
            assert_eq!(redistancer.in_band(i, 1), (3..=8).contains(&i), "column {i}");
        }
        assert_close(redistancer.crossings().get(3, 1), 1.0, 1e-12);
        assert_close(redistancer.crossings().get(1, 1), 0.0, 1e-12);
    }

    #[test]
    fn values_stay_within_band() {
        let grid = Grid2::cell_centered(20, 20, 0.05);
        let mut phi = Field2::from_fn(grid, |x, y| {
            let dx = x as f64 - 9.5;
            let dy = y as f64 - 9.5;
            (dx * dx + dy * dy).sqrt() * 1.7 - 5.0
        });
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        redistancer.redistance(&mut phi);
        let (lo, hi) = phi.min_max();
        assert!(lo >= -2.0 && hi <= 2.0);
        assert!(phi.get(10, 10) < 0.0);
        assert!(phi.get(0, 0) > 0.0);
    }

    #[test]
    fn uniform_sign_has_no_band() {
        let grid = Grid2::cell_centered(5, 5, 1.0);
        let mut phi = Field2::new(grid, 3.0);
        let mut redistancer = Redistancer::new(&phi, RedistanceParams::default());
        assert_eq!(redistancer.redistance(&mut phi), 0);
        assert!(phi.data().iter().all(|v| *v == 2.0));
    }
}
