use crate::{Field2, Label, LabelGrid, Real};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtrapolationStatus {
    Updated,
    FixedPoint,
}

/// Pushes field values outward from fluid cells into neighbouring empty cells.
///
/// The extrapolator keeps its own copy of the labels, so marking cells as
/// [`Label::Extrapolated`] never leaks back into the grid it was seeded from.
/// Labels are indexed with the field's sample indices; samples past the label
/// grid (the extra face column or row of a staggered velocity) read as solid
/// and copy through.
#[derive(Clone, Debug)]
pub struct Extrapolator<T = f64> {
    labels: LabelGrid,
    back_labels: LabelGrid,
    back: Field2<T>,
}

impl<T: Real> Extrapolator<T> {
    pub fn new(field: &Field2<T>, labels: &LabelGrid) -> Self {
        Self {
            labels: labels.clone(),
            back_labels: labels.clone(),
            back: field.clone(),
        }
    }

    pub fn labels(&self) -> &LabelGrid {
        &self.labels
    }

    /// Reloads the label snapshot, discarding any extrapolated marks.
    pub fn reset(&mut self, labels: &LabelGrid) {
        self.labels.copy_from(labels);
        self.back_labels.copy_from(labels);
    }

    /// One averaging pass over every empty sample with a near-fluid neighbour.
    pub fn step(&mut self, q: &mut Field2<T>) -> ExtrapolationStatus {
        assert_eq!(q.grid(), self.back.grid(), "field grid mismatch");
        let mut status = ExtrapolationStatus::FixedPoint;
        self.back_labels.copy_from(&self.labels);
        for j in 0..q.height() {
            for i in 0..q.width() {
                let (x, y) = (i as isize, j as isize);
                if !self.labels.is_empty(x, y) {
                    self.back.set(i, j, q.get(i, j));
                    continue;
                }
                let mut sum = T::zero();
                let mut count = 0usize;
                for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                    if self.labels.is_near_fluid(nx, ny) && q.grid().contains(nx, ny) {
                        sum = sum + q.get(nx as usize, ny as usize);
                        count += 1;
                    }
                }
                if count == 0 {
                    self.back.set(i, j, q.get(i, j));
                    continue;
                }
                self.back.set(i, j, sum / T::from_index(count));
                self.back_labels.set(i, j, Label::Extrapolated);
                status = ExtrapolationStatus::Updated;
            }
        }
        std::mem::swap(q, &mut self.back);
        std::mem::swap(&mut self.labels, &mut self.back_labels);
        status
    }

    /// Repeats [`Self::step`] until nothing changes, returning the number of updating passes.
    pub fn run(&mut self, q: &mut Field2<T>) -> usize {
        let mut passes = 0;
        while self.step(q) == ExtrapolationStatus::Updated {
            passes += 1;
        }
        passes
    }

    pub fn run_passes(&mut self, q: &mut Field2<T>, passes: usize) {
        for _ in 0..passes {
            let _ = self.step(q);
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

    #[test]
    fn single_step_reaches_orthogonal_neighbours_only() {
        let grid = Grid2::cell_centered(3, 3, 1.0);
        let mut q = Field2::new(grid, 0.0);
        q.set(1, 1, 5.0);
        let mut labels = LabelGrid::new(3, 3);
        labels.set(1, 1, Label::Fluid);
        let mut extrapolator = Extrapolator::new(&q, &labels);
        assert_eq!(extrapolator.step(&mut q), ExtrapolationStatus::Updated);
        for (i, j) in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            assert_close(q.get(i, j), 5.0, 1e-12);
            assert!(extrapolator.labels().is_extrapolated(i as isize, j as isize));
        }
        for (i, j) in [(0, 0), (2, 0), (0, 2), (2, 2)] {
            assert_close(q.get(i, j), 0.0, 1e-12);
            assert!(extrapolator.labels().is_empty(i as isize, j as isize));
        }
        extrapolator.step(&mut q);
        assert_close(q.get(0, 0), 5.0, 1e-12);
        assert!(labels.is_empty(0, 1), "source labels must stay untouched");
    }

    #[test]
    fn full_run_fills_enclosed_region_and_is_idempotent() {
        let n = 9;
        let grid = Grid2::cell_centered(n, n, 1.0);
        let mut q = Field2::new(grid, 0.0);
        q.set(4, 4, 2.5);
        let mut labels = LabelGrid::new(n, n);
        labels.set_solid_border();
        labels.set(4, 4, Label::Fluid);
        let mut extrapolator = Extrapolator::new(&q, &labels);
        let passes = extrapolator.run(&mut q);
        assert!(passes <= n, "took {passes} passes");
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                assert_close(q.get(i, j), 2.5, 1e-12);
                assert!(extrapolator.labels().is_near_fluid(i as isize, j as isize));
            }
        }
        assert_close(q.get(0, 0), 0.0, 1e-12);
        let settled = q.clone();
        assert_eq!(extrapolator.run(&mut q), 0);
        assert_eq!(q, settled);
    }

    #[test]
    fn enclosed_fluid_cell_spreads_nowhere() {
        let grid = Grid2::cell_centered(5, 5, 1.0);
        let mut q = Field2::from_fn(grid, |x, y| (x * 5 + y) as f64);
        let mut labels = LabelGrid::new(5, 5);
        labels.fill(Label::Solid);
        labels.set(2, 2, Label::Fluid);
        let before = q.clone();
        let mut extrapolator = Extrapolator::new(&q, &labels);
        assert_eq!(extrapolator.run(&mut q), 0);
        assert_eq!(q, before);
    }

    #[test]
    fn face_column_past_labels_copies_through() {
        let grid = Grid2::new(4, 3, 1.0, crate::Vec2::new(0.0, 0.5));
        let mut u = Field2::new(grid, 0.0);
        u.set(3, 1, 7.0);
        let mut labels = LabelGrid::new(3, 3);
        labels.set(2, 1, Label::Fluid);
        u.set(2, 1, 1.0);
        let mut extrapolator = Extrapolator::new(&u, &labels);
        extrapolator.run_passes(&mut u, 1);
        assert_close(u.get(3, 1), 7.0, 1e-12);
        assert_close(u.get(1, 1), 1.0, 1e-12);
    }
}
