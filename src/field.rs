use crate::real::{cerp_clamped, hermite, lerp};
use crate::{Grid2, Real, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clamp margin, in cells, kept between an interpolation stencil and the far edge.
const CLAMP_MARGIN: f64 = 1.001;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Linear,
    #[default]
    Cubic,
}

/// Footprint used when injecting a source into a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    /// Every sample in the rectangle receives the full value.
    #[default]
    Box,
    /// Full value at the rectangle center falling to zero at its edge.
    Smooth,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field2<T = f64> {
    grid: Grid2<T>,
    interpolation: Interpolation,
    data: Vec<T>,
}

impl<T: Real> Field2<T> {
    pub fn new(grid: Grid2<T>, fill: T) -> Self {
        let data = vec![fill; grid.size()];
        Self {
            grid,
            interpolation: Interpolation::Linear,
            data,
        }
    }

    pub fn from_fn(grid: Grid2<T>, f: impl Fn(usize, usize) -> T) -> Self {
        let width = grid.width();
        let data = (0..grid.size())
            .map(|i| {
                let x = i % width;
                let y = i / width;
                f(x, y)
            })
            .collect();
        Self {
            grid,
            interpolation: Interpolation::Linear,
            data,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn grid(&self) -> Grid2<T> {
        self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn dx(&self) -> T {
        self.grid.dx()
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.grid.idx(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.grid.idx(x, y);
        self.data[idx] = value;
    }

    pub fn add_at(&mut self, x: usize, y: usize, delta: T) {
        let idx = self.grid.idx(x, y);
        self.data[idx] = self.data[idx] + delta;
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> T) {
        let width = self.grid.width();
        for (i, value) in self.data.iter_mut().enumerate() {
            let x = i % width;
            let y = i / width;
            *value = f(x, y);
        }
    }

    pub fn update_with_index(&mut self, f: impl Fn(usize, usize, T) -> T) {
        let width = self.grid.width();
        for (i, value) in self.data.iter_mut().enumerate() {
            let x = i % width;
            let y = i / width;
            *value = f(x, y, *value);
        }
    }

    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.grid, other.grid, "field grid mismatch");
        self.data.clone_from(&other.data);
    }

    /// Samples the field at a grid-space position using the field's interpolation policy.
    ///
    /// Positions outside the sample box are clamped onto it first, so the
    /// field extends by its nearest boundary values instead of reading out
    /// of range.
    pub fn sample(&self, grid_pos: Vec2<T>) -> T {
        match self.interpolation {
            Interpolation::Linear => self.sample_linear(grid_pos),
            Interpolation::Cubic => self.sample_cubic(grid_pos),
        }
    }

    pub fn sample_world(&self, world: Vec2<T>) -> T {
        self.sample(self.grid.to_grid_space(world))
    }

    pub fn sample_linear(&self, grid_pos: Vec2<T>) -> T {
        let (i, j, x, y) = self.locate(grid_pos);
        let v00 = self.get(i, j);
        let v10 = self.get(i + 1, j);
        let v01 = self.get(i, j + 1);
        let v11 = self.get(i + 1, j + 1);
        lerp(y, lerp(x, v00, v10), lerp(x, v01, v11))
    }

    pub fn sample_cubic(&self, grid_pos: Vec2<T>) -> T {
        let (i, j, x, y) = self.locate(grid_pos);
        let xs = [i.saturating_sub(1), i, i + 1, (i + 2).min(self.width() - 1)];
        let ys = [j.saturating_sub(1), j, j + 1, (j + 2).min(self.height() - 1)];
        let row = |yy: usize| {
            cerp_clamped(
                x,
                self.get(xs[0], yy),
                self.get(xs[1], yy),
                self.get(xs[2], yy),
                self.get(xs[3], yy),
            )
        };
        cerp_clamped(y, row(ys[0]), row(ys[1]), row(ys[2]), row(ys[3]))
    }

    /// Lower-left stencil index and fractional weights for a grid-space position.
    fn locate(&self, grid_pos: Vec2<T>) -> (usize, usize, T, T) {
        assert!(
            self.width() > 1 && self.height() > 1,
            "interpolation needs at least 2x2 samples, field is {}x{}",
            self.width(),
            self.height()
        );
        let margin = T::lit(CLAMP_MARGIN);
        let upper = Vec2::new(
            T::from_index(self.width()) - margin,
            T::from_index(self.height()) - margin,
        );
        let pos = grid_pos
            .sub(self.grid.offset())
            .clamped(Vec2::zero(), upper);
        let i = pos.x.floor_index() as usize;
        let j = pos.y.floor_index() as usize;
        (i, j, pos.x - T::from_index(i), pos.y - T::from_index(j))
    }

    /// Writes `value` over a world-space rectangle wherever it exceeds the existing magnitude.
    pub fn add_region(&mut self, world_pos: Vec2<T>, size: Vec2<T>, value: T, shape: SourceShape) {
        let offset = self.grid.offset();
        let lo = self.grid.to_grid_space(world_pos).sub(offset);
        let hi = self.grid.to_grid_space(world_pos.add(size)).sub(offset);
        let Some((i0, i1)) = region_span(lo.x, hi.x, self.width()) else {
            return;
        };
        let Some((j0, j1)) = region_span(lo.y, hi.y, self.height()) else {
            return;
        };
        let center = lo.add(hi).scale(T::lit(0.5));
        let half = hi.sub(lo).scale(T::lit(0.5));
        for j in j0..=j1 {
            for i in i0..=i1 {
                let v = match shape {
                    SourceShape::Box => value,
                    SourceShape::Smooth => {
                        let d = Vec2::new(
                            normalized_offset(T::from_index(i), center.x, half.x),
                            normalized_offset(T::from_index(j), center.y, half.y),
                        );
                        let l = d.length().min(T::one());
                        (T::one() - hermite(l)) * value
                    }
                };
                if self.get(i, j).abs() < v.abs() {
                    self.set(i, j, v);
                }
            }
        }
    }

    /// Upwind-biased one-sided difference at a sample, in field units per cell.
    ///
    /// Each axis differences toward whichever neighbour has the smaller
    /// magnitude, falling back to the only neighbour at the border.
    pub fn gradient(&self, x: usize, y: usize) -> Vec2<T> {
        Vec2::new(
            one_sided(x, self.width(), |k| self.get(k, y)),
            one_sided(y, self.height(), |k| self.get(x, k)),
        )
    }

    pub fn min_max(&self) -> (T, T) {
        let mut iter = self.data.iter().filter(|value| value.is_finite());
        let Some(first) = iter.next() else {
            return (T::zero(), T::zero());
        };
        iter.fold((*first, *first), |(lo, hi), value| (lo.min(*value), hi.max(*value)))
    }

    pub fn max_abs(&self) -> T {
        self.data
            .iter()
            .fold(T::zero(), |acc, value| acc.max(value.abs()))
    }

    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, value| acc + *value)
    }
}

fn region_span<T: Real>(lo: T, hi: T, len: usize) -> Option<(usize, usize)> {
    let max = len as isize - 1;
    let mut start = lo.ceil().as_f64() as isize;
    let mut end = hi.floor().as_f64() as isize;
    // Regions thinner than a cell still touch the sample nearest their center.
    if end < start {
        start = ((lo + hi) * T::lit(0.5)).round().as_f64() as isize;
        end = start;
    }
    if end < 0 || start > max {
        return None;
    }
    Some((start.clamp(0, max) as usize, end.clamp(0, max) as usize))
}

fn normalized_offset<T: Real>(k: T, center: T, half: T) -> T {
    if half <= T::zero() {
        T::zero()
    } else {
        (k - center) / half
    }
}

fn one_sided<T: Real>(k: usize, len: usize, at: impl Fn(usize) -> T) -> T {
    if len < 2 {
        return T::zero();
    }
    if k == 0 {
        return at(k + 1) - at(k);
    }
    if k == len - 1 {
        return at(k) - at(k - 1);
    }
    if at(k - 1).abs() < at(k + 1).abs() {
        at(k) - at(k - 1)
    } else {
        at(k + 1) - at(k)
    }
}

impl<T: Real> fmt::Display for Field2<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for y in 0..self.height() {
            for x in 0..self.width() {
                write!(f, "{:.4}", self.get(x, y))?;
                if x + 1 < self.width() {
                    write!(f, ",")?;
                }
            }
            if y + 1 < self.height() {
                writeln!(f)?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn ramp(width: usize, height: usize) -> Field2 {
        let grid = Grid2::cell_centered(width, height, 1.0);
        Field2::from_fn(grid, |x, y| (x + y * 10) as f64)
    }

    #[test]
    fn from_fn_maps_coords() {
        let field = ramp(3, 2);
        assert_close(field.get(2, 1), 12.0, 1e-12);
    }

    #[test]
    fn sample_linear_matches_sample_positions() {
        let field = ramp(4, 4);
        let pos = field.grid().sample_position(1, 2);
        assert_close(field.sample_linear(pos), 21.0, 1e-12);
        let between = Vec2::new(2.0, 2.5);
        assert_close(field.sample_linear(between), 21.5, 1e-12);
    }

    #[test]
    fn sample_cubic_reproduces_linear_ramp() {
        let field = ramp(6, 6).with_interpolation(Interpolation::Cubic);
        let pos = Vec2::new(2.75, 3.25);
        assert_close(field.sample(pos), field.sample_linear(pos), 1e-9);
    }

    #[test]
    fn sample_clamps_outside_positions() {
        let field = ramp(4, 4);
        let far = field.sample_linear(Vec2::new(-10.0, -10.0));
        assert_close(far, 0.0, 1e-12);
        let beyond = field.sample_linear(Vec2::new(100.0, 0.5));
        assert!(beyond <= 3.0 && beyond > 2.9);
    }

    #[test]
    fn sample_constant_is_constant() {
        let grid = Grid2::new(5, 4, 0.25, Vec2::new(0.0, 0.5));
        let field = Field2::new(grid, 3.5).with_interpolation(Interpolation::Cubic);
        for pos in [Vec2::new(0.1, 0.2), Vec2::new(4.9, 3.7), Vec2::new(-2.0, 9.0)] {
            assert_close(field.sample(pos), 3.5, 1e-12);
        }
    }

    #[test]
    fn add_region_keeps_larger_magnitudes() {
        let grid = Grid2::cell_centered(8, 8, 0.125);
        let mut field = Field2::new(grid, 0.0);
        field.set(3, 3, -5.0);
        field.add_region(Vec2::new(0.25, 0.25), Vec2::new(0.25, 0.25), 1.0, SourceShape::Box);
        assert_close(field.get(2, 2), 1.0, 1e-12);
        assert_close(field.get(3, 3), -5.0, 1e-12);
        assert_close(field.get(6, 6), 0.0, 1e-12);
    }

    #[test]
    fn add_region_outside_domain_is_ignored() {
        let grid = Grid2::cell_centered(4, 4, 1.0);
        let mut field = Field2::new(grid, 0.0);
        field.add_region(Vec2::new(10.0, 10.0), Vec2::new(1.0, 1.0), 1.0, SourceShape::Box);
        assert_close(field.sum(), 0.0, 1e-12);
    }

    #[test]
    fn smooth_region_peaks_at_center() {
        let grid = Grid2::cell_centered(9, 9, 1.0);
        let mut field = Field2::new(grid, 0.0);
        field.add_region(Vec2::new(0.5, 0.5), Vec2::new(8.0, 8.0), 2.0, SourceShape::Smooth);
        assert_close(field.get(4, 4), 2.0, 1e-12);
        assert!(field.get(2, 4) < 2.0 && field.get(2, 4) > 0.0);
        assert_close(field.get(0, 4), 0.0, 1e-12);
    }

    #[test]
    fn gradient_prefers_smaller_neighbour() {
        let grid = Grid2::cell_centered(3, 1, 1.0);
        let field = Field2::from_fn(grid, |x, _| [0.5, 1.5, 4.0][x]);
        assert_close(field.gradient(1, 0).x, 1.0, 1e-12);
        assert_close(field.gradient(0, 0).x, 1.0, 1e-12);
        assert_close(field.gradient(2, 0).x, 2.5, 1e-12);
        assert_close(field.gradient(1, 0).y, 0.0, 1e-12);
    }

    #[test]
    fn clone_is_independent() {
        let mut a = ramp(3, 3);
        let b = a.clone();
        a.set(0, 0, 99.0);
        assert_close(b.get(0, 0), 0.0, 1e-12);
    }

    #[test]
    fn copy_from_overwrites_values() {
        let source = ramp(3, 3);
        let mut target = Field2::new(source.grid(), 7.0);
        target.copy_from(&source);
        assert_eq!(target, source);
    }

    #[test]
    #[should_panic(expected = "field grid mismatch")]
    fn copy_from_rejects_other_shapes() {
        let mut target = ramp(3, 3);
        target.copy_from(&ramp(2, 3));
    }

    #[test]
    fn min_max_reports_bounds() {
        let field = ramp(2, 2);
        let (lo, hi) = field.min_max();
        assert_close(lo, 0.0, 1e-12);
        assert_close(hi, 11.0, 1e-12);
    }

    #[test]
    fn display_lists_rows() {
        let grid = Grid2::cell_centered(2, 2, 1.0);
        let field = Field2::from_fn(grid, |x, y| (x + 2 * y) as f64);
        assert_eq!(
            field.to_string(),
            "[0.0000,1.0000\n2.0000,3.0000]"
        );
    }
}
