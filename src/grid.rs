use crate::{Real, Vec2};

/// Sample layout of a field: dimensions, cell size, and where each sample sits inside its cell.
///
/// Grid-space positions are measured in cells from the domain corner, so the
/// sample `(x, y)` of a grid with offset `(ox, oy)` lives at `(x + ox, y + oy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid2<T = f64> {
    width: usize,
    height: usize,
    dx: T,
    offset: Vec2<T>,
}

impl<T: Real> Grid2<T> {
    pub fn new(width: usize, height: usize, dx: T, offset: Vec2<T>) -> Self {
        assert!(width > 0, "width must be > 0");
        assert!(height > 0, "height must be > 0");
        assert!(dx > T::zero(), "dx must be > 0");
        let offset = offset.clamped(Vec2::zero(), Vec2::splat(T::one()));
        Self {
            width,
            height,
            dx,
            offset,
        }
    }

    pub fn cell_centered(width: usize, height: usize, dx: T) -> Self {
        Self::new(width, height, dx, Vec2::splat(T::lit(0.5)))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dx(&self) -> T {
        self.dx
    }

    pub fn offset(&self) -> Vec2<T> {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.width && y < self.height,
            "({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn sample_position(&self, x: usize, y: usize) -> Vec2<T> {
        Vec2::new(
            T::from_index(x) + self.offset.x,
            T::from_index(y) + self.offset.y,
        )
    }

    pub fn to_grid_space(&self, world: Vec2<T>) -> Vec2<T> {
        world.scale(T::one() / self.dx)
    }

    pub fn to_world_space(&self, grid_pos: Vec2<T>) -> Vec2<T> {
        grid_pos.scale(self.dx)
    }

    pub fn world_width(&self) -> T {
        T::from_index(self.width) * self.dx
    }

    pub fn world_height(&self) -> T {
        T::from_index(self.height) * self.dx
    }
}
