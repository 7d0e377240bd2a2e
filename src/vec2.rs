use crate::Real;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2<T = f64> {
    pub x: T,
    pub y: T,
}

impl<T: Real> Vec2<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    pub fn splat(value: T) -> Self {
        Self::new(value, value)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, s: T) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn length(self) -> T {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn clamped(self, lo: Self, hi: Self) -> Self {
        Self::new(self.x.max(lo.x).min(hi.x), self.y.max(lo.y).min(hi.y))
    }
}
