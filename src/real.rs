use num_traits::Float;
use std::fmt;

/// Floating-point element type shared by every field in the solver.
pub trait Real: Float + Default + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn lit(value: f64) -> Self;

    fn as_f64(self) -> f64;

    fn floor_index(self) -> isize {
        self.floor().as_f64() as isize
    }

    fn from_index(index: usize) -> Self {
        Self::lit(index as f64)
    }
}

impl Real for f32 {
    fn lit(value: f64) -> Self {
        value as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Real for f64 {
    fn lit(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }
}

/// Catmull-Rom weights over four consecutive samples, `t` in `[0, 1]` between `b` and `c`.
pub fn cerp<T: Real>(t: T, a: T, b: T, c: T, d: T) -> T {
    let t2 = t * t;
    let t3 = t2 * t;
    let half = T::lit(0.5);
    let wa = -half * t + t2 - half * t3;
    let wb = T::one() - T::lit(2.5) * t2 + T::lit(1.5) * t3;
    let wc = half * t + T::lit(2.0) * t2 - T::lit(1.5) * t3;
    let wd = -half * t2 + half * t3;
    wa * a + wb * b + wc * c + wd * d
}

/// Catmull-Rom interpolation clamped to the local sample range so it never overshoots.
pub fn cerp_clamped<T: Real>(t: T, a: T, b: T, c: T, d: T) -> T {
    let lo = a.min(b).min(c.min(d));
    let hi = a.max(b).max(c.max(d));
    cerp(t, a, b, c, d).max(lo).min(hi)
}

pub fn lerp<T: Real>(t: T, a: T, b: T) -> T {
    a + (b - a) * t
}

pub fn hermite<T: Real>(t: T) -> T {
    t * t * (T::lit(3.0) - T::lit(2.0) * t)
}

/// Sign with zero mapped to `-1`, so a zero sample always lands on one side of the interface.
pub fn signum_ztn<T: Real>(value: T) -> T {
    if value > T::zero() {
        T::one()
    } else {
        -T::one()
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

    #[test]
    fn cerp_hits_inner_samples() {
        assert_close(cerp(0.0, 1.0, 2.0, 5.0, 3.0), 2.0, 1e-12);
        assert_close(cerp(1.0, 1.0, 2.0, 5.0, 3.0), 5.0, 1e-12);
    }

    #[test]
    fn cerp_clamped_stays_in_sample_range() {
        let value = cerp_clamped(0.5, 0.0, 0.0, 1.0, 1.0);
        assert!((0.0..=1.0).contains(&value));
        let spike = cerp_clamped(0.9_f64, 0.0, 1.0, 1.0, 0.0);
        assert!(spike <= 1.0);
    }

    #[test]
    fn hermite_endpoints() {
        assert_close(hermite(0.0), 0.0, 1e-12);
        assert_close(hermite(1.0), 1.0, 1e-12);
        assert_close(hermite(0.5), 0.5, 1e-12);
    }

    #[test]
    fn signum_maps_zero_to_negative() {
        assert_eq!(signum_ztn(0.0_f32), -1.0);
        assert_eq!(signum_ztn(2.0_f64), 1.0);
    }
}
