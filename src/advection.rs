use crate::{Field2, LabelGrid, Real, Vec2};
use serde::{Deserialize, Serialize};

/// Time integrator used to backtrace a sample through the velocity field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    Euler,
    Rk2,
    #[default]
    Rk3,
}

/// Velocity at a grid-space position, in cells per unit time.
fn velocity_at<T: Real>(u: &Field2<T>, v: &Field2<T>, pos: Vec2<T>) -> Vec2<T> {
    let inv_h = T::one() / u.dx();
    Vec2::new(u.sample(pos), v.sample(pos)).scale(inv_h)
}

/// Where a particle now at `pos` was `dt` ago.
pub fn backtrace<T: Real>(
    pos: Vec2<T>,
    u: &Field2<T>,
    v: &Field2<T>,
    dt: T,
    integrator: Integrator,
) -> Vec2<T> {
    let v1 = velocity_at(u, v, pos);
    match integrator {
        Integrator::Euler => pos.sub(v1.scale(dt)),
        Integrator::Rk2 => {
            let mid = pos.sub(v1.scale(T::lit(0.5) * dt));
            let v2 = velocity_at(u, v, mid);
            pos.sub(v2.scale(dt))
        }
        Integrator::Rk3 => {
            let pos1 = pos.sub(v1.scale(T::lit(0.5) * dt));
            let v2 = velocity_at(u, v, pos1);
            let pos2 = pos.sub(v2.scale(T::lit(0.75) * dt));
            let v3 = velocity_at(u, v, pos2);
            let blend = v1
                .scale(T::lit(2.0 / 9.0))
                .add(v2.scale(T::lit(3.0 / 9.0)))
                .add(v3.scale(T::lit(4.0 / 9.0)));
            pos.sub(blend.scale(dt))
        }
    }
}

/// Semi-Lagrangian advection into a private back buffer.
///
/// [`Advector::advect`] only fills the back buffer; the live field is replaced
/// by [`Advector::swap`], so a velocity component can be advected by a
/// velocity field that includes itself.
#[derive(Clone, Debug)]
pub struct Advector<T = f64> {
    back: Field2<T>,
    integrator: Integrator,
}

impl<T: Real> Advector<T> {
    pub fn new(field: &Field2<T>, integrator: Integrator) -> Self {
        Self {
            back: field.clone(),
            integrator,
        }
    }

    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    pub fn advect(&mut self, q: &Field2<T>, u: &Field2<T>, v: &Field2<T>, dt: T) {
        self.advect_masked(q, u, v, None, dt);
    }

    /// Like [`Self::advect`], but samples whose own cell is solid in `labels` keep their value.
    pub fn advect_masked(
        &mut self,
        q: &Field2<T>,
        u: &Field2<T>,
        v: &Field2<T>,
        labels: Option<&LabelGrid>,
        dt: T,
    ) {
        assert_eq!(q.grid(), self.back.grid(), "field grid mismatch");
        let grid = q.grid();
        for j in 0..q.height() {
            for i in 0..q.width() {
                if labels.is_some_and(|l| l.is_solid(i as isize, j as isize)) {
                    self.back.set(i, j, q.get(i, j));
                    continue;
                }
                let pos = grid.sample_position(i, j);
                let from = backtrace(pos, u, v, dt, self.integrator);
                self.back.set(i, j, q.sample(from));
            }
        }
    }

    /// Publishes the last advection result into `q`.
    pub fn swap(&mut self, q: &mut Field2<T>) {
        assert_eq!(q.grid(), self.back.grid(), "field grid mismatch");
        std::mem::swap(q, &mut self.back);
    }
}
