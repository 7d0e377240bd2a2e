mod advection;
mod config;
mod extrapolation;
mod field;
mod grid;
mod label;
mod mac;
mod projection;
mod real;
mod redistancing;
mod solver;
mod vec2;

pub use advection::{backtrace, Advector, Integrator};
pub use config::{ConfigError, FluidModel, SolverConfig, SourceConfig};
pub use extrapolation::{ExtrapolationStatus, Extrapolator};
pub use field::{Field2, Interpolation, SourceShape};
pub use grid::Grid2;
pub use label::{Label, LabelGrid};
pub use mac::{Classification, MacGrid2};
pub use projection::{zero_border_faces, PressureMethod, PressureParams, PressureSolver, SolveStats};
pub use real::Real;
pub use redistancing::{RedistanceParams, Redistancer};
pub use solver::Solver;
pub use vec2::Vec2;
