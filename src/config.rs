use crate::{Integrator, Interpolation, PressureParams, RedistanceParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for '{key}': {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidValue {
            key,
            value: value.to_string(),
            reason,
        }
    }
}

/// What the cell-centered scalar represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluidModel {
    /// Smoke-like density; positive cells are fluid.
    #[default]
    Density,
    /// Free-surface liquid tracked by a level set; negative cells are fluid.
    Liquid,
}

/// Source injected into the grid before every step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// World-space lower-left corner.
    pub position: [f64; 2],
    pub size: [f64; 2],
    pub density: f64,
    pub velocity: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub rows: usize,
    pub cols: usize,
    /// World size of one cell; `1 / rows` when unset.
    pub cell_size: Option<f64>,
    pub timestep: f64,
    /// Fluid density used by the projection.
    pub density: f64,
    /// Forwarded to frame exporters; the solver ignores it.
    pub save_frames: bool,
    pub model: FluidModel,
    /// Vertical acceleration applied to `v` every step.
    pub gravity: f64,
    pub integrator: Integrator,
    pub scalar_interpolation: Interpolation,
    pub pressure: PressureParams,
    pub redistance: RedistanceParams,
    pub sources: Vec<SourceConfig>,
    /// Radius in cells of the liquid drop placed at the grid center.
    pub initial_drop_radius: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rows: 64,
            cols: 64,
            cell_size: None,
            timestep: 0.01,
            density: 1.0,
            save_frames: false,
            model: FluidModel::Density,
            gravity: 0.0,
            integrator: Integrator::Rk3,
            scalar_interpolation: Interpolation::Cubic,
            pressure: PressureParams::default(),
            redistance: RedistanceParams::default(),
            sources: Vec::new(),
            initial_drop_radius: 3.0,
        }
    }
}

impl SolverConfig {
    /// Density plume fed from a thin inlet near the bottom of the domain.
    pub fn plume(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            sources: vec![SourceConfig {
                position: [0.45, 0.2],
                size: [0.1, 0.01],
                density: 1.0,
                velocity: [0.0, 3.0],
            }],
            ..Self::default()
        }
    }

    /// Liquid drop falling under gravity.
    pub fn liquid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            model: FluidModel::Liquid,
            gravity: -9.8,
            ..Self::default()
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
            .unwrap_or_else(|| 1.0 / self.rows.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 3 {
            return Err(ConfigError::invalid("rows", self.rows, "need at least 3 rows"));
        }
        if self.cols < 3 {
            return Err(ConfigError::invalid("cols", self.cols, "need at least 3 columns"));
        }
        let h = self.cell_size();
        if !(h.is_finite() && h > 0.0) {
            return Err(ConfigError::invalid("cell_size", h, "must be positive"));
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::invalid("timestep", self.timestep, "must be positive"));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ConfigError::invalid("density", self.density, "must be positive"));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::invalid("gravity", self.gravity, "must be finite"));
        }
        if !(self.pressure.tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "pressure.tolerance",
                self.pressure.tolerance,
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.pressure.tuning) {
            return Err(ConfigError::invalid(
                "pressure.tuning",
                self.pressure.tuning,
                "must be within [0, 1]",
            ));
        }
        if !(self.pressure.safety > 0.0 && self.pressure.safety <= 1.0) {
            return Err(ConfigError::invalid(
                "pressure.safety",
                self.pressure.safety,
                "must be within (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.redistance.relaxation) {
            return Err(ConfigError::invalid(
                "redistance.relaxation",
                self.redistance.relaxation,
                "must be within [0, 1]",
            ));
        }
        if !(self.redistance.epsilon > 0.0) {
            return Err(ConfigError::invalid(
                "redistance.epsilon",
                self.redistance.epsilon,
                "must be positive",
            ));
        }
        if !(self.redistance.band > 0.0) {
            return Err(ConfigError::invalid(
                "redistance.band",
                self.redistance.band,
                "must be positive",
            ));
        }
        for source in &self.sources {
            if source.size.iter().any(|s| !(*s >= 0.0)) {
                return Err(ConfigError::invalid(
                    "sources.size",
                    format!("{:?}", source.size),
                    "must be non-negative",
                ));
            }
        }
        Ok(())
    }
}
