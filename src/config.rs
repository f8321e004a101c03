use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::{Result, SolverError};
use crate::solver::{RunSchedule, SolverParams};
use crate::state::InitialCondition;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "barovort.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub physics: PhysicsConfig,
    pub numerics: NumericsConfig,
    pub timestep: TimestepConfig,
    pub run: RunConfig,
    pub initial: InitialConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub beta: f64,
    pub ubar: f64,
    pub rayleigh_drag: f64,
    pub forcing_amp_factor: f64,
    pub forcing_k_lo: f64,
    pub forcing_k_hi: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NumericsConfig {
    pub dissipation: bool,
    pub n_diss: f64,
    pub tau: f64,
    pub dealias: bool,
    pub dealias_fraction: f64,
    pub filter: bool,
    pub filter_exponent: f64,
    pub filter_kcut: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimestepConfig {
    /// Initial dt; unset means 0.4 * 16 / nx.
    pub dt: Option<f64>,
    pub adaptive: bool,
    pub allow_speedup: bool,
    pub slowdown_at: f64,
    pub speedup_at: f64,
    pub courant_limit: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub tmax: f64,
    pub diag_every: f64,
    pub plot_every: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InitialConfig {
    pub kind: InitialCondition,
    /// Gaussian vortex parameters.
    pub amplitude: f64,
    pub x0: f64,
    pub y0: f64,
    pub sigma: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: 256,
            ny: 256,
            lx: 1.0,
            ly: 1.0,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let p = SolverParams::default();
        Self {
            beta: p.beta,
            ubar: p.ubar,
            rayleigh_drag: p.rayleigh_drag,
            forcing_amp_factor: p.forcing_amp_factor,
            forcing_k_lo: p.forcing_k_lo,
            forcing_k_hi: p.forcing_k_hi,
        }
    }
}

impl Default for NumericsConfig {
    fn default() -> Self {
        let p = SolverParams::default();
        Self {
            dissipation: p.dissipation,
            n_diss: p.n_diss,
            tau: p.tau,
            dealias: p.dealias,
            dealias_fraction: p.dealias_fraction,
            filter: p.filter,
            filter_exponent: p.filter_exponent,
            filter_kcut: p.filter_kcut,
        }
    }
}

impl Default for TimestepConfig {
    fn default() -> Self {
        let p = SolverParams::default();
        Self {
            dt: None,
            adaptive: p.adaptive,
            allow_speedup: p.allow_speedup,
            slowdown_at: p.slowdown_at,
            speedup_at: p.speedup_at,
            courant_limit: p.courant_limit,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tmax: 100_000.0,
            diag_every: 10.0,
            plot_every: 100.0,
            seed: None,
        }
    }
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            kind: InitialCondition::McWilliams,
            amplitude: 10.0,
            x0: 0.5,
            y0: 0.5,
            sigma: 0.05,
        }
    }
}

impl Config {
    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            beta: self.physics.beta,
            ubar: self.physics.ubar,
            rayleigh_drag: self.physics.rayleigh_drag,
            dissipation: self.numerics.dissipation,
            n_diss: self.numerics.n_diss,
            tau: self.numerics.tau,
            dealias: self.numerics.dealias,
            dealias_fraction: self.numerics.dealias_fraction,
            filter: self.numerics.filter,
            filter_kcut: self.numerics.filter_kcut,
            filter_exponent: self.numerics.filter_exponent,
            adaptive: self.timestep.adaptive,
            slowdown_at: self.timestep.slowdown_at,
            speedup_at: self.timestep.speedup_at,
            allow_speedup: self.timestep.allow_speedup,
            courant_limit: self.timestep.courant_limit,
            forcing_amp_factor: self.physics.forcing_amp_factor,
            forcing_k_lo: self.physics.forcing_k_lo,
            forcing_k_hi: self.physics.forcing_k_hi,
            seed: self.run.seed,
        }
    }

    pub fn schedule(&self) -> RunSchedule {
        let default = RunSchedule::for_grid(self.grid.nx.max(1));
        RunSchedule {
            dt: self.timestep.dt.unwrap_or(default.dt),
            tmax: self.run.tmax,
            diag_every: self.run.diag_every,
            plot_every: self.run.plot_every,
        }
    }

    /// Checks that need no FFT planning. Grid-dependent operator limits are
    /// checked again when the simulation is built.
    pub fn validate(&self) -> Result<()> {
        if self.grid.nx < 4 || self.grid.ny < 4 || self.grid.nx % 2 != 0 {
            return Err(SolverError::config(format!(
                "grid must be at least 4x4 with even nx, got {}x{}",
                self.grid.nx, self.grid.ny
            )));
        }
        if self.initial.kind == InitialCondition::Gaussian && !(self.initial.sigma > 0.0) {
            return Err(SolverError::config(format!(
                "gaussian sigma must be positive, got {}",
                self.initial.sigma
            )));
        }
        self.solver_params().validate()?;
        self.schedule().validate()
    }
}

pub fn load() -> Config {
    load_from(Path::new(CONFIG_FILE))
}

/// Read a config file. A missing file gives defaults silently; an unreadable
/// or malformed one gives defaults with a warning.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("failed to parse {}: {e}; using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            warn!("failed to read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
