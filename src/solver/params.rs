use super::filter::DEFAULT_DEALIAS_FRACTION;
use super::timestep::CourantController;
use crate::error::{Result, SolverError};

/// Physical and numerical parameters of the vorticity model.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Meridional gradient of the Coriolis parameter, f = f0 + βy.
    pub beta: f64,
    /// Background zonal velocity.
    pub ubar: f64,
    pub rayleigh_drag: f64,
    /// Hyperviscosity ∆^(2n); when off, only the spectral filter damps.
    pub dissipation: bool,
    pub n_diss: f64,
    /// e-folding time of the smallest resolved scale. Smaller = stronger.
    pub tau: f64,
    pub dealias: bool,
    pub dealias_fraction: f64,
    pub filter: bool,
    pub filter_kcut: f64,
    pub filter_exponent: f64,
    pub adaptive: bool,
    pub slowdown_at: f64,
    pub speedup_at: f64,
    pub allow_speedup: bool,
    /// Courant number treated as blow-up.
    pub courant_limit: f64,
    /// Forcing amplitude relative to max|ζ₀| / dt₀. 0 disables forcing.
    pub forcing_amp_factor: f64,
    pub forcing_k_lo: f64,
    pub forcing_k_hi: f64,
    pub seed: Option<u64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            beta: 4.0,
            ubar: 0.0,
            rayleigh_drag: 1.0e-4,
            dissipation: false,
            n_diss: 2.0,
            tau: 0.1,
            dealias: true,
            dealias_fraction: DEFAULT_DEALIAS_FRACTION,
            filter: true,
            filter_kcut: 30.0,
            filter_exponent: 8.0,
            adaptive: true,
            slowdown_at: 0.6,
            speedup_at: 0.4,
            allow_speedup: true,
            courant_limit: 2.0,
            forcing_amp_factor: 1.0,
            forcing_k_lo: 14.0,
            forcing_k_hi: 20.0,
            seed: None,
        }
    }
}

impl SolverParams {
    /// Unforced, undamped flow on an f-plane with a fixed timestep.
    /// Only the dealiasing truncation stays on.
    pub fn free_decay() -> Self {
        Self {
            beta: 0.0,
            rayleigh_drag: 0.0,
            dissipation: false,
            filter: false,
            adaptive: false,
            forcing_amp_factor: 0.0,
            ..Self::default()
        }
    }

    pub fn controller(&self) -> CourantController {
        CourantController {
            enabled: self.adaptive,
            slowdown_at: self.slowdown_at,
            speedup_at: self.speedup_at,
            allow_speedup: self.allow_speedup,
        }
    }

    /// Checks that do not need the grid. Grid-dependent limits (filter
    /// cutoff, dissipation scale) are checked when the operators are built.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("beta", self.beta),
            ("ubar", self.ubar),
            ("rayleigh_drag", self.rayleigh_drag),
            ("forcing_amp_factor", self.forcing_amp_factor),
            ("courant_limit", self.courant_limit),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(SolverError::config(format!("{name} must be finite, got {value}")));
            }
        }
        if self.rayleigh_drag < 0.0 {
            return Err(SolverError::config(format!(
                "rayleigh_drag must be non-negative, got {}",
                self.rayleigh_drag
            )));
        }
        if self.dissipation && !(self.n_diss > 0.0 && self.tau > 0.0) {
            return Err(SolverError::config(format!(
                "dissipation needs n_diss > 0 and tau > 0, got n_diss={} tau={}",
                self.n_diss, self.tau
            )));
        }
        if !(self.speedup_at > 0.0 && self.speedup_at < self.slowdown_at) {
            return Err(SolverError::config(format!(
                "adaptive thresholds must satisfy 0 < speedup_at < slowdown_at, got {} and {}",
                self.speedup_at, self.slowdown_at
            )));
        }
        if self.courant_limit <= self.slowdown_at {
            return Err(SolverError::config(format!(
                "courant_limit {} must exceed slowdown_at {}",
                self.courant_limit, self.slowdown_at
            )));
        }
        if self.forcing_amp_factor < 0.0 {
            return Err(SolverError::config(format!(
                "forcing_amp_factor must be non-negative, got {}",
                self.forcing_amp_factor
            )));
        }
        if self.forcing_amp_factor > 0.0 && !(self.forcing_k_lo >= 0.0 && self.forcing_k_lo < self.forcing_k_hi) {
            return Err(SolverError::config(format!(
                "forcing band must satisfy 0 <= k_lo < k_hi, got [{}, {}]",
                self.forcing_k_lo, self.forcing_k_hi
            )));
        }
        Ok(())
    }
}

/// Time axis of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSchedule {
    /// Initial timestep; the controller changes it afterwards.
    pub dt: f64,
    pub tmax: f64,
    pub diag_every: f64,
    pub plot_every: f64,
}

impl RunSchedule {
    /// Default initial dt scales with resolution: 0.4 * 16 / nx.
    pub fn for_grid(nx: usize) -> Self {
        Self {
            dt: 0.4 * 16.0 / nx as f64,
            tmax: 100_000.0,
            diag_every: 10.0,
            plot_every: 100.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SolverError::config(format!("dt must be positive, got {}", self.dt)));
        }
        if !(self.tmax >= 0.0) {
            return Err(SolverError::config(format!("tmax must be non-negative, got {}", self.tmax)));
        }
        if !(self.diag_every > 0.0 && self.plot_every > 0.0) {
            return Err(SolverError::config(format!(
                "output intervals must be positive, got diag_every={} plot_every={}",
                self.diag_every, self.plot_every
            )));
        }
        Ok(())
    }
}
