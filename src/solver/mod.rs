pub mod diagnostics;
pub mod dissipation;
pub mod filter;
pub mod forcing;
pub mod grid;
pub mod integrator;
pub mod nonlinear;
mod params;
pub mod timestep;

// Re-export public API
pub use forcing::{BandForcing, Forcing};
pub use grid::{SpectralField, SpectralGrid, WavenumberMesh};
pub use params::{RunSchedule, SolverParams};

use log::{debug, info};

use crate::error::{Result, SolverError};
use crate::state::{DiagnosticRecord, SimulationState, Snapshot};
use diagnostics::{
    compute_kinetic_energy, compute_potential_vorticity, compute_rms_velocity, compute_spectral_kinetic_energy,
    dissipation_scale, max_abs, rhines_scale, zonal_mean,
};
use dissipation::Hyperviscosity;
use filter::{Dealias, HighWavenumberFilter};
use nonlinear::advection;
use timestep::{courant_number, CourantController};

/// What one call to [`Simulation::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: u64,
    pub time: f64,
    /// dt consumed by this step, after the controller adjusted it.
    pub dt: f64,
    /// Courant number measured before the adjustment.
    pub courant: f64,
}

/// Beta-plane barotropic vorticity model on a doubly periodic grid.
///
/// Operators are built once from the parameters; the state is replaced as a
/// whole on every successful step.
pub struct Simulation {
    grid: SpectralGrid,
    params: SolverParams,
    dealias: Option<Dealias>,
    filter: Option<HighWavenumberFilter>,
    hyperviscosity: Hyperviscosity,
    controller: CourantController,
    forcings: Vec<Box<dyn Forcing>>,
    state: SimulationState,
}

impl Simulation {
    /// Build a simulation from spectral vorticity. The initial field is
    /// dealiased; a band forcing is registered when the amplitude factor is
    /// positive, scaled by max|ζ₀| / dt.
    pub fn new(grid: SpectralGrid, params: SolverParams, initial: SpectralField, dt: f64) -> Result<Self> {
        params.validate()?;
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SolverError::config(format!("dt must be positive, got {dt}")));
        }
        let mesh = grid.mesh();
        initial.check_shape(mesh)?;
        if !initial.is_finite() {
            return Err(SolverError::config("initial vorticity contains NaN or Inf"));
        }

        let dealias = if params.dealias {
            Some(Dealias::new(mesh, params.dealias_fraction)?)
        } else {
            None
        };
        let filter = if params.filter {
            Some(HighWavenumberFilter::new(mesh, params.filter_kcut, params.filter_exponent)?)
        } else {
            None
        };
        let hyperviscosity = if params.dissipation {
            Hyperviscosity::new(mesh, params.n_diss, params.tau)?
        } else {
            Hyperviscosity::disabled(mesh)
        };

        let mut zeta = initial;
        if let Some(d) = &dealias {
            d.apply(&mut zeta);
        }

        let psi = grid.streamfunction(&zeta)?;
        let (u, v) = grid.velocity_from_streamfunction(&psi)?;
        let courant = courant_number(&u, &v, dt, mesh.dx());

        let mut forcings: Vec<Box<dyn Forcing>> = Vec::new();
        if params.forcing_amp_factor > 0.0 {
            let max_vort = max_abs(&grid.inverse(&zeta)?);
            let amplitude = BandForcing::amplitude_for(params.forcing_amp_factor, max_vort, dt);
            let seed = params.seed.map(|s| s.wrapping_add(1));
            let band = BandForcing::new(mesh, amplitude, params.forcing_k_lo, params.forcing_k_hi, seed);
            info!(
                "band forcing: amplitude {amplitude:.4e}, {} coefficients in ({}, {})",
                band.band().len(),
                params.forcing_k_lo,
                params.forcing_k_hi
            );
            forcings.push(Box::new(band));
        }

        info!(
            "simulation ready: {}x{} grid, beta={}, dt0={dt}, courant0={courant:.3}",
            mesh.nx, mesh.ny, params.beta
        );

        Ok(Self {
            controller: params.controller(),
            state: SimulationState::new(zeta, dt, courant),
            grid,
            params,
            dealias,
            filter,
            hyperviscosity,
            forcings,
        })
    }

    /// Same as [`Simulation::new`] from real-space vorticity.
    pub fn from_real(grid: SpectralGrid, params: SolverParams, zeta: &[f64], dt: f64) -> Result<Self> {
        if zeta.iter().any(|z| !z.is_finite()) {
            return Err(SolverError::config("initial vorticity contains NaN or Inf"));
        }
        let initial = grid.forward(zeta)?;
        Self::new(grid, params, initial, dt)
    }

    /// Advance one step. On error the previous state is kept.
    pub fn step(&mut self) -> Result<StepReport> {
        let current = &self.state;
        let instability = |reason: String| SolverError::NumericalInstability {
            step: current.step,
            time: current.time,
            reason,
        };

        let adv = advection(&self.grid, &current.zeta, self.params.ubar)?;

        let courant = courant_number(&adv.u, &adv.v, current.dt, self.grid.mesh().dx());
        if let Some(reason) = self.courant_failure(courant) {
            return Err(instability(reason));
        }
        let dt = self.controller.adjust(current.dt, courant);
        if dt != current.dt {
            debug!("step {}: courant {courant:.3}, dt {:.4e} -> {dt:.4e}", current.step, current.dt);
        }

        let mut forcing = SpectralField::zeros(self.grid.mesh());
        for f in self.forcings.iter_mut() {
            let tendency = f.tendency(&self.grid, current)?;
            forcing.same_shape(&tendency)?;
            forcing.axpy(1.0, &tendency);
        }

        // rhs = -J - β ψ_x + F - r ζ
        let mut rhs = adv.jacobian;
        rhs.scale(-1.0);
        rhs.axpy(-self.params.beta, &adv.psi_x);
        rhs.axpy(1.0, &forcing);
        rhs.axpy(-self.params.rayleigh_drag, &current.zeta);

        let mut integrator = current.integrator.clone();
        let mut zeta = integrator.step(&current.zeta, rhs, dt)?;
        self.hyperviscosity.apply(&mut zeta, dt);
        if let Some(d) = &self.dealias {
            d.apply(&mut zeta);
        }
        if let Some(f) = &self.filter {
            f.apply(&mut zeta);
        }
        if !zeta.is_finite() {
            return Err(instability("non-finite vorticity".to_string()));
        }

        let next = SimulationState {
            zeta,
            time: current.time + dt,
            step: current.step + 1,
            dt,
            courant,
            integrator,
        };
        self.state = next;

        Ok(StepReport {
            step: self.state.step,
            time: self.state.time,
            dt,
            courant,
        })
    }

    /// Blow-up test on this step's Courant number.
    ///
    /// Non-finite C is always fatal. Above the limit the controller gets to
    /// act: C over the limit only fails when there is no controller, or when
    /// the previous step was already over the limit and slowed down and C has
    /// not fallen since.
    fn courant_failure(&self, courant: f64) -> Option<String> {
        let limit = self.params.courant_limit;
        if !courant.is_finite() {
            return Some(format!("non-finite Courant number {courant}"));
        }
        if courant <= limit {
            return None;
        }
        if !self.controller.enabled {
            return Some(format!("Courant number {courant:.3} exceeds limit {limit} with fixed dt"));
        }
        let prev = self.state.courant;
        if self.state.step > 0 && prev > limit && courant >= prev {
            return Some(format!(
                "Courant number rose from {prev:.3} to {courant:.3} above limit {limit} despite dt reduction"
            ));
        }
        None
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    pub fn mesh(&self) -> &WavenumberMesh {
        self.grid.mesh()
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn add_forcing(&mut self, forcing: Box<dyn Forcing>) {
        self.forcings.push(forcing);
    }

    /// Drop the multistep history; the next step restarts with forward Euler.
    pub fn restart_integrator(&mut self) {
        self.state.integrator.reset();
    }

    /// Real-space relative vorticity.
    pub fn vorticity(&self) -> Result<Vec<f64>> {
        self.grid.inverse(&self.state.zeta)
    }

    /// Real-space velocity (u, v).
    pub fn velocity(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        let psi = self.grid.streamfunction(&self.state.zeta)?;
        self.grid.velocity_from_streamfunction(&psi)
    }

    /// Kinetic energy from the spectral streamfunction.
    pub fn kinetic_energy(&self) -> Result<f64> {
        let psi = self.grid.streamfunction(&self.state.zeta)?;
        compute_spectral_kinetic_energy(&self.grid, &psi)
    }

    pub fn diagnostic(&self) -> Result<DiagnosticRecord> {
        let (u, v) = self.velocity()?;
        Ok(DiagnosticRecord {
            step: self.state.step,
            time: self.state.time,
            urms: compute_rms_velocity(&u, &v),
            kinetic_energy: compute_kinetic_energy(&u, &v),
        })
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let mesh = self.grid.mesh();
        let vorticity = self.vorticity()?;
        let (u, v) = self.velocity()?;
        let urms = compute_rms_velocity(&u, &v);
        let ke = compute_kinetic_energy(&u, &v);
        let potential_vorticity = compute_potential_vorticity(&vorticity, self.params.beta, mesh);
        Ok(Snapshot {
            nx: mesh.nx,
            ny: mesh.ny,
            step: self.state.step,
            time: self.state.time,
            dt: self.state.dt,
            courant: self.state.courant,
            max_vorticity: max_abs(&vorticity),
            zonal_mean_u: zonal_mean(&u, mesh.nx, mesh.ny),
            zonal_mean_pv: zonal_mean(&potential_vorticity, mesh.nx, mesh.ny),
            urms,
            rhines_scale: rhines_scale(urms, self.params.beta),
            dissipation_scale: dissipation_scale(self.params.rayleigh_drag, ke, self.params.beta),
            vorticity,
            potential_vorticity,
        })
    }
}
