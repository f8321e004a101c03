use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::solver::filter::arbic_flierl_mask;
use crate::solver::grid::{idx_inner, SpectralField, SpectralGrid, WavenumberMesh};
use crate::solver::integrator::AdamsBashforth3;

/// How the initial vorticity is produced.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialCondition {
    /// Random phases under a McWilliams (1984) spectral slope.
    McWilliams,
    /// One Gaussian vortex.
    Gaussian,
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self::McWilliams
    }
}

/// Everything that changes from one step to the next.
///
/// The driver builds a fresh value each step and swaps it in only once the
/// step has succeeded, so observers never see a half-updated state.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Spectral relative vorticity ζ̂.
    pub zeta: SpectralField,
    pub time: f64,
    pub step: u64,
    /// dt used by the most recent step (the initial dt before any step).
    pub dt: f64,
    /// Courant number measured at the start of the most recent step.
    pub courant: f64,
    /// Multistep history.
    pub integrator: AdamsBashforth3,
}

impl SimulationState {
    pub fn new(zeta: SpectralField, dt: f64, courant: f64) -> Self {
        Self {
            zeta,
            time: 0.0,
            step: 0,
            dt,
            courant,
            integrator: AdamsBashforth3::new(),
        }
    }
}

/// Per-diagnostic-interval energy record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub step: u64,
    pub time: f64,
    pub urms: f64,
    pub kinetic_energy: f64,
}

/// Full-field view of the flow for renderers and other observers.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub nx: usize,
    pub ny: usize,
    pub step: u64,
    pub time: f64,
    pub dt: f64,
    pub courant: f64,
    /// Relative vorticity, row-major (ny rows of nx).
    pub vorticity: Vec<f64>,
    /// ζ + βy.
    pub potential_vorticity: Vec<f64>,
    /// Row averages of u and q, one per y.
    pub zonal_mean_u: Vec<f64>,
    pub zonal_mean_pv: Vec<f64>,
    pub urms: f64,
    pub max_vorticity: f64,
    pub rhines_scale: Option<f64>,
    pub dissipation_scale: Option<f64>,
}

/// McWilliams (1984) initial vorticity.
///
/// Streamfunction coefficients are Gaussian noise scaled by
/// 1 / sqrt(ksq + 1 + (ksq/36)²), the field is made zero-mean in real space
/// and normalized so that the kinetic energy seen through the Arbic-Flierl
/// filter, summed over the nx·ny grid points, is 1. The domain-mean kinetic
/// energy is therefore 1/(nx·ny). Returns ζ̂ = -ksq ψ̂.
pub fn mcwilliams<R: Rng>(grid: &SpectralGrid, rng: &mut R) -> Result<SpectralField> {
    let mesh = grid.mesh();
    let mut psi = SpectralField::zeros(mesh);
    for (c, &kk) in psi.coeffs_mut().iter_mut().zip(&mesh.ksq) {
        let ck = 1.0 / (kk + 1.0 + (kk / 36.0).powi(2)).sqrt();
        let re: f64 = rng.sample(StandardNormal);
        let im: f64 = rng.sample(StandardNormal);
        *c = Complex64::new(re * ck, im * ck);
    }

    let mut psi_real = grid.inverse(&psi)?;
    let mean = psi_real.iter().sum::<f64>() / psi_real.len() as f64;
    for p in psi_real.iter_mut() {
        *p -= mean;
    }
    let mut psi = grid.forward(&psi_real)?;

    let filter = arbic_flierl_mask(mesh);
    let mut speed = psi.clone();
    for ((c, &kk), &f) in speed.coeffs_mut().iter_mut().zip(&mesh.ksq).zip(&filter) {
        *c *= kk.sqrt() * f;
    }
    let ke_total = 0.5 * grid.spectral_variance(&speed)? * mesh.real_len() as f64;
    if !(ke_total > 0.0 && ke_total.is_finite()) {
        return Err(SolverError::config("initial condition has no resolved energy"));
    }
    psi.scale(1.0 / ke_total.sqrt());

    let mut zeta = psi;
    for (c, &kk) in zeta.coeffs_mut().iter_mut().zip(&mesh.ksq) {
        *c *= -kk;
    }
    Ok(zeta)
}

/// Periodic Gaussian vortex ζ = A exp(-r² / 2σ²) centred at (x0, y0), with
/// r measured to the nearest periodic image.
pub fn gaussian_blob(mesh: &WavenumberMesh, amplitude: f64, x0: f64, y0: f64, sigma: f64) -> Vec<f64> {
    let wrap = |d: f64, period: f64| d - period * (d / period).round();
    let mut zeta = vec![0.0; mesh.real_len()];
    for j in 0..mesh.ny {
        let dy = wrap(j as f64 * mesh.dy() - y0, mesh.ly);
        for i in 0..mesh.nx {
            let dx = wrap(i as f64 * mesh.dx() - x0, mesh.lx);
            let r2 = dx * dx + dy * dy;
            zeta[idx_inner(i, j, mesh.nx)] = amplitude * (-r2 / (2.0 * sigma * sigma)).exp();
        }
    }
    zeta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::diagnostics::max_abs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initial_condition_default_is_mcwilliams() {
        assert_eq!(InitialCondition::default(), InitialCondition::McWilliams);
    }

    #[test]
    fn test_new_state_starts_at_zero() {
        let mesh = WavenumberMesh::new(8, 8, 1.0, 1.0).unwrap();
        let s = SimulationState::new(SpectralField::zeros(&mesh), 0.1, 0.0);
        assert_eq!(s.time, 0.0);
        assert_eq!(s.step, 0);
        assert_eq!(s.dt, 0.1);
        assert_eq!(s.integrator.steps(), 0);
    }

    #[test]
    fn test_gaussian_blob_peak_and_periodicity() {
        let mesh = WavenumberMesh::new(32, 32, 1.0, 1.0).unwrap();
        let zeta = gaussian_blob(&mesh, 2.0, 0.5, 0.5, 0.05);
        assert!((zeta[idx_inner(16, 16, 32)] - 2.0).abs() < 1e-15);
        assert!((max_abs(&zeta) - 2.0).abs() < 1e-15);
        // blob at the corner wraps onto all four corners
        let corner = gaussian_blob(&mesh, 1.0, 0.0, 0.0, 0.05);
        let a = corner[idx_inner(1, 0, 32)];
        let b = corner[idx_inner(31, 0, 32)];
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_mcwilliams_filtered_energy_summed_over_grid() {
        let grid = SpectralGrid::from_dims(32, 32, 1.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let zeta = mcwilliams(&grid, &mut rng).unwrap();
        let mesh = grid.mesh();
        let filter = arbic_flierl_mask(mesh);
        // |k| ψ̂ = |k| (-ζ̂ / ksq)
        let mut speed = zeta.clone();
        for ((c, &kk), &f) in speed.coeffs_mut().iter_mut().zip(&mesh.ksq).zip(&filter) {
            *c *= f / kk.sqrt();
        }
        let ke = 0.5 * grid.spectral_variance(&speed).unwrap();
        let total = ke * mesh.real_len() as f64;
        assert!((total - 1.0).abs() < 1e-10, "total={total}");
    }

    #[test]
    fn test_mcwilliams_zero_mean_real_field() {
        let grid = SpectralGrid::from_dims(32, 32, 1.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let zeta = mcwilliams(&grid, &mut rng).unwrap();
        assert!(zeta.coeffs()[0].norm() < 1e-9);
        let back = grid.forward(&grid.inverse(&zeta).unwrap()).unwrap();
        for (a, b) in zeta.coeffs().iter().zip(back.coeffs()) {
            assert!((a - b).norm() < 1e-8 * (1.0 + a.norm()));
        }
    }

    #[test]
    fn test_snapshot_serializes() {
        let snap = Snapshot {
            nx: 1,
            ny: 1,
            step: 3,
            time: 0.5,
            dt: 0.1,
            courant: 0.3,
            vorticity: vec![1.0],
            potential_vorticity: vec![1.0],
            zonal_mean_u: vec![0.0],
            zonal_mean_pv: vec![1.0],
            urms: 0.0,
            max_vorticity: 1.0,
            rhines_scale: None,
            dissipation_scale: Some(0.1),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"step\":3"));
        assert!(json.contains("\"rhines_scale\":null"));
    }
}
