use std::f64::consts::TAU;

use super::grid::{SpectralField, WavenumberMesh};
use crate::error::{Result, SolverError};

/// ∆^(2n) hyperviscosity applied as an implicit factor 1 / (1 + ν ksqⁿ dt).
///
/// A disabled instance has ν = 0, so its factor is exactly 1 and the same
/// call path leaves damping to the spectral filter.
#[derive(Debug, Clone)]
pub struct Hyperviscosity {
    nu: f64,
    /// ksqⁿ per coefficient.
    ksq_n: Vec<f64>,
}

impl Hyperviscosity {
    /// ν such that the smallest resolved scale, Lx / (⌊nx/3⌋ 2π), is
    /// damped on timescale τ. Uses the x dimension as the reference scale.
    pub fn coefficient(lx: f64, nx: usize, order: f64, tau: f64) -> f64 {
        let scale = lx / ((nx / 3) as f64 * TAU);
        scale.powf(2.0 * order) / tau
    }

    pub fn new(mesh: &WavenumberMesh, order: f64, tau: f64) -> Result<Self> {
        if !(order > 0.0 && order.is_finite()) {
            return Err(SolverError::config(format!(
                "dissipation order must be positive, got {order}"
            )));
        }
        if !(tau > 0.0 && tau.is_finite()) {
            return Err(SolverError::config(format!(
                "dissipation timescale must be positive, got {tau}"
            )));
        }
        let nu = Self::coefficient(mesh.lx, mesh.nx, order, tau);
        let ksq_n = mesh.ksq.iter().map(|kk| kk.powf(order)).collect();
        Ok(Self { nu, ksq_n })
    }

    pub fn disabled(mesh: &WavenumberMesh) -> Self {
        Self {
            nu: 0.0,
            ksq_n: vec![0.0; mesh.spectral_len()],
        }
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn is_enabled(&self) -> bool {
        self.nu > 0.0
    }

    pub fn damping_factor(&self, dt: f64) -> Vec<f64> {
        self.ksq_n
            .iter()
            .map(|kn| 1.0 / (1.0 + self.nu * kn * dt))
            .collect()
    }

    pub fn apply(&self, field: &mut SpectralField, dt: f64) {
        if self.is_enabled() {
            field.mul_mask(&self.damping_factor(dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_coefficient_matches_reference_scale() {
        // nx = 256: ⌊256/3⌋ = 85 → scale = 1 / (85·2π)
        let nu = Hyperviscosity::coefficient(1.0, 256, 2.0, 0.1);
        let scale = 1.0 / (85.0 * TAU);
        let expected = scale.powi(4) / 0.1;
        assert!(((nu - expected) / expected).abs() < 1e-12, "nu={nu}");
    }

    #[test]
    fn test_factor_damps_high_wavenumbers_more() {
        let mesh = WavenumberMesh::new(32, 32, 1.0, 1.0).unwrap();
        let h = Hyperviscosity::new(&mesh, 2.0, 0.1).unwrap();
        let f = h.damping_factor(0.01);
        let low = f[1];
        let high = f[16];
        assert!(low < 1.0 && low > high, "low={low} high={high}");
        assert!(f.iter().all(|&v| v > 0.0 && v <= 1.0));
    }

    #[test]
    fn test_disabled_is_identity() {
        let mesh = WavenumberMesh::new(16, 16, 1.0, 1.0).unwrap();
        let h = Hyperviscosity::disabled(&mesh);
        assert!(!h.is_enabled());
        assert!(h.damping_factor(1.0).iter().all(|&v| v == 1.0));
        let mut field = SpectralField::zeros(&mesh);
        field.coeffs_mut()[5] = Complex64::new(2.0, -1.0);
        let before = field.clone();
        h.apply(&mut field, 1.0);
        assert_eq!(field, before);
    }

    #[test]
    fn test_rejects_inconsistent_parameters() {
        let mesh = WavenumberMesh::new(16, 16, 1.0, 1.0).unwrap();
        assert!(Hyperviscosity::new(&mesh, 2.0, 0.0).is_err());
        assert!(Hyperviscosity::new(&mesh, 0.0, 0.1).is_err());
        assert!(Hyperviscosity::new(&mesh, -1.0, 0.1).is_err());
    }
}
