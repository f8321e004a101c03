use std::f64::consts::{PI, TAU};

use super::grid::{SpectralField, WavenumberMesh};
use crate::error::{Result, SolverError};

/// Default circular truncation fraction of (nk + 1)².
pub const DEFAULT_DEALIAS_FRACTION: f64 = 8.0 / 9.0;

/// Circular truncation: zero every coefficient with
/// (|k|/dk)² >= fraction * (nk + 1)².
#[derive(Debug, Clone)]
pub struct Dealias {
    mask: Vec<f64>,
}

impl Dealias {
    pub fn new(mesh: &WavenumberMesh, fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction.is_finite()) {
            return Err(SolverError::config(format!(
                "dealias fraction must be positive, got {fraction}"
            )));
        }
        let k_mask = fraction * ((mesh.nk + 1) as f64).powi(2);
        let mask = mesh
            .kmag
            .iter()
            .map(|&km| if km * km >= k_mask { 0.0 } else { 1.0 })
            .collect();
        Ok(Self { mask })
    }

    pub fn apply(&self, field: &mut SpectralField) {
        field.mul_mask(&self.mask);
    }

    pub fn mask(&self) -> &[f64] {
        &self.mask
    }
}

/// Exponential high-wavenumber filter (Smith et al. 2002).
/// Waves at or below `kcut` (in units of dk) pass unchanged; above it the
/// amplitude is multiplied by exp(decay * (|k| - kcut)^exponent), with the
/// decay chosen so the factor is 1/(1 + 2π/nk) at |k| = nk.
#[derive(Debug, Clone)]
pub struct HighWavenumberFilter {
    factor: Vec<f64>,
}

impl HighWavenumberFilter {
    pub fn new(mesh: &WavenumberMesh, kcut: f64, exponent: f64) -> Result<Self> {
        let nk = mesh.nk as f64;
        if !(kcut >= 0.0 && kcut < nk) {
            return Err(SolverError::config(format!(
                "filter cutoff {kcut} must lie in [0, {nk})"
            )));
        }
        if !(exponent > 0.0 && exponent.is_finite()) {
            return Err(SolverError::config(format!(
                "filter exponent must be positive, got {exponent}"
            )));
        }
        let decay = Self::decay(nk, kcut, exponent);
        let factor = mesh
            .kmag
            .iter()
            .map(|&km| {
                if km > kcut {
                    (decay * (km - kcut).powf(exponent)).exp()
                } else {
                    1.0
                }
            })
            .collect();
        Ok(Self { factor })
    }

    pub fn decay(nk: f64, kcut: f64, exponent: f64) -> f64 {
        -(1.0 + TAU / nk).ln() / (nk - kcut).powf(exponent)
    }

    pub fn apply(&self, field: &mut SpectralField) {
        field.mul_mask(&self.factor);
    }

    pub fn factor(&self) -> &[f64] {
        &self.factor
    }
}

/// Spectral filter of Arbic & Flierl (2003), as a mask over the mesh.
/// 1 for grid-scaled wavenumber κ = sqrt((k dx)² + (l dy)²) <= 0.65π,
/// exp(-23.6 (κ - 0.65π)⁴) above.
pub fn arbic_flierl_mask(mesh: &WavenumberMesh) -> Vec<f64> {
    let (dx, dy) = (mesh.dx(), mesh.dy());
    let mut mask = Vec::with_capacity(mesh.spectral_len());
    for &l in &mesh.l {
        for &k in &mesh.k {
            let kappa = ((k * dx).powi(2) + (l * dy).powi(2)).sqrt();
            let cut = 0.65 * PI;
            mask.push(if kappa <= cut {
                1.0
            } else {
                (-23.6 * (kappa - cut).powi(4)).exp()
            });
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::grid::idx_inner;
    use num_complex::Complex64;

    fn mesh() -> WavenumberMesh {
        WavenumberMesh::new(64, 64, 1.0, 1.0).unwrap()
    }

    fn ones(mesh: &WavenumberMesh) -> SpectralField {
        let mut f = SpectralField::zeros(mesh);
        for (i, c) in f.coeffs_mut().iter_mut().enumerate() {
            *c = Complex64::new(1.0 + i as f64 * 1e-3, -0.5);
        }
        f
    }

    #[test]
    fn test_dealias_idempotent() {
        let m = mesh();
        let d = Dealias::new(&m, DEFAULT_DEALIAS_FRACTION).unwrap();
        let mut once = ones(&m);
        d.apply(&mut once);
        let mut twice = once.clone();
        d.apply(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dealias_cutoff() {
        let m = mesh();
        let d = Dealias::new(&m, DEFAULT_DEALIAS_FRACTION).unwrap();
        // (nk+1)² * 8/9 = 34² * 8/9 ≈ 1027.6 → |k| up to 32 along an axis kept,
        // corner modes removed.
        let nk = m.nk;
        assert_eq!(d.mask()[idx_inner(32, 0, nk)], 1.0);
        assert_eq!(d.mask()[idx_inner(0, 32, nk)], 1.0);
        assert_eq!(d.mask()[idx_inner(30, 30, nk)], 0.0);
        assert_eq!(d.mask()[0], 1.0);
    }

    #[test]
    fn test_dealias_two_thirds_rule_is_configurable() {
        let m = mesh();
        let d = Dealias::new(&m, 4.0 / 9.0).unwrap();
        let kept = d.mask().iter().filter(|&&v| v == 1.0).count();
        let d89 = Dealias::new(&m, DEFAULT_DEALIAS_FRACTION).unwrap();
        let kept89 = d89.mask().iter().filter(|&&v| v == 1.0).count();
        assert!(kept < kept89);
        assert!(Dealias::new(&m, 0.0).is_err());
    }

    #[test]
    fn test_filter_passes_below_cutoff() {
        let m = mesh();
        let f = HighWavenumberFilter::new(&m, 30.0, 8.0).unwrap();
        for (factor, &km) in f.factor().iter().zip(&m.kmag) {
            if km <= 30.0 {
                assert_eq!(*factor, 1.0);
            } else {
                // just past the cutoff the factor rounds to 1.0
                assert!(*factor <= 1.0 && *factor >= 0.0);
                if km - 30.0 > 1.0 {
                    assert!(*factor < 1.0, "k={km} factor={factor}");
                }
            }
        }
    }

    #[test]
    fn test_filter_reaches_target_at_max_wavenumber() {
        let nk = 33.0;
        let decay = HighWavenumberFilter::decay(nk, 30.0, 8.0);
        let at_max = (decay * (nk - 30.0_f64).powf(8.0)).exp();
        assert!((at_max - 1.0 / (1.0 + TAU / nk)).abs() < 1e-12);
    }

    #[test]
    fn test_filter_rejects_cutoff_beyond_grid() {
        let m = WavenumberMesh::new(32, 32, 1.0, 1.0).unwrap();
        assert!(matches!(
            HighWavenumberFilter::new(&m, 30.0, 8.0),
            Err(SolverError::Configuration(_))
        ));
        assert!(HighWavenumberFilter::new(&m, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_dealias_and_filter_commute() {
        let m = mesh();
        let d = Dealias::new(&m, DEFAULT_DEALIAS_FRACTION).unwrap();
        let f = HighWavenumberFilter::new(&m, 20.0, 4.0).unwrap();
        let mut a = ones(&m);
        d.apply(&mut a);
        f.apply(&mut a);
        let mut b = ones(&m);
        f.apply(&mut b);
        d.apply(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_arbic_flierl_mask() {
        let m = mesh();
        let mask = arbic_flierl_mask(&m);
        assert_eq!(mask.len(), m.spectral_len());
        assert_eq!(mask[0], 1.0);
        // Nyquist corner: κ = π√2 well above 0.65π
        let corner = mask[idx_inner(32, 32, m.nk)];
        assert!(corner < 1e-3, "corner={corner}");
        assert!(mask.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
