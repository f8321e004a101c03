use std::f64::consts::TAU;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::grid::{SpectralField, SpectralGrid, WavenumberMesh};
use crate::error::Result;
use crate::state::SimulationState;

/// A source of vorticity tendency. The driver sums every registered
/// forcing into the right-hand side once per step.
pub trait Forcing: Send {
    fn tendency(&mut self, grid: &SpectralGrid, state: &SimulationState) -> Result<SpectralField>;
}

/// Stochastic forcing confined to the annulus k_lo < |k|/dk < k_hi.
///
/// Each retained coefficient gets a magnitude uniform in [-A/2, A/2) and a
/// phase uniform in [0, 2π), drawn fresh every step.
pub struct BandForcing {
    amplitude: f64,
    band: Vec<usize>,
    rng: StdRng,
}

impl BandForcing {
    pub fn new(mesh: &WavenumberMesh, amplitude: f64, k_lo: f64, k_hi: f64, seed: Option<u64>) -> Self {
        let band = mesh
            .kmag
            .iter()
            .enumerate()
            .filter(|&(_, &km)| k_lo < km && km < k_hi)
            .map(|(i, _)| i)
            .collect();
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { amplitude, band, rng }
    }

    /// Amplitude with the dimensions of dζ/dt: factor * max|ζ₀| / dt₀.
    pub fn amplitude_for(factor: f64, max_vorticity: f64, dt: f64) -> f64 {
        factor * max_vorticity / dt
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Indices of the forced coefficients.
    pub fn band(&self) -> &[usize] {
        &self.band
    }

    pub fn generate(&mut self, mesh: &WavenumberMesh) -> SpectralField {
        let mut out = SpectralField::zeros(mesh);
        let coeffs = out.coeffs_mut();
        for &i in &self.band {
            let magnitude = self.amplitude * self.rng.gen_range(-0.5..0.5);
            let phase = self.rng.gen_range(0.0..TAU);
            coeffs[i] = Complex64::from_polar(magnitude, phase);
        }
        out.symmetrize();
        out
    }
}

impl Forcing for BandForcing {
    fn tendency(&mut self, grid: &SpectralGrid, _state: &SimulationState) -> Result<SpectralField> {
        Ok(self.generate(grid.mesh()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> WavenumberMesh {
        WavenumberMesh::new(64, 64, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_band_confinement() {
        let m = mesh();
        let mut f = BandForcing::new(&m, 10.0, 14.0, 20.0, Some(1));
        assert!(!f.band().is_empty());
        let field = f.generate(&m);
        for (c, &km) in field.coeffs().iter().zip(&m.kmag) {
            if c.norm() > 0.0 {
                assert!(km > 14.0 && km < 20.0, "forced mode outside band: |k|={km}");
            }
        }
    }

    #[test]
    fn test_magnitude_order() {
        let m = mesh();
        let amp = 8.0;
        let mut f = BandForcing::new(&m, amp, 14.0, 20.0, Some(2));
        let field = f.generate(&m);
        let mags: Vec<f64> = f.band().iter().map(|&i| field.coeffs()[i].norm()).collect();
        assert!(mags.iter().all(|&v| v <= 0.5 * amp + 1e-12));
        // |U - 1/2| has mean 1/4
        let mean = mags.iter().sum::<f64>() / mags.len() as f64;
        assert!(mean > 0.15 * amp && mean < 0.35 * amp, "mean={mean}");
    }

    #[test]
    fn test_regenerated_each_call() {
        let m = mesh();
        let mut f = BandForcing::new(&m, 1.0, 14.0, 20.0, Some(3));
        let a = f.generate(&m);
        let b = f.generate(&m);
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_reproducible() {
        let m = mesh();
        let a = BandForcing::new(&m, 1.0, 14.0, 20.0, Some(9)).generate(&m);
        let b = BandForcing::new(&m, 1.0, 14.0, 20.0, Some(9)).generate(&m);
        assert_eq!(a, b);
    }

    #[test]
    fn test_forcing_is_real_field() {
        let grid = SpectralGrid::from_dims(64, 64, 1.0, 1.0).unwrap();
        let mut f = BandForcing::new(grid.mesh(), 1.0, 14.0, 20.0, Some(4));
        let field = f.generate(grid.mesh());
        let back = grid.forward(&grid.inverse(&field).unwrap()).unwrap();
        for (a, b) in field.coeffs().iter().zip(back.coeffs()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_amplitude_for() {
        assert!((BandForcing::amplitude_for(1.0, 3.0, 0.1) - 30.0).abs() < 1e-12);
        assert_eq!(BandForcing::amplitude_for(0.0, 3.0, 0.1), 0.0);
    }
}
