use super::grid::{idx_inner, SpectralField, SpectralGrid, WavenumberMesh};
use crate::error::Result;

/// Root-mean-square speed: sqrt(<u² + v²>).
pub fn compute_rms_velocity(u: &[f64], v: &[f64]) -> f64 {
    if u.is_empty() {
        return 0.0;
    }
    let sum: f64 = u.iter().zip(v).map(|(a, b)| a * a + b * b).sum();
    (sum / u.len() as f64).sqrt()
}

/// Domain-averaged kinetic energy: KE = 0.5 * urms².
pub fn compute_kinetic_energy(u: &[f64], v: &[f64]) -> f64 {
    let urms = compute_rms_velocity(u, v);
    0.5 * urms * urms
}

/// Kinetic energy from the spectral streamfunction, 0.5 * (<ψ_x²> + <ψ_y²>),
/// through the Hermitian-weighted variance.
pub fn compute_spectral_kinetic_energy(grid: &SpectralGrid, psi: &SpectralField) -> Result<f64> {
    let (psi_x, psi_y) = grid.gradient(psi)?;
    Ok(0.5 * (grid.spectral_variance(&psi_x)? + grid.spectral_variance(&psi_y)?))
}

pub fn max_abs(field: &[f64]) -> f64 {
    field.iter().map(|v| v.abs()).fold(0.0_f64, f64::max)
}

/// Potential vorticity q = ζ + βy, with y = j·dy along rows.
///
/// Row j = 0 is y = 0. Rows are not flipped for display.
pub fn compute_potential_vorticity(zeta: &[f64], beta: f64, mesh: &WavenumberMesh) -> Vec<f64> {
    let mut q = zeta.to_vec();
    for j in 0..mesh.ny {
        let by = beta * j as f64 * mesh.dy();
        for i in 0..mesh.nx {
            q[idx_inner(i, j, mesh.nx)] += by;
        }
    }
    q
}

/// Average along x for each row.
pub fn zonal_mean(field: &[f64], nx: usize, ny: usize) -> Vec<f64> {
    (0..ny)
        .map(|j| field[j * nx..(j + 1) * nx].iter().sum::<f64>() / nx as f64)
        .collect()
}

/// Rhines scale sqrt(urms / β). None on an f-plane.
pub fn rhines_scale(urms: f64, beta: f64) -> Option<f64> {
    (beta > 0.0).then(|| (urms / beta).sqrt())
}

/// Dissipation scale (ε / β³)^(1/5) with ε = 2 r KE. None on an f-plane.
pub fn dissipation_scale(rayleigh_drag: f64, kinetic_energy: f64, beta: f64) -> Option<f64> {
    (beta > 0.0).then(|| {
        let epsilon = 2.0 * rayleigh_drag * kinetic_energy;
        (epsilon / beta.powi(3)).powf(0.2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_kinetic_energy_zero() {
        let u = vec![0.0; 64];
        let v = vec![0.0; 64];
        let ke = compute_kinetic_energy(&u, &v);
        assert!(ke.abs() < 1e-15, "KE should be 0 with no flow, got {}", ke);
    }

    #[test]
    fn test_kinetic_energy_uniform_flow() {
        let u = vec![1.0; 64];
        let v = vec![0.0; 64];
        let ke = compute_kinetic_energy(&u, &v);
        assert!((ke - 0.5).abs() < 1e-12, "KE should be 0.5, got {}", ke);
        assert!((compute_rms_velocity(&u, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spectral_kinetic_energy_matches_real_space() {
        let grid = SpectralGrid::from_dims(32, 16, 1.0, 0.5).unwrap();
        let m = grid.mesh().clone();
        let mut psi = vec![0.0; m.real_len()];
        for j in 0..m.ny {
            for i in 0..m.nx {
                let x = i as f64 * m.dx();
                let y = j as f64 * m.dy();
                psi[idx_inner(i, j, m.nx)] = 0.1 * (TAU * x).sin() * (TAU * y / m.ly).cos()
                    + 0.05 * (3.0 * TAU * x).cos();
            }
        }
        let psi_hat = grid.forward(&psi).unwrap();
        let (u, v) = grid.velocity_from_streamfunction(&psi_hat).unwrap();
        let ke_real = compute_kinetic_energy(&u, &v);
        let ke_spec = compute_spectral_kinetic_energy(&grid, &psi_hat).unwrap();
        assert!((ke_real - ke_spec).abs() < 1e-12 * ke_real, "{ke_real} vs {ke_spec}");
    }

    #[test]
    fn test_potential_vorticity_adds_planetary_gradient() {
        let mesh = WavenumberMesh::new(4, 4, 1.0, 2.0).unwrap();
        let zeta = vec![1.0; 16];
        let q = compute_potential_vorticity(&zeta, 2.0, &mesh);
        // dy = 0.5: rows at y = 0, 0.5, 1.0, 1.5
        assert_eq!(q[idx_inner(0, 0, 4)], 1.0);
        assert_eq!(q[idx_inner(3, 1, 4)], 2.0);
        assert_eq!(q[idx_inner(2, 3, 4)], 4.0);
    }

    #[test]
    fn test_zonal_mean() {
        let field = vec![1.0, 3.0, 2.0, 2.0, -1.0, 1.0];
        assert_eq!(zonal_mean(&field, 2, 3), vec![2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_length_scales() {
        assert_eq!(rhines_scale(1.0, 0.0), None);
        assert!((rhines_scale(4.0, 4.0).unwrap() - 1.0).abs() < 1e-15);
        assert_eq!(dissipation_scale(1e-4, 1.0, 0.0), None);
        let l = dissipation_scale(0.5, 1.0, 1.0).unwrap();
        assert!((l - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_max_abs() {
        assert_eq!(max_abs(&[0.5, -2.0, 1.0]), 2.0);
        assert_eq!(max_abs(&[]), 0.0);
    }
}
