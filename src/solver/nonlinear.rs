use super::grid::{SpectralField, SpectralGrid};
use crate::error::Result;

/// Output of one advection evaluation.
pub struct Advection {
    /// Spectral Jacobian J(ψ, ζ) + ubar ∂ζ/∂x.
    pub jacobian: SpectralField,
    /// ∂ψ/∂x in spectral space, for the β term.
    pub psi_x: SpectralField,
    /// Real-space velocity u = -∂ψ/∂y.
    pub u: Vec<f64>,
    /// Real-space velocity v = ∂ψ/∂x.
    pub v: Vec<f64>,
}

/// Pseudospectral advection term.
///
/// Derivatives are taken in spectral space, the products ψ_x ζ_y - ψ_y ζ_x
/// are formed in real space and the result transformed back. The real-space
/// product is what aliases; callers truncate the updated field afterwards.
pub fn advection(grid: &SpectralGrid, zeta: &SpectralField, ubar: f64) -> Result<Advection> {
    let psi = grid.streamfunction(zeta)?;
    let (psi_xt, psi_yt) = grid.gradient(&psi)?;
    let (zeta_xt, zeta_yt) = grid.gradient(zeta)?;

    let psi_x = grid.inverse(&psi_xt)?;
    let psi_y = grid.inverse(&psi_yt)?;
    let zeta_x = grid.inverse(&zeta_xt)?;
    let zeta_y = grid.inverse(&zeta_yt)?;

    let mut jac = vec![0.0; psi_x.len()];
    for (ii, j) in jac.iter_mut().enumerate() {
        *j = psi_x[ii] * zeta_y[ii] - psi_y[ii] * zeta_x[ii] + ubar * zeta_x[ii];
    }
    let jacobian = grid.forward(&jac)?;

    let u = psi_y.iter().map(|p| -p).collect();
    Ok(Advection {
        jacobian,
        psi_x: psi_xt,
        u,
        v: psi_x,
    })
}
