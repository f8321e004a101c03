use std::f64::consts::TAU;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{Result, SolverError};

/// Row-major index for a field with `cols` entries per row.
/// Real fields use `cols = nx`, spectral fields use `cols = nk`.
#[inline(always)]
pub const fn idx_inner(x: usize, y: usize, cols: usize) -> usize {
    y * cols + x
}

/// FFT ordering of a wavenumber index: 0, 1, …, n/2-1, -n/2, …, -1.
fn fft_index(j: usize, n: usize) -> f64 {
    if j <= (n - 1) / 2 {
        j as f64
    } else {
        j as f64 - n as f64
    }
}

/// Wavenumbers of a doubly periodic (nx, ny) grid under a real-to-complex
/// transform. Spectral arrays have `ny` rows of `nk = nx/2 + 1` columns.
#[derive(Debug, Clone)]
pub struct WavenumberMesh {
    pub nx: usize,
    pub ny: usize,
    pub nk: usize,
    pub lx: f64,
    pub ly: f64,
    /// Fundamental wavenumbers 2π/Lx and 2π/Ly.
    pub dk: f64,
    pub dl: f64,
    /// x wavenumbers, length nk.
    pub k: Vec<f64>,
    /// y wavenumbers in FFT order, length ny.
    pub l: Vec<f64>,
    /// k² + l², set to 1 at the zero mode.
    pub ksq: Vec<f64>,
    /// sqrt(k² + l²) / dk without regularization (0 at the zero mode).
    pub kmag: Vec<f64>,
}

impl WavenumberMesh {
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self> {
        if nx < 4 || ny < 4 {
            return Err(SolverError::config(format!(
                "grid must be at least 4x4, got {nx}x{ny}"
            )));
        }
        if nx % 2 != 0 {
            return Err(SolverError::config(format!("nx must be even, got {nx}")));
        }
        if !(lx > 0.0 && lx.is_finite() && ly > 0.0 && ly.is_finite()) {
            return Err(SolverError::config(format!(
                "domain extent must be positive, got {lx} x {ly}"
            )));
        }

        let nk = nx / 2 + 1;
        let dk = TAU / lx;
        let dl = TAU / ly;
        let k: Vec<f64> = (0..nk).map(|i| dk * i as f64).collect();
        let l: Vec<f64> = (0..ny).map(|j| dl * fft_index(j, ny)).collect();

        let mut ksq = vec![0.0; ny * nk];
        let mut kmag = vec![0.0; ny * nk];
        for j in 0..ny {
            for i in 0..nk {
                let ii = idx_inner(i, j, nk);
                let kk = k[i] * k[i] + l[j] * l[j];
                kmag[ii] = kk.sqrt() / dk;
                ksq[ii] = if kk == 0.0 { 1.0 } else { kk };
            }
        }

        Ok(Self { nx, ny, nk, lx, ly, dk, dl, k, l, ksq, kmag })
    }

    /// Number of points in a real field.
    pub fn real_len(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of coefficients in a spectral field.
    pub fn spectral_len(&self) -> usize {
        self.ny * self.nk
    }

    pub fn dx(&self) -> f64 {
        self.lx / self.nx as f64
    }

    pub fn dy(&self) -> f64 {
        self.ly / self.ny as f64
    }
}

/// Half-spectrum coefficients of a real 2D field, shape (ny, nx/2 + 1).
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralField {
    ny: usize,
    nk: usize,
    coeffs: Vec<Complex64>,
}

impl SpectralField {
    pub fn zeros(mesh: &WavenumberMesh) -> Self {
        Self {
            ny: mesh.ny,
            nk: mesh.nk,
            coeffs: vec![Complex64::new(0.0, 0.0); mesh.spectral_len()],
        }
    }

    pub fn new(ny: usize, nk: usize, coeffs: Vec<Complex64>) -> Result<Self> {
        if coeffs.len() != ny * nk {
            return Err(SolverError::TransformShape {
                expected: ny * nk,
                found: coeffs.len(),
            });
        }
        Ok(Self { ny, nk, coeffs })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nk)
    }

    pub fn coeffs(&self) -> &[Complex64] {
        &self.coeffs
    }

    pub fn coeffs_mut(&mut self) -> &mut [Complex64] {
        &mut self.coeffs
    }

    pub fn check_shape(&self, mesh: &WavenumberMesh) -> Result<()> {
        if self.ny != mesh.ny || self.nk != mesh.nk {
            return Err(SolverError::TransformShape {
                expected: mesh.spectral_len(),
                found: self.coeffs.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn same_shape(&self, other: &SpectralField) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(SolverError::TransformShape {
                expected: self.coeffs.len(),
                found: other.coeffs.len(),
            });
        }
        Ok(())
    }

    pub fn scale(&mut self, a: f64) {
        for c in self.coeffs.iter_mut() {
            *c *= a;
        }
    }

    /// self += a * x. Shapes must already agree.
    pub fn axpy(&mut self, a: f64, x: &SpectralField) {
        debug_assert_eq!(self.shape(), x.shape());
        for (c, xc) in self.coeffs.iter_mut().zip(&x.coeffs) {
            *c += *xc * a;
        }
    }

    /// Pointwise multiply by a real, wavenumber-even mask.
    /// Real even masks keep Hermitian symmetry intact.
    pub fn mul_mask(&mut self, mask: &[f64]) {
        debug_assert_eq!(self.coeffs.len(), mask.len());
        for (c, &m) in self.coeffs.iter_mut().zip(mask) {
            *c *= m;
        }
    }

    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.re.is_finite() && c.im.is_finite())
    }

    /// Enforce Hermitian symmetry on the self-conjugate columns.
    ///
    /// The kx = 0 and kx = nx/2 columns hold both +l and -l; the -l half is
    /// rewritten as the conjugate of the +l half and the self-paired entries
    /// are made real. Other columns pair with the implied redundant half of
    /// the full spectrum and need no correction.
    pub fn symmetrize(&mut self) {
        let (ny, nk) = (self.ny, self.nk);
        for col in [0, nk - 1] {
            let c0 = idx_inner(col, 0, nk);
            self.coeffs[c0].im = 0.0;
            for j in 1..ny {
                let jn = ny - j;
                if j < jn {
                    let src = self.coeffs[idx_inner(col, j, nk)];
                    self.coeffs[idx_inner(col, jn, nk)] = src.conj();
                } else if j == jn {
                    self.coeffs[idx_inner(col, j, nk)].im = 0.0;
                }
            }
        }
    }
}

/// Mesh plus planned FFTs: the spectral side of the model.
#[derive(Clone)]
pub struct SpectralGrid {
    mesh: WavenumberMesh,
    row_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
}

impl SpectralGrid {
    pub fn new(mesh: WavenumberMesh) -> Self {
        let mut planner = FftPlanner::new();
        let row_fwd = planner.plan_fft_forward(mesh.nx);
        let row_inv = planner.plan_fft_inverse(mesh.nx);
        let col_fwd = planner.plan_fft_forward(mesh.ny);
        let col_inv = planner.plan_fft_inverse(mesh.ny);
        Self { mesh, row_fwd, row_inv, col_fwd, col_inv }
    }

    pub fn from_dims(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self> {
        Ok(Self::new(WavenumberMesh::new(nx, ny, lx, ly)?))
    }

    pub fn mesh(&self) -> &WavenumberMesh {
        &self.mesh
    }

    fn check_real(&self, real: &[f64]) -> Result<()> {
        if real.len() != self.mesh.real_len() {
            return Err(SolverError::TransformShape {
                expected: self.mesh.real_len(),
                found: real.len(),
            });
        }
        Ok(())
    }

    /// Real field (ny rows of nx) to half spectrum. Unnormalized.
    pub fn forward(&self, real: &[f64]) -> Result<SpectralField> {
        self.check_real(real)?;
        let (nx, ny, nk) = (self.mesh.nx, self.mesh.ny, self.mesh.nk);
        let mut out = SpectralField::zeros(&self.mesh);

        let mut row = vec![Complex64::new(0.0, 0.0); nx];
        for j in 0..ny {
            for (i, r) in row.iter_mut().enumerate() {
                *r = Complex64::new(real[idx_inner(i, j, nx)], 0.0);
            }
            self.row_fwd.process(&mut row);
            out.coeffs[j * nk..(j + 1) * nk].copy_from_slice(&row[..nk]);
        }

        let mut col = vec![Complex64::new(0.0, 0.0); ny];
        for i in 0..nk {
            for (j, c) in col.iter_mut().enumerate() {
                *c = out.coeffs[idx_inner(i, j, nk)];
            }
            self.col_fwd.process(&mut col);
            for (j, c) in col.iter().enumerate() {
                out.coeffs[idx_inner(i, j, nk)] = *c;
            }
        }
        Ok(out)
    }

    /// Half spectrum to real field, normalized by 1/(nx*ny).
    /// The redundant half is rebuilt from conjugates and only the real part
    /// is kept, so the result is real even for slightly non-Hermitian input.
    pub fn inverse(&self, field: &SpectralField) -> Result<Vec<f64>> {
        field.check_shape(&self.mesh)?;
        let (nx, ny, nk) = (self.mesh.nx, self.mesh.ny, self.mesh.nk);
        let mut work = field.coeffs.clone();

        let mut col = vec![Complex64::new(0.0, 0.0); ny];
        for i in 0..nk {
            for (j, c) in col.iter_mut().enumerate() {
                *c = work[idx_inner(i, j, nk)];
            }
            self.col_inv.process(&mut col);
            for (j, c) in col.iter().enumerate() {
                work[idx_inner(i, j, nk)] = *c;
            }
        }

        let norm = 1.0 / (nx * ny) as f64;
        let mut real = vec![0.0; nx * ny];
        let mut row = vec![Complex64::new(0.0, 0.0); nx];
        for j in 0..ny {
            row[..nk].copy_from_slice(&work[j * nk..(j + 1) * nk]);
            for i in nk..nx {
                row[i] = work[idx_inner(nx - i, j, nk)].conj();
            }
            self.row_inv.process(&mut row);
            for i in 0..nx {
                real[idx_inner(i, j, nx)] = row[i].re * norm;
            }
        }
        Ok(real)
    }

    /// Analytic derivatives (i·k·f, i·l·f).
    pub fn gradient(&self, field: &SpectralField) -> Result<(SpectralField, SpectralField)> {
        field.check_shape(&self.mesh)?;
        let nk = self.mesh.nk;
        let mut dx = field.clone();
        let mut dy = field.clone();
        for j in 0..self.mesh.ny {
            let l = self.mesh.l[j];
            for i in 0..nk {
                let ii = idx_inner(i, j, nk);
                let c = field.coeffs[ii];
                dx.coeffs[ii] = Complex64::new(0.0, self.mesh.k[i]) * c;
                dy.coeffs[ii] = Complex64::new(0.0, l) * c;
            }
        }
        Ok((dx, dy))
    }

    /// ψ̂ = -ζ̂ / (k² + l²), using the regularized ksq.
    pub fn streamfunction(&self, zeta: &SpectralField) -> Result<SpectralField> {
        zeta.check_shape(&self.mesh)?;
        let mut psi = zeta.clone();
        for (c, &kk) in psi.coeffs.iter_mut().zip(&self.mesh.ksq) {
            *c *= -1.0 / kk;
        }
        Ok(psi)
    }

    /// Real-space velocity (u, v) = (-∂ψ/∂y, ∂ψ/∂x).
    pub fn velocity_from_streamfunction(&self, psi: &SpectralField) -> Result<(Vec<f64>, Vec<f64>)> {
        let (psi_x, psi_y) = self.gradient(psi)?;
        let mut u = self.inverse(&psi_y)?;
        for val in u.iter_mut() {
            *val = -*val;
        }
        let v = self.inverse(&psi_x)?;
        Ok((u, v))
    }

    /// Mean square of the real field represented by `field`, computed from
    /// the half spectrum.
    ///
    /// Under the real-to-complex transform only columns kx = 0 and kx = nx/2
    /// are stored in full; every other column also stands for its conjugate
    /// partner in the discarded half, so it is counted twice. By Parseval the
    /// weighted sum divided by (nx*ny)^2 equals the real-space mean square.
    pub fn spectral_variance(&self, field: &SpectralField) -> Result<f64> {
        field.check_shape(&self.mesh)?;
        let nk = self.mesh.nk;
        let n = self.mesh.real_len() as f64;
        let mut sum = 0.0;
        for j in 0..self.mesh.ny {
            for i in 0..nk {
                let weight = if i == 0 || i == nk - 1 { 1.0 } else { 2.0 };
                sum += weight * field.coeffs[idx_inner(i, j, nk)].norm_sqr();
            }
        }
        Ok(sum / (n * n))
    }
}
