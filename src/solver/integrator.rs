use super::grid::SpectralField;
use crate::error::Result;

/// Third-order Adams-Bashforth stepper that starts itself.
///
/// Step 0 is forward Euler, step 1 is AB2, later steps are AB3. The weights
/// are always built from the dt passed to the current call, even when
/// earlier steps used a different dt. This is an approximation for variable
/// steps and is kept as is.
#[derive(Debug, Clone, Default)]
pub struct AdamsBashforth3 {
    prev: Option<SpectralField>,
    prev2: Option<SpectralField>,
    steps: u64,
}

impl AdamsBashforth3 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps taken since start or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Weights (dt1, dt2, dt3) for rhs(now), rhs(prev), rhs(prev-1).
    pub fn coefficients(&self, dt: f64) -> [f64; 3] {
        match self.steps {
            0 => [dt, 0.0, 0.0],
            1 => [1.5 * dt, -0.5 * dt, 0.0],
            _ => [23.0 / 12.0 * dt, -16.0 / 12.0 * dt, 5.0 / 12.0 * dt],
        }
    }

    /// Drop the history and fall back to the forward Euler start.
    pub fn reset(&mut self) {
        self.prev = None;
        self.prev2 = None;
        self.steps = 0;
    }

    /// Advance `field` by one step and shift `rhs` into the history.
    pub fn step(&mut self, field: &SpectralField, rhs: SpectralField, dt: f64) -> Result<SpectralField> {
        field.same_shape(&rhs)?;
        let [dt1, dt2, dt3] = self.coefficients(dt);

        let mut next = field.clone();
        next.axpy(dt1, &rhs);
        if let Some(prev) = &self.prev {
            if dt2 != 0.0 {
                field.same_shape(prev)?;
                next.axpy(dt2, prev);
            }
        }
        if let Some(prev2) = &self.prev2 {
            if dt3 != 0.0 {
                field.same_shape(prev2)?;
                next.axpy(dt3, prev2);
            }
        }

        self.prev2 = self.prev.take();
        self.prev = Some(rhs);
        self.steps += 1;
        Ok(next)
    }
}
