/// Multiplier applied to dt when the Courant number is too high.
pub const SLOWDOWN_FACTOR: f64 = 0.9;
/// Multiplier applied to dt when the Courant number is comfortably low.
pub const SPEEDUP_FACTOR: f64 = 1.1;

/// Courant number C = (max|u| + max|v|) dt / dx.
/// Assumes dx and dy are of the same order.
pub fn courant_number(u: &[f64], v: &[f64], dt: f64, dx: f64) -> f64 {
    let max_u = u.iter().map(|x| x.abs()).fold(0.0_f64, f64::max);
    let max_v = v.iter().map(|x| x.abs()).fold(0.0_f64, f64::max);
    (max_u + max_v) * dt / dx
}

/// Hysteresis controller on the Courant number.
///
/// C >= `slowdown_at` shrinks dt, C < `speedup_at` grows it (when allowed),
/// anything in between leaves dt alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourantController {
    pub enabled: bool,
    pub slowdown_at: f64,
    pub speedup_at: f64,
    pub allow_speedup: bool,
}

impl Default for CourantController {
    fn default() -> Self {
        Self {
            enabled: true,
            slowdown_at: 0.6,
            speedup_at: 0.4,
            allow_speedup: true,
        }
    }
}

impl CourantController {
    /// dt to use for the current step given this step's Courant number.
    pub fn adjust(&self, dt: f64, courant: f64) -> f64 {
        if !self.enabled {
            return dt;
        }
        if courant >= self.slowdown_at {
            dt * SLOWDOWN_FACTOR
        } else if courant < self.speedup_at && self.allow_speedup {
            dt * SPEEDUP_FACTOR
        } else {
            dt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slowdown_above_threshold() {
        let c = CourantController::default();
        assert_eq!(c.adjust(0.05, 0.8), 0.05 * 0.9);
    }

    #[test]
    fn test_speedup_below_threshold() {
        let c = CourantController::default();
        assert_eq!(c.adjust(0.05, 0.2), 0.05 * 1.1);
    }

    #[test]
    fn test_hysteresis_band_unchanged() {
        let c = CourantController::default();
        assert_eq!(c.adjust(0.05, 0.5), 0.05);
        // lower edge of the band belongs to the band, upper edge slows down
        assert_eq!(c.adjust(0.05, 0.4), 0.05);
        assert_eq!(c.adjust(0.05, 0.6), 0.05 * 0.9);
    }

    #[test]
    fn test_speedup_disabled() {
        let c = CourantController { allow_speedup: false, ..Default::default() };
        assert_eq!(c.adjust(0.05, 0.2), 0.05);
        assert_eq!(c.adjust(0.05, 0.9), 0.05 * 0.9);
    }

    #[test]
    fn test_controller_disabled() {
        let c = CourantController { enabled: false, ..Default::default() };
        assert_eq!(c.adjust(0.05, 0.9), 0.05);
        assert_eq!(c.adjust(0.05, 0.1), 0.05);
    }

    #[test]
    fn test_courant_number() {
        let u = vec![0.1, -0.5, 0.2];
        let v = vec![0.0, 0.3, -0.25];
        let c = courant_number(&u, &v, 0.01, 0.1);
        assert!((c - (0.5 + 0.3) * 0.01 / 0.1).abs() < 1e-15);
    }
}
