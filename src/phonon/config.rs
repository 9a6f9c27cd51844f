use serde::{Deserialize, Serialize};

/// Dispersion parameters of a gray, isotropic phonon population: every mode
/// shares one velocity magnitude, one relaxation time, and one frequency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrayDispersion {
    /// Relaxation time tau [s].
    pub relaxation_time: f64,
    /// Group velocity magnitude [m/s].
    pub velocity_magnitude: f64,
    /// Angular frequency [rad/s].
    pub angular_frequency: f64,
}

impl GrayDispersion {
    pub fn new(relaxation_time: f64, velocity_magnitude: f64, angular_frequency: f64) -> Self {
        Self {
            relaxation_time,
            velocity_magnitude,
            angular_frequency,
        }
    }
}

/// Angular resolution of the direction-space discretization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AngularResolution {
    /// Polar bins over [0, pi].
    pub ntheta: usize,
    /// Azimuthal bins over [0, 2*pi].
    pub nphi: usize,
}

impl AngularResolution {
    pub fn new(ntheta: usize, nphi: usize) -> Self {
        debug_assert!(ntheta > 0 && nphi > 0, "angular resolution must be nonzero");
        Self { ntheta, nphi }
    }

    /// Number of cells the discretization produces.
    pub fn cell_count(&self) -> usize {
        self.ntheta * self.nphi
    }
}

/// Newton-Raphson settings for the equilibrium-temperature solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonConfig {
    /// Convergence threshold on the relative step |dT / T|.
    pub tolerance: f64,
    /// Iteration cap; exceeding it reports non-convergence instead of
    /// iterating forever.
    pub max_iterations: usize,
}

impl NewtonConfig {
    pub fn new() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
        }
    }
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self::new()
    }
}
