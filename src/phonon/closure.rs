use serde::{Deserialize, Serialize};

/// Relates a trial lattice temperature to the equilibrium phonon energy
/// density of one mode.
///
/// Implementations must be smooth enough for Newton iteration: the derivative
/// has to be exact for the closure, not a finite difference.
pub trait EquilibriumClosure {
    /// Equilibrium energy density e0(T).
    fn energy(&self, temperature: f64) -> f64;

    /// Temperature derivative de0/dT, the specific-heat contribution.
    fn energy_derivative(&self, temperature: f64) -> f64;
}

/// Linearized gray-model closure: e0(T) = c * T.
///
/// Valid near a reference temperature where the mode population responds
/// linearly; `c` is the volumetric heat capacity carried by this mode per
/// unit solid angle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearGray {
    /// Volumetric heat capacity [J/(m^3*K*sr)].
    pub heat_capacity: f64,
}

impl LinearGray {
    pub fn new(heat_capacity: f64) -> Self {
        Self { heat_capacity }
    }
}

impl EquilibriumClosure for LinearGray {
    fn energy(&self, temperature: f64) -> f64 {
        self.heat_capacity * temperature
    }

    fn energy_derivative(&self, _temperature: f64) -> f64 {
        self.heat_capacity
    }
}

/// Low-temperature Debye closure: e0(T) = a * T^4.
///
/// Below the Debye temperature the phonon energy density follows the T^4 law,
/// which makes the equilibrium condition genuinely nonlinear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DebyeT4 {
    /// Coefficient a [J/(m^3*K^4*sr)].
    pub coefficient: f64,
}

impl DebyeT4 {
    pub fn new(coefficient: f64) -> Self {
        Self { coefficient }
    }
}

impl EquilibriumClosure for DebyeT4 {
    fn energy(&self, temperature: f64) -> f64 {
        self.coefficient * temperature.powi(4)
    }

    fn energy_derivative(&self, temperature: f64) -> f64 {
        4.0 * self.coefficient * temperature.powi(3)
    }
}
