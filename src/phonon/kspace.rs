use rayon::prelude::*;
use std::f64::consts::PI;

use crate::geom::vector::{Vector, dot, mag};

use super::cell::AngularCell;
use super::closure::{EquilibriumClosure, LinearGray};
use super::config::{AngularResolution, GrayDispersion, NewtonConfig};
use super::error::{KSpaceError, Result};
use super::mode::PhononMode;

/// Direction cosine above which an arriving direction is treated as an exact
/// match and assigned purely to the best-aligned cell, skipping the two-way
/// blend. Guards the weight split against near-degenerate alignment.
const SPECULAR_COSINE: f64 = 0.99;

/// Energy-density contribution assigned to one discrete direction by
/// [`KSpace::find_specs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectedShare {
    /// Contribution per unit equilibrium density, already normalized by the
    /// recipient cell's velocity magnitude and directional volume.
    pub weight: f64,
    /// Index of the recipient cell.
    pub cell: usize,
}

/// Discretized gray, isotropic direction space: an ordered arena of
/// [`AngularCell`]s covering the unit sphere.
///
/// Built once from physical parameters; afterwards answers aggregate queries
/// for a transport solver. Cell order is theta-major (all phi bins for the
/// first polar band, then the next band) and is significant for the
/// nearest-direction scan.
#[derive(Debug, Clone)]
pub struct KSpace<C = LinearGray> {
    cells: Vec<AngularCell<C>>,
    totvol: f64,
}

impl<C: EquilibriumClosure> KSpace<C> {
    /// Builds a gray, isotropic k-space over the full sphere.
    ///
    /// The sphere is split into `ntheta * nphi` cells sampled at bin centers.
    /// Each cell gets one mode with velocity
    /// `vgmag * (sin(theta)*sin(phi), sin(theta)*cos(phi), cos(theta))` and
    /// the solid-angle element `dk3 = 2*sin(theta)*sin(dtheta/2)*dphi`, the
    /// exact measure of its polar band divided over the phi bins. The cells
    /// tile the sphere, so the accumulated total tracks 4*pi to rounding.
    pub fn gray(dispersion: GrayDispersion, resolution: AngularResolution, closure: C) -> Self
    where
        C: Clone,
    {
        let GrayDispersion {
            relaxation_time: tau,
            velocity_magnitude: vgmag,
            angular_frequency: omega,
        } = dispersion;
        let dtheta = PI / resolution.ntheta as f64;
        let dphi = 2.0 * PI / resolution.nphi as f64;

        let mut cells = Vec::with_capacity(resolution.cell_count());
        let mut totvol = 0.0;
        for t in 0..resolution.ntheta {
            let theta = dtheta * (t as f64 + 0.5);
            for p in 0..resolution.nphi {
                let phi = dphi * (p as f64 + 0.5);
                let vg = Vector::new([
                    vgmag * theta.sin() * phi.sin(),
                    vgmag * theta.sin() * phi.cos(),
                    vgmag * theta.cos(),
                ]);
                let dk3 = 2.0 * theta.sin() * (dtheta / 2.0).sin() * dphi;
                let mode = PhononMode::new(vg, omega, tau, closure.clone());
                cells.push(AngularCell::new(vec![mode], dk3));
                totvol += dk3;
            }
        }
        Self { cells, totvol }
    }

    /// Number of angular cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, n: usize) -> &AngularCell<C> {
        &self.cells[n]
    }

    pub fn cells(&self) -> std::slice::Iter<'_, AngularCell<C>> {
        self.cells.iter()
    }

    /// Aggregate directional volume (sum of every cell's `dk3`).
    pub fn total_volume(&self) -> f64 {
        self.totvol
    }

    /// Total number of modes across all cells.
    pub fn total_mode_count(&self) -> usize {
        self.cells.first().map_or(0, |c| c.mode_count()) * self.cells.len()
    }

    /// Sum of `dk3 / tau` over every mode in every cell.
    ///
    /// Normalization constant for scattering-rate integrals.
    pub fn total_relaxation_measure(&self) -> f64
    where
        C: Sync,
    {
        self.cells
            .par_iter()
            .map(|kv| {
                let dk3 = kv.directional_volume();
                kv.modes().map(|m| dk3 / m.relaxation_time()).sum::<f64>()
            })
            .sum()
    }

    /// Equilibrium energy-rate sum and its temperature derivative at the
    /// trial temperature, integrated over the whole k-space.
    pub fn equilibrium_energy_and_derivative(&self, t_guess: f64) -> (f64, f64)
    where
        C: Sync,
    {
        self.cells
            .par_iter()
            .map(|kv| {
                let dk3 = kv.directional_volume();
                let mut e0 = 0.0;
                let mut de0_dt = 0.0;
                for m in kv.modes() {
                    e0 += m.energy_closure(t_guess) * dk3;
                    de0_dt += m.energy_closure_derivative(t_guess) * dk3;
                }
                (e0, de0_dt)
            })
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    }

    /// Volumetric specific heat at the lattice temperature `t_lattice`.
    pub fn specific_heat(&self, t_lattice: f64) -> f64
    where
        C: Sync,
    {
        self.cells
            .par_iter()
            .map(|kv| {
                let dk3 = kv.directional_volume();
                kv.modes()
                    .map(|m| m.specific_heat_closure(t_lattice) * dk3)
                    .sum::<f64>()
            })
            .sum()
    }

    /// Newton-Raphson solve for the equilibrium temperature whose integrated
    /// energy-rate sum equals `e_sum`.
    ///
    /// `guess` is updated in place on every iteration, including a failing
    /// run. Convergence is a relative step below `config.tolerance`; the
    /// iteration count is capped by `config.max_iterations`. Returns the
    /// number of iterations taken.
    pub fn solve_equilibrium_temperature(
        &self,
        guess: &mut f64,
        e_sum: f64,
        config: &NewtonConfig,
    ) -> Result<usize>
    where
        C: Sync,
    {
        let mut last_step = f64::INFINITY;
        for iteration in 1..=config.max_iterations {
            let (e0, de0_dt) = self.equilibrium_energy_and_derivative(*guess);
            if de0_dt == 0.0 {
                return Err(KSpaceError::DegenerateGeometry(
                    "zero equilibrium-energy derivative in Newton step",
                ));
            }
            let delta_t = (e0 - e_sum) / de0_dt;
            last_step = (delta_t / *guess).abs();
            *guess -= delta_t;
            if last_step < config.tolerance {
                return Ok(iteration);
            }
        }
        Err(KSpaceError::NonConvergence {
            iterations: config.max_iterations,
            last_step,
        })
    }

    /// Redistributes the energy flux `vo * dk3`, arriving along the continuous
    /// direction `so`, onto the two discrete cells (mode index `m` in each)
    /// whose group-velocity directions are best aligned with `so`.
    ///
    /// Weights are proportional to the direction cosines and sum to one; a
    /// cosine above [`SPECULAR_COSINE`] collapses the split onto the single
    /// best cell. Each recipient's share is converted to an energy-density
    /// contribution by dividing by its own velocity magnitude and directional
    /// volume, so the transported energy `vo * dk3` is preserved.
    ///
    /// A single-cell k-space degenerates to repeat use of cell 0 with the
    /// full weight.
    pub fn find_specs(
        &self,
        dk3: f64,
        vo: f64,
        m: usize,
        so: Vector<f64, 3>,
    ) -> Result<[ReflectedShare; 2]> {
        debug_assert!(!self.cells.is_empty(), "k-space has no cells");
        debug_assert!(
            m < self.cells[0].mode_count(),
            "mode index {m} out of range"
        );

        if self.cells.len() == 1 {
            self.unit_direction(0, m)?;
            let kv = &self.cells[0];
            let vmag = mag(kv.mode(m).group_velocity());
            return Ok([
                ReflectedShare {
                    weight: vo * dk3 / vmag / kv.directional_volume(),
                    cell: 0,
                },
                ReflectedShare { weight: 0.0, cell: 0 },
            ]);
        }

        // Single pass over all cells keeping the two best-aligned directions.
        let mut ranked = TopK::<2>::new();
        for k in 0..self.cells.len() {
            let sn = self.unit_direction(k, m)?;
            ranked.insert(dot(sn, so), k);
        }
        let [(cos1, m1), (cos2, m2)] = ranked.entries;

        let mut w1 = cos1 / (cos1 + cos2);
        let mut w2 = cos2 / (cos1 + cos2);
        if cos1 > SPECULAR_COSINE {
            w1 = 1.0;
            w2 = 0.0;
        }

        let kv1 = &self.cells[m1];
        let kv2 = &self.cells[m2];
        let v1mag = mag(kv1.mode(m).group_velocity());
        let v2mag = mag(kv2.mode(m).group_velocity());

        Ok([
            ReflectedShare {
                weight: w1 * vo * dk3 / v1mag / kv1.directional_volume(),
                cell: m1,
            },
            ReflectedShare {
                weight: w2 * vo * dk3 / v2mag / kv2.directional_volume(),
                cell: m2,
            },
        ])
    }

    /// Unit group-velocity direction of mode `m` in cell `k`.
    fn unit_direction(&self, k: usize, m: usize) -> Result<Vector<f64, 3>> {
        self.cells[k]
            .mode(m)
            .group_velocity()
            .normalize()
            .ok_or(KSpaceError::DegenerateGeometry(
                "zero-magnitude group velocity",
            ))
    }
}

/// Top-K entries by key, maintained with fixed-size sorted insertion during a
/// single pass. Later entries displace earlier ones only on a strictly
/// greater key, so the first-seen index wins ties.
struct TopK<const K: usize> {
    entries: [(f64, usize); K],
}

impl<const K: usize> TopK<K> {
    fn new() -> Self {
        Self {
            entries: [(f64::NEG_INFINITY, usize::MAX); K],
        }
    }

    fn insert(&mut self, key: f64, index: usize) {
        let Some(pos) = (0..K).find(|&i| key > self.entries[i].0) else {
            return;
        };
        for i in (pos + 1..K).rev() {
            self.entries[i] = self.entries[i - 1];
        }
        self.entries[pos] = (key, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_kspace(ntheta: usize, nphi: usize) -> KSpace<LinearGray> {
        KSpace::gray(
            GrayDispersion::new(1.0e-11, 6400.0, 1.0e13),
            AngularResolution::new(ntheta, nphi),
            LinearGray::new(1.6e6),
        )
    }

    #[test]
    fn test_construction_counts() {
        let kspace = gray_kspace(4, 8);
        assert_eq!(kspace.len(), 32);
        assert_eq!(kspace.total_mode_count(), 32);

        let summed: f64 = kspace.cells().map(|c| c.directional_volume()).sum();
        assert!(
            (summed - kspace.total_volume()).abs() < 1e-12,
            "totvol {} vs summed {summed}",
            kspace.total_volume()
        );
        // The band elements telescope, so the tiling closes at 4*pi.
        assert!((kspace.total_volume() - 4.0 * PI).abs() / (4.0 * PI) < 1e-12);
    }

    #[test]
    fn test_cell_ordering_theta_major() {
        let kspace = gray_kspace(2, 4);
        // First polar band: theta = pi/4, so vz = vgmag*cos(pi/4) for the
        // first nphi cells, then the second band with negative vz.
        let vz0 = 6400.0 * (PI / 4.0).cos();
        for p in 0..4 {
            assert!((kspace.cell(p).mode(0).group_velocity()[2] - vz0).abs() < 1e-9);
        }
        for p in 4..8 {
            assert!((kspace.cell(p).mode(0).group_velocity()[2] + vz0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_total_relaxation_measure_gray() {
        let kspace = gray_kspace(4, 8);
        // Every mode shares tau, so the measure collapses to totvol/tau.
        let expected = kspace.total_volume() / 1.0e-11;
        let actual = kspace.total_relaxation_measure();
        assert!(
            ((actual - expected) / expected).abs() < 1e-12,
            "got {actual}, expected {expected}"
        );
    }

    #[test]
    fn test_specific_heat_gray() {
        let kspace = gray_kspace(4, 8);
        let expected = 1.6e6 * kspace.total_volume();
        let actual = kspace.specific_heat(300.0);
        assert!(((actual - expected) / expected).abs() < 1e-12);
    }

    #[test]
    fn test_newton_linear_closure() {
        let kspace = gray_kspace(4, 8);
        let t0 = 312.5;
        // e_sum for the linear closure: c * T0 * totvol / tau.
        let e_sum = 1.6e6 * t0 * kspace.total_volume() / 1.0e-11;
        let mut guess = 250.0;
        let iters = kspace
            .solve_equilibrium_temperature(&mut guess, e_sum, &NewtonConfig::default())
            .unwrap();
        assert!((guess - t0).abs() / t0 < 1e-6, "converged to {guess}");
        // Linear problem: one corrective step plus one confirming step.
        assert!(iters <= 2, "took {iters} iterations");
    }

    #[test]
    fn test_newton_debye_t4_closure() {
        let kspace = KSpace::gray(
            GrayDispersion::new(2.0e-12, 5000.0, 8.0e12),
            AngularResolution::new(6, 12),
            crate::phonon::closure::DebyeT4::new(0.031),
        );
        let t0: f64 = 180.0;
        let e_sum = 0.031 * t0.powi(4) * kspace.total_volume() / 2.0e-12;
        let mut guess = 300.0;
        kspace
            .solve_equilibrium_temperature(&mut guess, e_sum, &NewtonConfig::default())
            .unwrap();
        assert!((guess - t0).abs() / t0 < 1e-6, "converged to {guess}");
    }

    #[test]
    fn test_newton_non_convergence_reported() {
        let kspace = KSpace::gray(
            GrayDispersion::new(2.0e-12, 5000.0, 8.0e12),
            AngularResolution::new(4, 8),
            crate::phonon::closure::DebyeT4::new(0.031),
        );
        let e_sum = 0.031 * 180.0_f64.powi(4) * kspace.total_volume() / 2.0e-12;
        let mut guess = 900.0;
        let config = NewtonConfig {
            tolerance: 1e-6,
            max_iterations: 1,
        };
        match kspace.solve_equilibrium_temperature(&mut guess, e_sum, &config) {
            Err(KSpaceError::NonConvergence {
                iterations,
                last_step,
            }) => {
                assert_eq!(iterations, 1);
                assert!(last_step > 1e-6);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
        // The failing run still moved the guess.
        assert!((guess - 900.0).abs() > 1.0);
    }

    #[test]
    fn test_newton_zero_derivative_is_degenerate() {
        #[derive(Clone, Copy)]
        struct Flat;
        impl EquilibriumClosure for Flat {
            fn energy(&self, _t: f64) -> f64 {
                1.0
            }
            fn energy_derivative(&self, _t: f64) -> f64 {
                0.0
            }
        }
        let kspace = KSpace::gray(
            GrayDispersion::new(1.0e-12, 1000.0, 1.0e13),
            AngularResolution::new(2, 2),
            Flat,
        );
        let mut guess = 100.0;
        let err = kspace
            .solve_equilibrium_temperature(&mut guess, 1.0, &NewtonConfig::default())
            .unwrap_err();
        assert!(matches!(err, KSpaceError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_find_specs_exact_alignment() {
        let kspace = gray_kspace(4, 8);
        let target = 13;
        let so = kspace
            .cell(target)
            .mode(0)
            .group_velocity()
            .normalize()
            .unwrap();
        let dk3 = 0.4;
        let vo = 2.5;
        let shares = kspace.find_specs(dk3, vo, 0, so).unwrap();

        // Exact match: full weight on the aligned cell.
        assert_eq!(shares[0].cell, target);
        let vmag = mag(kspace.cell(target).mode(0).group_velocity());
        let expected = vo * dk3 / vmag / kspace.cell(target).directional_volume();
        assert!((shares[0].weight - expected).abs() / expected < 1e-12);
        assert!(shares[1].weight == 0.0);
    }

    #[test]
    fn test_find_specs_energy_conservation() {
        let kspace = gray_kspace(2, 2);
        // Zenith direction sits exactly between the upper-band cells, so the
        // split stays below the specular threshold.
        let so = Vector::new([0.0, 0.0, 1.0]);
        let dk3 = 0.7;
        let vo = 3.0;
        let shares = kspace.find_specs(dk3, vo, 0, so).unwrap();

        let reconstructed: f64 = shares
            .iter()
            .map(|s| {
                let kv = kspace.cell(s.cell);
                s.weight * mag(kv.mode(0).group_velocity()) * kv.directional_volume()
            })
            .sum();
        assert!(
            (reconstructed - vo * dk3).abs() / (vo * dk3) < 1e-12,
            "reconstructed {reconstructed}, expected {}",
            vo * dk3
        );
        // Both recipients sit in the upper polar band.
        assert!(shares[0].cell < 2 && shares[1].cell < 2);
    }

    #[test]
    fn test_find_specs_single_cell_fallback() {
        let kspace = gray_kspace(1, 1);
        assert_eq!(kspace.len(), 1);
        let so = Vector::new([0.0, 1.0, 0.0]);
        let shares = kspace.find_specs(0.3, 1.5, 0, so).unwrap();
        assert_eq!(shares[0].cell, 0);
        assert_eq!(shares[1].cell, 0);
        let kv = kspace.cell(0);
        let expected = 1.5 * 0.3 / mag(kv.mode(0).group_velocity()) / kv.directional_volume();
        assert!((shares[0].weight - expected).abs() / expected < 1e-12);
        assert!(shares[1].weight == 0.0);
    }

    #[test]
    fn test_find_specs_zero_velocity_is_degenerate() {
        let kspace = KSpace::gray(
            GrayDispersion::new(1.0e-12, 0.0, 1.0e13),
            AngularResolution::new(2, 2),
            LinearGray::new(1.0),
        );
        let err = kspace
            .find_specs(0.1, 1.0, 0, Vector::new([0.0, 0.0, 1.0]))
            .unwrap_err();
        assert_eq!(
            err,
            KSpaceError::DegenerateGeometry("zero-magnitude group velocity")
        );
    }

    #[test]
    fn test_topk_sorted_insertion() {
        let mut ranked = TopK::<2>::new();
        for (i, key) in [0.1, 0.9, 0.5, 0.9, 0.95].into_iter().enumerate() {
            ranked.insert(key, i);
        }
        // 0.95 first; the earlier of the two 0.9 entries keeps second place.
        assert_eq!(ranked.entries[0], (0.95, 4));
        assert_eq!(ranked.entries[1], (0.9, 1));
    }
}
