use std::f64::consts::PI;

use anyhow::Result;
use phonon3d::Vector;
use phonon3d::geom::vector::mag;
use phonon3d::phonon::{
    AngularResolution, GrayDispersion, KSpace, LinearGray, NewtonConfig, Partial, ReflectionModel,
};

/// Demonstrate the gray k-space pipeline and verify against closed forms.
///
/// Part 1: Angular discretization: cell counts and the solid-angle closure
///         against the exact 4*pi.
/// Part 2: Aggregate integrals: relaxation measure and specific heat against
///         the gray identities.
/// Part 3: Equilibrium solve and a partially specular wall bounce
///         redistributed back onto the discrete directions.
fn main() -> Result<()> {
    // Gray silicon-like parameters
    let tau = 6.5e-12; // s
    let vgmag = 6400.0; // m/s
    let omega = 1.0e13; // rad/s
    let heat_capacity = 1.66e6; // J/(m^3*K*sr)

    let resolution = AngularResolution::new(8, 16);
    let kspace = KSpace::gray(
        GrayDispersion::new(tau, vgmag, omega),
        resolution,
        LinearGray::new(heat_capacity),
    );

    println!("Gray Phonon K-Space: Analytical Verification");
    println!("{:=<60}", "");
    println!();
    println!("Discretization: {} x {} bins", resolution.ntheta, resolution.nphi);
    println!("  Cells: {}", kspace.len());
    println!("  Modes: {}", kspace.total_mode_count());
    let totvol = kspace.total_volume();
    let vol_err = (totvol - 4.0 * PI).abs() / (4.0 * PI);
    println!("  Directional volume: {totvol:.6} sr (4*pi = {:.6})", 4.0 * PI);
    println!("  Closure error: {:.3e} relative", vol_err);
    println!();

    println!("PART 2: Aggregate Integrals");
    println!("{:-<60}", "");
    let tau_tot = kspace.total_relaxation_measure();
    println!("  Relaxation measure: {tau_tot:.6e} (totvol/tau = {:.6e})", totvol / tau);
    let cv = kspace.specific_heat(300.0);
    println!("  Specific heat at 300 K: {cv:.6e} (c*totvol = {:.6e})", heat_capacity * totvol);
    println!();

    println!("PART 3: Equilibrium Solve + Wall Reflection");
    println!("{:-<60}", "");
    let t0 = 305.0;
    let e_sum = heat_capacity * t0 * totvol / tau;
    let mut guess = 250.0;
    let iters = kspace.solve_equilibrium_temperature(&mut guess, e_sum, &NewtonConfig::default())?;
    println!("  Newton: {guess:.4} K in {iters} iterations (target {t0} K)");

    // Phonon hits a wall at 60 degrees; the boundary is 70% specular.
    let wall_normal = Vector::new([0.0, 0.0, 1.0]);
    let incident = Vector::new([3.0_f64.sqrt() / 2.0, 0.0, -0.5]);
    let boundary = Partial::new(0.7);
    let so = boundary
        .reflect(incident, wall_normal)
        .normalize()
        .expect("reflected direction is non-zero");

    let dk3 = kspace.cell(0).directional_volume();
    let vo = vgmag;
    let shares = kspace.find_specs(dk3, vo, 0, so)?;
    println!("  Outgoing direction: {so:.4}");
    for (rank, share) in shares.iter().enumerate() {
        println!(
            "  Recipient {}: cell {:3}  weight {:.6e}",
            rank + 1,
            share.cell,
            share.weight
        );
    }
    let reconstructed: f64 = shares
        .iter()
        .map(|s| {
            let kv = kspace.cell(s.cell);
            s.weight * mag(kv.mode(0).group_velocity()) * kv.directional_volume()
        })
        .sum();
    println!(
        "  Flux conservation: {reconstructed:.6e} vs {:.6e}",
        vo * dk3
    );

    Ok(())
}
