use crate::geom::vector::{Vector, cross, dot};

/// Defines how phonons leave a boundary surface.
///
/// The outgoing direction is continuous; redistributing it back onto the
/// discrete angular mesh is [`super::KSpace::find_specs`]'s job.
pub trait ReflectionModel {
    /// Computes the outgoing direction given incident direction and surface normal.
    fn reflect(&self, incident: Vector<f64, 3>, normal: Vector<f64, 3>) -> Vector<f64, 3>;
}

/// Mirror reflection off an atomically smooth boundary.
pub struct Specular;

impl ReflectionModel for Specular {
    fn reflect(&self, incident: Vector<f64, 3>, normal: Vector<f64, 3>) -> Vector<f64, 3> {
        incident - normal * (2.0 * dot(incident, normal))
    }
}

/// Fully diffuse reflection off a rough boundary (cosine-weighted hemisphere
/// sampling via Malley's method).
pub struct Diffuse;

impl ReflectionModel for Diffuse {
    fn reflect(&self, incident: Vector<f64, 3>, normal: Vector<f64, 3>) -> Vector<f64, 3> {
        use rand::Rng;
        // Flip the hemisphere so the outgoing phonon stays on the same side of
        // the boundary as the incident one (handles outward-facing normals).
        let hemisphere_normal = if dot(incident, normal) >= 0.0 {
            normal * -1.0
        } else {
            normal
        };

        // Orthonormal basis (tangent, bitangent) around the hemisphere normal.
        let n = hemisphere_normal;
        let arbitrary = if n[0].abs() < 0.9 {
            Vector::new([1.0, 0.0, 0.0])
        } else {
            Vector::new([0.0, 1.0, 0.0])
        };
        let tangent = cross(n, arbitrary)
            .normalize()
            .unwrap_or(Vector::new([1.0, 0.0, 0.0]));
        let bitangent = cross(n, tangent);

        // Sample uniformly on a disk, then project onto the hemisphere.
        // This produces a cosine-weighted distribution (pdf = cos(theta) / pi).
        let mut rng = rand::thread_rng();
        let u1: f64 = rng.r#gen();
        let u2: f64 = rng.r#gen();
        let r = u1.sqrt();
        let phi = 2.0 * std::f64::consts::PI * u2;
        let x = r * phi.cos();
        let y = r * phi.sin();
        let z = (1.0 - u1).sqrt(); // = sqrt(1 - r^2)

        tangent * x + bitangent * y + n * z
    }
}

/// Partially specular boundary with a Ziman-style specularity parameter:
/// specular with probability `specularity`, diffuse otherwise.
pub struct Partial {
    /// Specularity [0, 1]: 0 = fully diffuse, 1 = mirror.
    pub specularity: f64,
}

impl Partial {
    pub fn new(specularity: f64) -> Self {
        Self {
            specularity: specularity.clamp(0.0, 1.0),
        }
    }
}

impl ReflectionModel for Partial {
    fn reflect(&self, incident: Vector<f64, 3>, normal: Vector<f64, 3>) -> Vector<f64, 3> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let r: f64 = rng.r#gen();
        if r < self.specularity {
            Specular.reflect(incident, normal)
        } else {
            Diffuse.reflect(incident, normal)
        }
    }
}
