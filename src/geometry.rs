//! Particle layout generation.
//!
//! Every particle has three simultaneous layouts: a random box cloud, a
//! Fibonacci-sphere surface point and a torus surface point, plus a scalar
//! seed driving its animation phase in the shaders. All four arrays are
//! generated once at startup and never mutated; only the morph factor
//! supplied per frame changes what is rendered.

use rand::Rng;

/// Torus minor-angle stride. An odd stride decorrelates the minor angle
/// from the major angle so particle counts with small factors don't band
/// into visible rings.
const TORUS_STRIDE: usize = 17;

/// Dimensions of the three layouts.
///
/// Defaults match the tuned backdrop: a 120x80x60 cloud box, a sphere of
/// radius 60 and a 40/15 torus.
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    /// Full extents of the random cloud box (x, y, z spans).
    pub cloud_extent: [f32; 3],
    /// Radius of the Fibonacci sphere.
    pub sphere_radius: f32,
    /// Distance from the torus center to the tube center.
    pub torus_major_radius: f32,
    /// Radius of the torus tube.
    pub torus_minor_radius: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            cloud_extent: [120.0, 80.0, 60.0],
            sphere_radius: 60.0,
            torus_major_radius: 40.0,
            torus_minor_radius: 15.0,
        }
    }
}

/// The generated particle data: three index-aligned position arrays
/// (`3 * count` floats each, xyz interleaved) and one seed array
/// (`count` floats in `[0, 1)`).
///
/// Index `i` refers to the same particle in all four arrays.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    pub count: usize,
    pub cloud: Vec<f32>,
    pub sphere: Vec<f32>,
    pub torus: Vec<f32>,
    pub seeds: Vec<f32>,
}

impl ParticleSet {
    /// Generates all layouts for `count` particles.
    pub fn generate(count: usize, params: &LayoutParams) -> Self {
        Self {
            count,
            cloud: generate_cloud(count, params.cloud_extent),
            sphere: generate_fibonacci_sphere(count, params.sphere_radius),
            torus: generate_torus(
                count,
                params.torus_major_radius,
                params.torus_minor_radius,
            ),
            seeds: generate_seeds(count),
        }
    }
}

/// Random cloud layout: each coordinate uniform in half the span around
/// the origin. Intentionally unseeded; reproducibility is not required
/// for the resting layout.
pub fn generate_cloud(count: usize, extent: [f32; 3]) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut positions = Vec::with_capacity(count * 3);

    for _ in 0..count {
        positions.push((rng.gen::<f32>() - 0.5) * extent[0]);
        positions.push((rng.gen::<f32>() - 0.5) * extent[1]);
        positions.push((rng.gen::<f32>() - 0.5) * extent[2]);
    }

    positions
}

/// Fibonacci-sphere layout: the golden-angle spiral places `count` points
/// near-uniformly on the sphere surface.
pub fn generate_fibonacci_sphere(count: usize, radius: f32) -> Vec<f32> {
    let mut positions = Vec::with_capacity(count * 3);
    let golden_angle = std::f64::consts::PI * (1.0 + 5.0_f64.sqrt());

    for i in 0..count {
        let phi = (1.0 - 2.0 * (i as f64 + 0.5) / count as f64).acos();
        let theta = golden_angle * (i as f64 + 0.5);

        positions.push((radius as f64 * phi.sin() * theta.cos()) as f32);
        positions.push((radius as f64 * phi.sin() * theta.sin()) as f32);
        positions.push((radius as f64 * phi.cos()) as f32);
    }

    positions
}

/// Torus layout: major angle advances linearly with the index, minor
/// angle advances with stride [`TORUS_STRIDE`].
pub fn generate_torus(count: usize, major_radius: f32, minor_radius: f32) -> Vec<f32> {
    let mut positions = Vec::with_capacity(count * 3);
    let tau = std::f32::consts::TAU;

    for i in 0..count {
        let u = i as f32 / count as f32 * tau;
        let v = ((i * TORUS_STRIDE) % count) as f32 / count as f32 * tau;

        positions.push((major_radius + minor_radius * v.cos()) * u.cos());
        positions.push((major_radius + minor_radius * v.cos()) * u.sin());
        positions.push(minor_radius * v.sin());
    }

    positions
}

/// Per-particle animation phase seeds, uniform in `[0, 1)`. Unseeded by
/// design; only used for visual phase offsets.
pub fn generate_seeds(count: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen::<f32>()).collect()
}

/// Quintic smoothstep with zero first and second derivatives at both
/// edges. CPU mirror of the easing used in the vertex shader.
pub fn smootherstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Morph easing thresholds: the blend holds pure sphere below the first
/// and pure torus above the second.
pub const MORPH_EASE_START: f32 = 0.3;
pub const MORPH_EASE_END: f32 = 0.7;

/// Host-side reference for the vertex-stage morph (before flow jitter):
/// blends particle `i` between its sphere and torus positions using the
/// eased morph factor.
pub fn morph_position(set: &ParticleSet, i: usize, morph_factor: f32) -> [f32; 3] {
    let t = smootherstep(MORPH_EASE_START, MORPH_EASE_END, morph_factor);
    let mut out = [0.0; 3];
    for axis in 0..3 {
        let a = set.sphere[i * 3 + axis];
        let b = set.torus[i * 3 + axis];
        out[axis] = a + (b - a) * t;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length3(p: &[f32]) -> f32 {
        (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
    }

    #[test]
    fn particle_set_arrays_are_index_aligned() {
        let set = ParticleSet::generate(220, &LayoutParams::default());
        assert_eq!(set.count, 220);
        assert_eq!(set.cloud.len(), 660);
        assert_eq!(set.sphere.len(), 660);
        assert_eq!(set.torus.len(), 660);
        assert_eq!(set.seeds.len(), 220);
    }

    #[test]
    fn all_sphere_points_lie_on_the_sphere_surface() {
        for count in [5, 37, 220, 1000] {
            let radius = 60.0;
            let positions = generate_fibonacci_sphere(count, radius);
            for i in 0..count {
                let r = length3(&positions[i * 3..i * 3 + 3]);
                assert!(
                    (r - radius).abs() < 1e-3,
                    "point {i} of {count} is at radius {r}, expected {radius}"
                );
            }
        }
    }

    #[test]
    fn sphere_distribution_is_near_uniform() {
        // Near-uniform density: nearest-neighbor distances should have a
        // small spread relative to their mean.
        let count = 220;
        let positions = generate_fibonacci_sphere(count, 60.0);
        let mut nearest = vec![f32::INFINITY; count];

        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                let dx = positions[i * 3] - positions[j * 3];
                let dy = positions[i * 3 + 1] - positions[j * 3 + 1];
                let dz = positions[i * 3 + 2] - positions[j * 3 + 2];
                let d = (dx * dx + dy * dy + dz * dz).sqrt();
                if d < nearest[i] {
                    nearest[i] = d;
                }
            }
        }

        let mean = nearest.iter().sum::<f32>() / count as f32;
        let variance =
            nearest.iter().map(|d| (d - mean) * (d - mean)).sum::<f32>() / count as f32;
        let relative_spread = variance.sqrt() / mean;
        assert!(
            relative_spread < 0.25,
            "nearest-neighbor spread too high: {relative_spread}"
        );
    }

    #[test]
    fn all_torus_points_lie_on_the_tube_surface() {
        let (major, minor) = (40.0, 15.0);
        for count in [11, 220, 509] {
            let positions = generate_torus(count, major, minor);
            for i in 0..count {
                let x = positions[i * 3];
                let y = positions[i * 3 + 1];
                let z = positions[i * 3 + 2];
                // Distance from the point to the major-radius circle.
                let ring_distance = ((x * x + y * y).sqrt() - major).hypot(z);
                assert!(
                    (ring_distance - minor).abs() < 1e-3,
                    "point {i} of {count} is {ring_distance} from the ring"
                );
            }
        }
    }

    #[test]
    fn cloud_points_stay_inside_the_box() {
        let extent = [120.0, 80.0, 60.0];
        let positions = generate_cloud(500, extent);
        for i in 0..500 {
            for axis in 0..3 {
                assert!(positions[i * 3 + axis].abs() <= extent[axis] / 2.0);
            }
        }
    }

    #[test]
    fn seeds_are_unit_interval_scalars() {
        let seeds = generate_seeds(1000);
        assert_eq!(seeds.len(), 1000);
        assert!(seeds.iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn morph_holds_endpoints_outside_the_easing_window() {
        let set = ParticleSet::generate(64, &LayoutParams::default());
        for i in [0, 13, 63] {
            for factor in [0.0, 0.1, MORPH_EASE_START] {
                let p = morph_position(&set, i, factor);
                assert_eq!(p, [set.sphere[i * 3], set.sphere[i * 3 + 1], set.sphere[i * 3 + 2]]);
            }
            for factor in [MORPH_EASE_END, 0.9, 1.0] {
                let p = morph_position(&set, i, factor);
                for axis in 0..3 {
                    // t = 1 evaluates a + (b - a), which can differ from b
                    // by an ulp.
                    assert!((p[axis] - set.torus[i * 3 + axis]).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn morph_blend_is_strictly_monotonic_between_thresholds() {
        let set = ParticleSet::generate(8, &LayoutParams::default());
        let i = 3;
        // Project onto the sphere->torus direction; the projection must
        // strictly increase while the factor crosses the easing window.
        let direction: Vec<f32> = (0..3)
            .map(|a| set.torus[i * 3 + a] - set.sphere[i * 3 + a])
            .collect();

        let mut previous = f32::NEG_INFINITY;
        for step in 1..20 {
            let factor = MORPH_EASE_START + (MORPH_EASE_END - MORPH_EASE_START) * step as f32 / 20.0;
            let p = morph_position(&set, i, factor);
            let along = (0..3).map(|a| p[a] * direction[a]).sum::<f32>();
            assert!(
                along > previous,
                "blend must strictly advance at factor {factor}"
            );
            previous = along;
        }
    }

    #[test]
    fn smootherstep_has_flat_ends_and_a_half_midpoint() {
        assert_eq!(smootherstep(0.3, 0.7, 0.0), 0.0);
        assert_eq!(smootherstep(0.3, 0.7, 1.0), 1.0);
        assert!((smootherstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }
}
