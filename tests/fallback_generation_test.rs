//! End-to-end check of the synchronous generation path: the exact data a
//! 640x480 container with the default 220 particles gets when no
//! background thread is available.

use stardust::geometry::{morph_position, LayoutParams, MORPH_EASE_END, MORPH_EASE_START};
use stardust::PositionSource;

#[test]
fn fallback_path_yields_three_aligned_arrays_with_the_exact_first_sphere_point() {
    let params = LayoutParams::default();
    let mut source = PositionSource::inline(220, params);
    let set = source.poll().expect("inline generation completes before the caller proceeds");

    assert_eq!(set.count, 220);
    assert_eq!(set.cloud.len(), 660);
    assert_eq!(set.sphere.len(), 660);
    assert_eq!(set.torus.len(), 660);
    assert_eq!(set.seeds.len(), 220);

    // First Fibonacci-sphere point, from the closed form:
    // phi0 = acos(1 - 2*0.5/220), theta0 = pi*(1+sqrt(5))*0.5.
    let radius = params.sphere_radius as f64;
    let phi0 = (1.0 - 2.0 * 0.5 / 220.0_f64).acos();
    let theta0 = std::f64::consts::PI * (1.0 + 5.0_f64.sqrt()) * 0.5;
    let expected = [
        (radius * phi0.sin() * theta0.cos()) as f32,
        (radius * phi0.sin() * theta0.sin()) as f32,
        (radius * phi0.cos()) as f32,
    ];

    for axis in 0..3 {
        assert!(
            (set.sphere[axis] - expected[axis]).abs() < 1e-4,
            "sphere[0].{axis} = {}, expected {}",
            set.sphere[axis],
            expected[axis]
        );
    }
}

#[test]
fn morph_factor_extremes_reproduce_the_source_layouts() {
    let mut source = PositionSource::inline(220, LayoutParams::default());
    let set = source.poll().unwrap();

    for i in 0..set.count {
        let at_zero = morph_position(&set, i, 0.0);
        let at_one = morph_position(&set, i, 1.0);
        for axis in 0..3 {
            assert_eq!(at_zero[axis], set.sphere[i * 3 + axis]);
            assert!((at_one[axis] - set.torus[i * 3 + axis]).abs() < 1e-5);
        }
    }
}

#[test]
fn morph_between_thresholds_is_a_strict_blend_of_both_layouts() {
    let mut source = PositionSource::inline(32, LayoutParams::default());
    let set = source.poll().unwrap();

    let midway = (MORPH_EASE_START + MORPH_EASE_END) / 2.0;
    for i in 0..set.count {
        let blended = morph_position(&set, i, midway);
        for axis in 0..3 {
            let sphere = set.sphere[i * 3 + axis];
            let torus = set.torus[i * 3 + axis];
            if (sphere - torus).abs() > 1e-4 {
                let low = sphere.min(torus);
                let high = sphere.max(torus);
                assert!(
                    blended[axis] > low && blended[axis] < high,
                    "midway blend must sit strictly between the layouts"
                );
            }
        }
    }
}
