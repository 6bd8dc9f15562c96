use std::f64::consts::{PI, TAU};

use glam::{DMat2, DVec2};

use super::*;
use crate::math::Fft2d;

fn mat(xx: f64, xy: f64, yy: f64) -> DMat2 {
    DMat2::from_cols(DVec2::new(xx, xy), DVec2::new(xy, yy))
}

fn single(mean: DVec2, var: DMat2) -> MixtureOfGaussians {
    MixtureOfGaussians::new(vec![1.0], vec![mean], vec![var])
}

// ============================================================================
// Construction and algebra
// ============================================================================

#[test]
fn test_try_from_arrays_rejects_mismatched_counts() {
    let err = MixtureOfGaussians::try_from_arrays(
        &[1.0, 2.0],
        &[[0.0, 0.0]],
        &[[[1.0, 0.0], [0.0, 1.0]]],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::ShapeMismatch {
            amp: 2,
            mean: 1,
            var: 1
        }
    );
}

#[test]
fn test_try_from_arrays_reads_row_major_covariance() {
    let mog =
        MixtureOfGaussians::try_from_arrays(&[1.0], &[[1.0, 2.0]], &[[[4.0, 1.0], [1.0, 9.0]]])
            .unwrap();
    let v = mog.var()[0];
    assert_eq!(v.x_axis.x, 4.0);
    assert_eq!(v.y_axis.y, 9.0);
    assert_eq!(v.y_axis.x, 1.0);
    assert_eq!(mog.mean()[0], DVec2::new(1.0, 2.0));
}

#[test]
fn test_constructor_symmetrizes_covariance() {
    let skewed = DMat2::from_cols(DVec2::new(2.0, 0.2), DVec2::new(0.4, 3.0));
    let mog = single(DVec2::ZERO, skewed);
    let v = mog.var()[0];
    assert!((v.x_axis.y - 0.3).abs() < 1e-15);
    assert!((v.y_axis.x - 0.3).abs() < 1e-15);
}

#[test]
fn test_sum_of_mixture_with_itself_is_normalized() {
    let a = MixtureOfGaussians::from_isotropic(&[0.25, 0.75], &[1.0, 4.0]);
    let s = a.sum(&a);
    assert_eq!(s.k(), 4);
    assert!((s.total_amplitude() - 1.0).abs() < 1e-12);
    assert!((s.amp()[0] - 0.125).abs() < 1e-12);
    assert_eq!((&a + &a), s);
}

#[test]
fn test_apply_affine_transforms_covariance() {
    let mog = single(DVec2::ZERO, DMat2::IDENTITY);
    let scale = mat(2.0, 0.0, 3.0);
    let moved = mog.apply_affine(DVec2::new(5.0, -1.0), scale);
    assert_eq!(moved.mean()[0], DVec2::new(5.0, -1.0));
    let v = moved.var()[0];
    assert!((v.x_axis.x - 4.0).abs() < 1e-12);
    assert!((v.y_axis.y - 9.0).abs() < 1e-12);
    assert!(v.y_axis.x.abs() < 1e-12);
}

#[test]
fn test_convolve_component_count_and_moments() {
    let a = MixtureOfGaussians::from_isotropic(&[0.5, 0.5], &[1.0, 2.0]);
    let b = MixtureOfGaussians::new(
        vec![0.2, 0.3, 0.5],
        vec![DVec2::new(1.0, 0.0), DVec2::ZERO, DVec2::new(0.0, -1.0)],
        vec![DMat2::IDENTITY; 3],
    );
    let c = a.convolve(&b);
    assert_eq!(c.k(), 6);
    assert!((c.total_amplitude() - 1.0).abs() < 1e-12);
    // First block pairs b's first component with each of a's.
    assert!((c.amp()[1] - 0.1).abs() < 1e-12);
    assert_eq!(c.mean()[1], DVec2::new(1.0, 0.0));
    assert!((c.var()[1].x_axis.x - 3.0).abs() < 1e-12);
}

#[test]
fn test_convolve_matches_closed_form_density() {
    let a = MixtureOfGaussians::new(
        vec![0.7, 0.3],
        vec![DVec2::new(0.5, -1.0), DVec2::new(-2.0, 0.25)],
        vec![mat(2.0, 0.5, 1.0), mat(0.8, -0.3, 3.0)],
    );
    let b = MixtureOfGaussians::new(
        vec![0.25, 0.75],
        vec![DVec2::new(1.0, 0.0), DVec2::new(0.0, 0.5)],
        vec![mat(1.5, 0.0, 1.5), mat(0.6, 0.2, 0.9)],
    );
    let density = |p: DVec2, mean: DVec2, var: DMat2| {
        let d = p - mean;
        (-0.5 * d.dot(var.inverse() * d)).exp() / (TAU * var.determinant().sqrt())
    };

    let points = [
        DVec2::ZERO,
        DVec2::new(1.5, -0.5),
        DVec2::new(-3.0, 2.0),
    ];
    let values = a.convolve(&b).evaluate(&points);
    for (p, value) in points.iter().zip(values) {
        let mut expected = 0.0;
        for k in 0..a.k() {
            for j in 0..b.k() {
                expected += a.amp()[k]
                    * b.amp()[j]
                    * density(*p, a.mean()[k] + b.mean()[j], a.var()[k] + b.var()[j]);
            }
        }
        assert!(
            (value - expected).abs() < 1e-12,
            "at {p}: {value} vs closed form {expected}"
        );
    }
}

#[test]
fn test_convolve_with_delta_is_identity() {
    let a = MixtureOfGaussians::new(
        vec![0.6, 0.4],
        vec![DVec2::new(0.5, -0.25), DVec2::ZERO],
        vec![mat(4.0, 1.0, 2.0), mat(1.0, 0.0, 1.0)],
    );
    let c = a.convolve(&MixtureOfGaussians::delta());
    assert_eq!(c.k(), a.k());
    let grid_a = a.evaluate_grid(-10, 11, -10, 11);
    let grid_c = c.evaluate_grid(-10, 11, -10, 11);
    for (x, y) in grid_a.iter().zip(grid_c.iter()) {
        assert!((x - y).abs() < 1e-15);
    }
}

#[test]
fn test_validate_reports_first_bad_component() {
    let mog = MixtureOfGaussians::new(
        vec![1.0, 1.0],
        vec![DVec2::ZERO; 2],
        vec![DMat2::IDENTITY, mat(1.0, 2.0, 1.0)],
    );
    match mog.validate() {
        Err(Error::NonPositiveDefinite { component, det }) => {
            assert_eq!(component, 1);
            assert!((det + 3.0).abs() < 1e-12);
        }
        other => panic!("expected NonPositiveDefinite, got {other:?}"),
    }
    assert!(MixtureOfGaussians::delta().validate().is_err());
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_unit_gaussian_peak_value() {
    let mog = single(DVec2::ZERO, DMat2::IDENTITY);
    let grid = mog.evaluate_grid(-2, 3, -2, 3);
    assert!((grid[(2, 2)] - 1.0 / (2.0 * PI)).abs() < 1e-15);
    let point = mog.evaluate(&[DVec2::ZERO, DVec2::new(1.0, 0.0)]);
    assert!((point[0] - 1.0 / TAU).abs() < 1e-15);
    assert!((point[1] - (-0.5f64).exp() / TAU).abs() < 1e-15);
}

#[test]
fn test_grid_sums_to_total_amplitude() {
    let mog = MixtureOfGaussians::new(
        vec![0.7, 0.3],
        vec![DVec2::new(0.2, -0.4), DVec2::new(-1.0, 0.5)],
        vec![mat(4.0, 1.0, 3.0), mat(9.0, -2.0, 6.0)],
    );
    let grid = mog.evaluate_grid(-40, 41, -40, 41);
    assert_eq!(grid.width(), 81);
    assert!((grid.sum() - 1.0).abs() < 1e-6, "sum = {}", grid.sum());
}

#[test]
fn test_large_grid_matches_pointwise_evaluation() {
    // Big enough to take the parallel path.
    let mog = single(DVec2::new(3.5, -2.0), mat(30.0, 5.0, 20.0));
    let grid = mog.evaluate_grid(-70, 70, -70, 70);
    let probes = [(0usize, 0usize), (73, 68), (139, 139), (10, 100)];
    for (col, row) in probes {
        let p = DVec2::new(col as f64 - 70.0, row as f64 - 70.0);
        let expected = mog.evaluate(&[p])[0];
        assert!((grid[(col, row)] - expected).abs() < 1e-18);
    }
}

#[test]
fn test_far_pixels_are_exactly_zero() {
    let mog = single(DVec2::ZERO, DMat2::IDENTITY);
    let grid = mog.evaluate_grid(100, 102, 0, 1);
    assert_eq!(grid.pixels(), &[0.0, 0.0]);
}

#[test]
fn test_degenerate_component_is_skipped() {
    let mog = MixtureOfGaussians::new(
        vec![1.0, 1.0],
        vec![DVec2::ZERO; 2],
        vec![DMat2::IDENTITY, DMat2::ZERO],
    );
    let grid = mog.evaluate_grid(0, 1, 0, 1);
    assert!((grid[(0, 0)] - 1.0 / TAU).abs() < 1e-15);
}

#[test]
fn test_position_derivatives_match_finite_difference() {
    let mog = MixtureOfGaussians::new(
        vec![0.6, 0.4],
        vec![DVec2::new(0.3, 0.1), DVec2::new(-0.2, 0.4)],
        vec![mat(3.0, 0.5, 2.0), mat(6.0, -1.0, 5.0)],
    );
    let derivs = mog.evaluate_grid_with_derivs(-8, 9, -8, 9);
    let h = 1e-6;
    let plus_x = mog.shifted(DVec2::new(h, 0.0)).evaluate_grid(-8, 9, -8, 9);
    let plus_y = mog.shifted(DVec2::new(0.0, h)).evaluate_grid(-8, 9, -8, 9);
    for i in 0..derivs.value.len() {
        let fd_x = (plus_x.pixels()[i] - derivs.value.pixels()[i]) / h;
        let fd_y = (plus_y.pixels()[i] - derivs.value.pixels()[i]) / h;
        assert!((fd_x - derivs.d_dx.pixels()[i]).abs() < 1e-6);
        assert!((fd_y - derivs.d_dy.pixels()[i]).abs() < 1e-6);
    }
}

// ============================================================================
// Approximate evaluation
// ============================================================================

struct ApproxCase {
    amp: Vec<f64>,
    mean: Vec<DVec2>,
    var: Vec<DMat2>,
    dx: f64,
    minval: f64,
}

fn approx_cases() -> Vec<ApproxCase> {
    let base = DVec2::new(0.3, 0.7);
    let one = |var: DMat2, mean: DVec2, minval: f64| ApproxCase {
        amp: vec![1.0],
        mean: vec![mean],
        var: vec![var],
        dx: 0.0,
        minval,
    };
    let tilted = mat(400.0, -100.0, 100.0);
    let pair = |a0: f64, dx: f64| ApproxCase {
        amp: vec![a0, 1.0 - a0],
        mean: vec![base, -base],
        var: vec![tilted; 2],
        dx,
        minval: 1e-9,
    };
    vec![
        one(mat(4.0, 4.0, 9.0), base, 1e-3),
        one(mat(4.0, -5.5, 9.0), base, 1e-3),
        one(mat(4.0, 0.0, 9.0), base, 1e-3),
        one(mat(100.0, 50.0, 100.0), base, 1e-6),
        one(mat(100.0, 50.0, 100.0), base, 1e-9),
        one(tilted, base, 1e-9),
        one(tilted, base - DVec2::new(0.8, 0.0), 1e-9),
        one(mat(4.0, 4.0, 9.0), base + DVec2::splat(10.0), 1e-9),
        one(mat(4.0, 4.0, 9.0), base + DVec2::new(0.0, 50.0), 1e-9),
        one(mat(4.0, 4.0, 9.0), base + DVec2::new(0.0, 80.0), 1e-9),
        pair(0.9, 0.0),
        pair(0.99, 0.0),
        pair(0.99, 1.0),
    ]
}

#[test]
fn test_approx_within_minval_of_exact() {
    for (i, case) in approx_cases().into_iter().enumerate() {
        let mog = MixtureOfGaussians::new(case.amp, case.mean, case.var);
        let approx = mog.evaluate_grid_approx(-50, 50, -51, 51, case.dx, 0.0, case.minval);
        let exact = mog.evaluate_grid_shifted(-50, 50, -51, 51, case.dx, 0.0);
        assert_eq!(approx.width(), 100);
        assert_eq!(approx.height(), 102);
        let max_diff = approx
            .iter()
            .zip(exact.iter())
            .fold(0.0f64, |m, (a, e)| m.max((a - e).abs()));
        assert!(
            max_diff < case.minval,
            "case {i}: max difference {max_diff:e} exceeds {:e}",
            case.minval
        );
    }
}

#[test]
fn test_approx_with_zero_minval_is_exact() {
    let mog = single(DVec2::new(1.0, 2.0), mat(5.0, 1.0, 4.0));
    let approx = mog.evaluate_grid_approx(-10, 10, -10, 10, 0.5, -0.5, 0.0);
    let exact = mog.evaluate_grid_shifted(-10, 10, -10, 10, 0.5, -0.5);
    assert_eq!(approx, exact);
}

#[test]
fn test_approx_handles_negative_amplitudes() {
    let mog = MixtureOfGaussians::new(
        vec![1.5, -0.5],
        vec![DVec2::ZERO; 2],
        vec![mat(9.0, 0.0, 9.0), mat(2.0, 0.0, 2.0)],
    );
    let approx = mog.evaluate_grid_approx(-30, 31, -30, 31, 0.0, 0.0, 1e-8);
    let exact = mog.evaluate_grid(-30, 31, -30, 31);
    for (a, e) in approx.iter().zip(exact.iter()) {
        assert!((a - e).abs() < 1e-8);
    }
}

// ============================================================================
// Fourier transform
// ============================================================================

#[test]
fn test_fourier_transform_dc_is_total_amplitude() {
    let mog = MixtureOfGaussians::from_isotropic(&[0.3, 0.5], &[1.0, 3.0]);
    let ft = mog.fourier_transform(&[0.0, 0.25], &[0.0]);
    assert!((ft[(0, 0)].re - 0.8).abs() < 1e-15);
    assert!(ft[(0, 0)].im.abs() < 1e-15);
    let expected = 0.3 * (-2.0 * PI * PI * 0.0625f64).exp()
        + 0.5 * (-2.0 * PI * PI * 0.0625 * 3.0f64).exp();
    assert!((ft[(1, 0)].re - expected).abs() < 1e-15);
}

#[test]
fn test_fourier_transform_of_delta_is_phase_ramp() {
    let mog = MixtureOfGaussians::delta().shifted(DVec2::new(1.0, 0.0));
    let ft = mog.fourier_transform(&[0.25], &[0.0]);
    // exp(-2 pi i * 0.25) = -i
    assert!(ft[(0, 0)].re.abs() < 1e-15);
    assert!((ft[(0, 0)].im + 1.0).abs() < 1e-15);
}

#[test]
fn test_inverse_fft_of_transform_matches_grid() {
    let n = 64;
    let fft = Fft2d::new(n);
    let center = DVec2::new(32.0, 31.0);
    let mog = single(center, mat(9.0, 1.0, 8.0));
    let freqs: Vec<f64> = (0..n).map(|k| fft.frequency(k)).collect();
    let ft = mog.fourier_transform(&freqs, &freqs);
    let mut data = ft.into_vec();
    fft.inverse(&mut data);
    let grid = mog.evaluate_grid(0, n as i32, 0, n as i32);
    for (c, g) in data.iter().zip(grid.iter()) {
        assert!((c.re - g).abs() < 1e-9);
        assert!(c.im.abs() < 1e-9);
    }
}
