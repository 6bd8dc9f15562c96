//! End-to-end rendering and fitting scenarios.

use std::sync::Arc;

use common::Buffer2;
use glam::{DMat2, DVec2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tractor::prelude::*;
use tractor::{FiniteDifference, PixelizedPsf, Shape};

fn blank_image(width: usize, height: usize, psf: Psf) -> Image {
    Image::new(
        Buffer2::new_default(width, height),
        Buffer2::new_filled(width, height, 1.0),
        psf,
        Arc::new(NullWcs::default()),
        Arc::new(LinearPhotoCal::default()),
        ConstantSky::default(),
    )
    .unwrap()
}

fn exponential_galaxy(flux: f64) -> Source {
    Galaxy::sersic(
        DVec2::new(50.0, 40.0),
        Brightness::Flux(flux),
        EllipseE::circular(3.0),
        SersicIndex::new(1.0),
    )
    .into()
}

#[test]
fn test_sersic_galaxy_flux_is_conserved() {
    let mut catalog = Catalog::new();
    catalog.push(exponential_galaxy(1234.5));
    let tractor = Tractor::new(vec![blank_image(101, 81, Psf::gaussian(2.0))], catalog);

    let total = tractor.get_model_image(0).sum();
    assert!(
        ((total - 1234.5) / 1234.5).abs() < 1e-3,
        "rendered flux {total}"
    );
}

#[test]
fn test_pixelized_psf_conserves_flux() {
    let Psf::Mixture(gaussian) = Psf::gaussian(2.0) else {
        unreachable!()
    };
    let psf = Psf::Pixelized(PixelizedPsf::from_mixture(&gaussian, 12).unwrap());
    let mut catalog = Catalog::new();
    catalog.push(exponential_galaxy(1234.5));
    let tractor = Tractor::new(vec![blank_image(101, 81, psf)], catalog);

    let total = tractor.get_model_image(0).sum();
    assert!(
        ((total - 1234.5) / 1234.5).abs() < 1e-3,
        "rendered flux {total}"
    );
}

#[test]
fn test_noisy_sersic_fit_recovers_parameters() {
    let truth = Galaxy::sersic(
        DVec2::new(40.3, 37.8),
        Brightness::Flux(5000.0),
        EllipseE::new(4.0, 0.2, 0.1),
        SersicIndex::new(2.0),
    );
    let mut image = blank_image(80, 76, Psf::gaussian(1.8));
    let clean = Tractor::new(vec![image.clone()], vec![Source::from(truth)].into())
        .get_model_image(0);

    let mut rng = StdRng::seed_from_u64(0x7a5c);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let noisy = clean.map(|v| v + noise.sample(&mut rng));
    image.set_data(noisy).unwrap();

    let start = Galaxy::sersic(
        DVec2::new(40.8, 37.4),
        Brightness::Flux(3500.0),
        EllipseE::new(3.0, 0.0, 0.0),
        SersicIndex::new(2.5).with_step(0.01, FiniteDifference::Central),
    );
    let mut tractor = Tractor::new(vec![image], vec![Source::from(start)].into());
    let lnp_start = tractor.get_log_likelihood();

    let result = tractor
        .optimize_loop(&OptimizerConfig::default())
        .unwrap();
    assert!(result.converged, "{result:?}");
    assert!(result.log_likelihood > lnp_start);

    let Source::Galaxy(fitted) = tractor.catalog().get(0).unwrap() else {
        panic!("source changed type");
    };
    let pos = fitted.position();
    assert!((pos - DVec2::new(40.3, 37.8)).length() < 0.1, "pos {pos}");
    let flux = fitted.brightness().value();
    assert!((flux - 5000.0).abs() < 250.0, "flux {flux}");
    let Shape::E(shape) = *fitted.shape() else {
        panic!("shape changed parameterization");
    };
    assert!((shape.re - 4.0).abs() < 0.4, "re {}", shape.re);
    assert!((shape.e1 - 0.2).abs() < 0.05, "e1 {}", shape.e1);
    assert!((shape.e2 - 0.1).abs() < 0.05, "e2 {}", shape.e2);
    let index = fitted.value(6);
    assert!((index - 2.0).abs() < 0.5, "sersic index {index}");

    // A near-truth fit leaves chi^2 per pixel close to one.
    let chi2_per_pixel = -2.0 * result.log_likelihood / (80.0 * 76.0);
    assert!((chi2_per_pixel - 1.0).abs() < 0.1, "chi2/pixel {chi2_per_pixel}");
}

#[test]
fn test_point_source_fit_across_two_images() {
    let truth_pos = DVec2::new(0.6, -0.4);
    let truth = PointSource::new(truth_pos, Brightness::Mag(18.0));

    // Image A: 0.5 sky units per pixel, reference at the image center.
    let wcs_a = LinearWcs::new(
        DVec2::new(20.0, 20.0),
        DVec2::ZERO,
        DMat2::from_diagonal(DVec2::splat(0.5)),
    )
    .unwrap();
    // Image B: rotated by 90 degrees, 0.4 sky units per pixel.
    let wcs_b = LinearWcs::new(
        DVec2::new(16.0, 18.0),
        DVec2::ZERO,
        DMat2::from_cols(DVec2::new(0.0, 0.4), DVec2::new(-0.4, 0.0)),
    )
    .unwrap();

    let make = |w: usize, h: usize, psf: Psf, wcs: LinearWcs| {
        Image::new(
            Buffer2::new_default(w, h),
            Buffer2::new_filled(w, h, 1.0),
            psf,
            Arc::new(wcs),
            Arc::new(MagsPhotoCal { zeropoint: 25.0 }),
            ConstantSky::default(),
        )
        .unwrap()
    };
    let mut images = vec![
        make(40, 40, Psf::gaussian(1.5), wcs_a),
        make(32, 36, Psf::n_circular_gaussian(&[1.0, 3.0], &[0.8, 0.2]), wcs_b),
    ];
    for image in &mut images {
        let clean = Tractor::new(vec![image.clone()], vec![Source::from(truth.clone())].into())
            .get_model_image(0);
        image.set_data(clean).unwrap();
    }

    let start = PointSource::new(DVec2::new(0.9, -0.1), Brightness::Mag(18.4));
    let mut tractor = Tractor::new(images, vec![Source::from(start)].into());
    let result = tractor
        .optimize_loop(&OptimizerConfig::default())
        .unwrap();
    assert!(result.converged, "{result:?}");

    let fitted = tractor.catalog().get(0).unwrap();
    assert!((fitted.position() - truth_pos).length() < 5e-3);
    assert!((fitted.brightness().value() - 18.0).abs() < 5e-3);
}
