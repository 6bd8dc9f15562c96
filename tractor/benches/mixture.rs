use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec2;
use tractor::{EllipseE, MixtureOfGaussians, SersicProfileTable};

/// Sersic 4 galaxy, r_e = 6 px, axis ratio 0.4, convolved with a 2-px PSF.
fn galaxy() -> MixtureOfGaussians {
    let table = SersicProfileTable::shared();
    let t = EllipseE::from_axes(6.0, 0.4, 30.0).to_affine();
    let psf = MixtureOfGaussians::from_isotropic(&[1.0], &[4.0]);
    table
        .profile(4.0)
        .apply_affine(DVec2::ZERO, t.transpose())
        .convolve(&psf)
}

fn bench_grid(c: &mut Criterion) {
    let mixture = galaxy();
    let mut group = c.benchmark_group("evaluate_grid_101x101");
    group.bench_function("exact", |b| {
        b.iter(|| black_box(&mixture).evaluate_grid_shifted(-50, 51, -50, 51, 0.3, 0.7))
    });
    for minval in [1e-6, 1e-9] {
        group.bench_function(format!("approx_{minval:e}"), |b| {
            b.iter(|| {
                black_box(&mixture).evaluate_grid_approx(-50, 51, -50, 51, 0.3, 0.7, minval)
            })
        });
    }
    group.bench_function("with_derivs", |b| {
        b.iter(|| black_box(&mixture).evaluate_grid_with_derivs(-50, 51, -50, 51))
    });
    group.finish();
}

fn bench_profile_lookup(c: &mut Criterion) {
    let table = SersicProfileTable::shared();
    c.bench_function("sersic_profile_blend_0.6", |b| {
        b.iter(|| table.profile(black_box(0.6)))
    });
}

criterion_group!(benches, bench_grid, bench_profile_lookup);
criterion_main!(benches);
