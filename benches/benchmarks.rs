use coordinate_transforms::{
    Ellipsoid, MathTransform, Matrix, MercatorParams, TransverseMercatorParams, factory,
};
use criterion::{Criterion, criterion_group, criterion_main};
use faer::rand::{Rng, SeedableRng, rngs::SmallRng};
use std::hint::black_box;

const NPOINTS: usize = 1000;

/// Packed points with each ordinate in `[lo, hi)`.
fn coords(ndim: usize, lo: f64, hi: f64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(1991);
    let mut pts = Vec::with_capacity(NPOINTS * ndim);
    for _ in 0..NPOINTS * ndim {
        pts.push(lo + rng.random::<f64>() * (hi - lo));
    }
    pts
}

fn bench_points(c: &mut Criterion, name: &str, t: &MathTransform, src: &[f64]) {
    let mut dst = vec![0.0; NPOINTS * t.target_ndim()];
    c.bench_function(&format!("{name}/batch"), |b| {
        b.iter(|| {
            let _ = black_box(t.transform_points(src, 0, &mut dst, 0, NPOINTS));
        })
    });
    c.bench_function(&format!("{name}/single"), |b| {
        b.iter(|| {
            for pt in src.chunks_exact(t.source_ndim()) {
                let _ = black_box(t.transform_point(pt));
            }
        })
    });
}

fn affine_3d() -> MathTransform {
    let m = Matrix::try_new(
        vec![
            0.0, 2.0, 0.5, 1.0, //
            1.0, 0.0, 0.0, 2.0, //
            0.0, -1.0, 3.0, 3.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
        4,
    )
    .unwrap();
    factory::linear(m).unwrap()
}

fn linear(c: &mut Criterion) {
    let src = coords(3, 0.0, 100.0);
    bench_points(c, "linear_3d", &affine_3d(), &src);
    let scale = Matrix::scale_translate(&[2.0, 3.0], &[1.0, -1.0]).unwrap();
    bench_points(c, "affine_2d", &factory::linear(scale).unwrap(), &coords(2, 0.0, 100.0));
    bench_points(c, "linear_1d", &factory::linear_1d(2.0, 0.5), &coords(1, 0.0, 100.0));
}

fn concatenation(c: &mut Criterion) {
    let src = coords(3, 0.0, 100.0);
    let t = affine_3d();
    let inv = t.inverse().unwrap();
    // collapses to a single matrix
    let chain = factory::concatenate_all(&[t.clone(), inv.clone(), t.clone(), t.clone()]).unwrap();
    bench_points(c, "concatenated_linear", &chain, &src);

    let geo = factory::geocentric(Ellipsoid::WGS84, true).unwrap();
    let shift = Matrix::scale_translate(&[1.0; 3], &[-87.0, -98.0, -121.0]).unwrap();
    let route = factory::concatenate_all(&[
        geo.clone(),
        factory::linear(shift).unwrap(),
        factory::geocentric(Ellipsoid::INTERNATIONAL_1924, true)
            .unwrap()
            .inverse()
            .unwrap(),
    ])
    .unwrap();
    bench_points(c, "concatenated_datum_shift", &route, &coords(3, -80.0, 80.0));
}

fn projections(c: &mut Criterion) {
    let src = coords(2, -80.0, 80.0);
    let merc = factory::projection(MercatorParams::default()).unwrap();
    bench_points(c, "mercator", &merc, &src);

    let utm = factory::projection(TransverseMercatorParams::utm(31, true).unwrap()).unwrap();
    let near_zone: Vec<f64> = coords(2, 0.0, 6.0)
        .chunks_exact(2)
        .flat_map(|pt| [pt[0], pt[1] * 10.0])
        .collect();
    bench_points(c, "transverse_mercator", &utm, &near_zone);
    let xy = {
        let mut out = vec![0.0; near_zone.len()];
        let _ = utm.transform_points(&near_zone, 0, &mut out, 0, NPOINTS);
        out
    };
    bench_points(c, "transverse_mercator_inverse", &utm.inverse().unwrap(), &xy);
}

fn geocentric(c: &mut Criterion) {
    let src = coords(3, -80.0, 80.0);
    let geo = factory::geocentric(Ellipsoid::WGS84, true).unwrap();
    bench_points(c, "geocentric", &geo, &src);
    let mut xyz = vec![0.0; src.len()];
    let _ = geo.transform_points(&src, 0, &mut xyz, 0, NPOINTS);
    bench_points(c, "geocentric_inverse", &geo.inverse().unwrap(), &xyz);
}

criterion_group!(benches, linear, concatenation, projections, geocentric);
criterion_main!(benches);
