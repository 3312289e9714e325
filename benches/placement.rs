use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use sheetnest::algorithms::nfp::{self, NfpCache};
use sheetnest::{Part, Polygon, Sheet};

fn regular_polygon_part(id: i32, n: usize, radius: f64) -> Part {
    let verts = (0..n)
        .map(|i| {
            let a = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (radius * a.cos(), radius * a.sin())
        })
        .collect::<Vec<_>>();
    let mut part = Part::new(id, format!("ngon{n}"), Polygon::from_coords(&verts));
    part.normalize();
    part
}

fn bench_convex_nfp(c: &mut Criterion) {
    let mut group = c.benchmark_group("convex_nfp");
    for n in [8usize, 16, 32] {
        let a = regular_polygon_part(1, n, 50.0).shape;
        let b = regular_polygon_part(2, n, 30.0).shape;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| nfp::compute_nfp(&a, &b))
        });
    }
    group.finish();
}

fn bench_sheet_fill(c: &mut Criterion) {
    let part = regular_polygon_part(1, 6, 20.0);
    c.bench_function("fill_sheet_20_hexagons", |bench| {
        bench.iter(|| {
            let mut sheet = Sheet::new(500.0, 300.0, 5.0, 2.0);
            let mut cache = NfpCache::new();
            let mut placed = 0;
            for _ in 0..20 {
                if let Some(pl) = sheet.find_best_placement(&part, &[0.0, 90.0], &mut cache) {
                    sheet.place(&part, pl.pos, pl.angle);
                    placed += 1;
                }
            }
            placed
        })
    });
}

criterion_group!(benches, bench_convex_nfp, bench_sheet_fill);
criterion_main!(benches);
