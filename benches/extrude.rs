use criterion::{criterion_group, criterion_main, Criterion};
use footprint_tiler::mesh::build_solid;
use footprint_tiler::types::{Attributes, Footprint};

/// Star-shaped concave footprint with `points` tips (2 * points vertices).
fn make_star(points: usize) -> Footprint {
    let n = points * 2;
    let coords: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * std::f64::consts::TAU;
            let radius = if i % 2 == 0 { 50.0 } else { 20.0 };
            [radius * angle.cos(), radius * angle.sin()]
        })
        .collect();
    Footprint::from_coords(&coords)
}

fn bench_build_solid(c: &mut Criterion) {
    let attrs = Attributes::new();
    let simple = make_star(4);
    let detailed = make_star(256);

    c.bench_function("build_solid_star_8", |b| {
        b.iter(|| build_solid(&simple, 25.0, &attrs));
    });

    c.bench_function("build_solid_star_512", |b| {
        b.iter(|| build_solid(&detailed, 25.0, &attrs));
    });
}

fn bench_to_glb(c: &mut Criterion) {
    let attrs = Attributes::new();
    let solid = build_solid(&make_star(256), 25.0, &attrs).unwrap();

    c.bench_function("to_glb_star_512", |b| {
        b.iter(|| solid.to_glb(false));
    });

    c.bench_function("to_glb_compressed_star_512", |b| {
        b.iter(|| solid.to_glb(true));
    });
}

criterion_group!(benches, bench_build_solid, bench_to_glb);
criterion_main!(benches);
