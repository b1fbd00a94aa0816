// Benchmarks for the growth → mesh → index pipeline and for ray picking.
//
// Run with: cargo bench --bench pipeline_bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;
use grove_core::{Config, GenealogyDocument, Person, Snapshot};

/// Complete family with `branching` children per person, `depth` generations deep.
fn family(branching: usize, depth: usize) -> GenealogyDocument {
    let mut doc = GenealogyDocument::new("p0");
    let mut next = 1;
    let mut frontier = vec![("p0".to_string(), 1)];
    while let Some((id, level)) = frontier.pop() {
        let children: Vec<String> = if level < depth {
            (0..branching)
                .map(|_| {
                    let child = format!("p{next}");
                    next += 1;
                    child
                })
                .collect()
        } else {
            Vec::new()
        };
        for child in &children {
            frontier.push((child.clone(), level + 1));
        }
        let bio = "lorem ipsum ".repeat(next % 40);
        doc = doc.person(Person::new(id, "Person").with_biography(bio).with_children(children));
    }
    doc
}

/// Benchmark a full snapshot build at several family sizes.
fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build");
    let cfg = Config::default();

    for (branching, depth) in [(2, 5), (3, 5), (2, 9)] {
        let doc = family(branching, depth);
        group.bench_with_input(
            BenchmarkId::new("people", doc.people.len()),
            &doc,
            |b, doc| b.iter(|| Snapshot::build(black_box(doc.clone()), &cfg)),
        );
    }

    group.finish();
}

/// Benchmark picking rays aimed at every segment midpoint.
fn benchmark_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick");
    let cfg = Config::default();

    for (branching, depth) in [(2, 5), (2, 9)] {
        let Ok(snap) = Snapshot::build(family(branching, depth), &cfg) else {
            continue;
        };
        let rays: Vec<(Vec3, Vec3)> = snap
            .skeleton()
            .segments
            .iter()
            .map(|s| {
                let side = s.direction().any_orthonormal_vector();
                (s.midpoint() + side * 20.0, -side)
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("segments", snap.skeleton().len()),
            &rays,
            |b, rays| {
                b.iter(|| {
                    rays.iter()
                        .filter(|(o, d)| snap.pick(black_box(*o), black_box(*d)).is_some())
                        .count()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_pick);
criterion_main!(benches);
