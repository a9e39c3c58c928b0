use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fragment_catalog::{ColorId, ColoredGraph, FragmentCatalog, PreparedGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn random_fragment(rng: &mut StdRng, n: usize, p: f64) -> ColoredGraph {
    let colors = (0..n).map(|_| ColorId::new(rng.gen_range(0..4))).collect();
    let mut edges = vec![];
    for u in 0..n {
        for v in u + 1..n {
            if v == u + 1 || rng.gen_bool(p) {
                edges.push((u, v, ColorId::new(rng.gen_range(0..2))));
            }
        }
    }
    ColoredGraph::new(colors, edges).unwrap()
}

fn relabelled(rng: &mut StdRng, graph: &ColoredGraph) -> ColoredGraph {
    let mut perm: Vec<usize> = (0..graph.vertex_count()).collect();
    perm.shuffle(rng);
    let mut colors = vec![ColorId::new(0); perm.len()];
    for (u, color) in graph.vertex_colors().enumerate() {
        colors[perm[u]] = color;
    }
    ColoredGraph::new(colors, graph.edges().map(|(u, v, c)| (perm[u], perm[v], c))).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let candidates: Vec<_> = (0..2000).map(|i| random_fragment(&mut rng, 4 + i % 12, 0.15)).collect();

    c.bench_function("find_or_insert", |b| {
        b.iter_batched(
            || candidates.clone(),
            |candidates| {
                let mut catalog = FragmentCatalog::new();
                for candidate in candidates {
                    black_box(catalog.find_or_insert(candidate, "bench"));
                }
                catalog
            },
            BatchSize::LargeInput,
        )
    });

    let a = random_fragment(&mut rng, 40, 0.08);
    let b = relabelled(&mut rng, &a);
    let (pa, pb) = (PreparedGraph::new(&a), PreparedGraph::new(&b));
    c.bench_function("isomorphism", |bencher| {
        bencher.iter(|| black_box(black_box(&pa).find_isomorphism(black_box(&pb), u64::MAX)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
