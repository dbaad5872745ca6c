use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use linkstore::{InsertPos, ListStore, TreeStore};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_list_head_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_head_insert");
    for &n in &[64usize, 1024, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                ListStore::<u64>::new,
                |mut list| {
                    for i in 0..n as u64 {
                        list.insert_after(0, black_box(i)).unwrap();
                    }
                    list
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_list_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_churn");
    for &n in &[1024usize, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let mut list: ListStore<u64> = ListStore::with_capacity(n);
                    let mut locs = Vec::with_capacity(n);
                    let mut prev = 0;
                    for i in 0..n as u64 {
                        prev = list.insert_after(prev, i).unwrap();
                        locs.push(prev);
                    }
                    (list, locs, StdRng::seed_from_u64(42))
                },
                |(mut list, mut locs, mut rng)| {
                    // Steady-state remove/insert cycles through the free chain
                    for _ in 0..n {
                        let i = rng.random_range(0..locs.len());
                        let victim = locs.swap_remove(i);
                        list.remove_at(victim).unwrap();
                        let anchor = locs[rng.random_range(0..locs.len())];
                        locs.push(list.insert_after(anchor, 7).unwrap());
                    }
                    list
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_tree_subtree_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_subtree_removal");
    for &fanout in &[4usize, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, &fanout| {
            b.iter_batched(
                || {
                    // Three levels of `fanout` children each under one root
                    let mut tree: TreeStore<u64> = TreeStore::new();
                    let root = tree.insert(InsertPos::FirstChildOf(0), 0).unwrap();
                    for _ in 0..fanout {
                        let mid = tree.insert(InsertPos::FirstChildOf(root), 1).unwrap();
                        for _ in 0..fanout {
                            let leaf = tree.insert(InsertPos::FirstChildOf(mid), 2).unwrap();
                            for _ in 0..fanout {
                                tree.insert(InsertPos::FirstChildOf(leaf), 3).unwrap();
                            }
                        }
                    }
                    (tree, root)
                },
                |(mut tree, root)| {
                    tree.remove_subtree(black_box(root)).unwrap();
                    tree
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_list_head_insert,
    bench_list_churn,
    bench_tree_subtree_removal
);
criterion_main!(benches);
