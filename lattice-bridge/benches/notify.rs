//! Notification fan-out benchmarks
//!
//! Measures the cost of one signal write reaching many embedded leaves, and
//! of a batched run of writes reaching a single tracked component.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lattice_bridge::bridge::{Embed, TrackedReads};
use lattice_bridge::host::{Component, Node, Root, Scope};
use lattice_bridge::reactive::{batch, Signal};
use lattice_bridge::Result;

struct Fanout {
    count: Signal<u64>,
    leaves: usize,
}

impl Component for Fanout {
    fn render(&self, _cx: &mut Scope<'_>) -> Result<Node> {
        Ok(Node::fragment((0..self.leaves).map(|_| self.count.to_node())))
    }
}

struct Tracked {
    count: Signal<u64>,
}

impl Component for Tracked {
    fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
        let reads = cx.use_tracked_reads()?;
        Ok(Node::text(format!("count: {}", reads.get(&self.count))))
    }
}

fn bench_leaf_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_fanout");

    for leaves in [1usize, 10, 100, 1000] {
        group.throughput(Throughput::Elements(leaves as u64));
        group.bench_with_input(BenchmarkId::from_parameter(leaves), &leaves, |b, &leaves| {
            let count = Signal::new(0u64);
            let mut root = Root::new();
            root.render(Node::component(Fanout {
                count: count.clone(),
                leaves,
            }))
            .expect("mount fanout");

            b.iter(|| {
                let _ = root.act(|| count.update(|n| n + 1));
                black_box(root.mounted_count());
            });
        });
    }

    group.finish();
}

fn bench_batched_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_writes");

    for writes in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(writes), &writes, |b, &writes| {
            let count = Signal::new(0u64);
            let mut root = Root::new();
            root.render(Node::component(Tracked { count: count.clone() }))
                .expect("mount tracked");

            b.iter(|| {
                let _ = root.act(|| {
                    batch(|| {
                        for _ in 0..writes {
                            count.update(|n| n + 1);
                        }
                    })
                });
                black_box(root.text());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_leaf_fanout, bench_batched_writes);
criterion_main!(benches);
