//! Registry lookup and filter benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathwatch::{Op, Pattern, WatchEntry, WatchRegistry, ALL_OPS};
use std::path::PathBuf;

/// Registry with `dirs` directory watches, each with one individually watched file
fn build_registry(dirs: usize) -> WatchRegistry {
    let registry = WatchRegistry::new();
    for i in 0..dirs {
        registry.add(WatchEntry::dir(
            format!("project/dir{i}"),
            Pattern::new("*.rs"),
            Op::CREATE | Op::WRITE,
            true,
        ));
        registry.add(WatchEntry::file(format!("project/dir{i}/Cargo.toml"), ALL_OPS));
    }
    registry
}

fn bench_find_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_for");
    for size in [10, 100, 1000] {
        let registry = build_registry(size);
        let direct = PathBuf::from(format!("project/dir{}/Cargo.toml", size - 1));
        let via_parent = PathBuf::from(format!("project/dir{}/src.rs", size - 1));

        group.bench_with_input(BenchmarkId::new("direct_file", size), &direct, |b, path| {
            b.iter(|| black_box(registry.find_for(black_box(path))));
        });
        group.bench_with_input(BenchmarkId::new("parent_dir", size), &via_parent, |b, path| {
            b.iter(|| black_box(registry.find_for(black_box(path))));
        });
    }
    group.finish();
}

fn bench_accepts(c: &mut Criterion) {
    let registry = build_registry(100);
    let matching = PathBuf::from("project/dir50/lib.rs");
    let filtered = PathBuf::from("project/dir50/notes.md");

    c.bench_function("accepts_matching", |b| {
        b.iter(|| black_box(registry.accepts(black_box(&matching), Op::WRITE)));
    });
    c.bench_function("accepts_filtered_by_pattern", |b| {
        b.iter(|| black_box(registry.accepts(black_box(&filtered), Op::WRITE)));
    });
}

criterion_group!(benches, bench_find_for, bench_accepts);
criterion_main!(benches);
