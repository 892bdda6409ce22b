//! Performance benchmarks for symdb
//!
//! **Benchmarks Included:**
//! - `symbol_lookup`: lookup by name at 100, 1000, and 10000 stored symbols
//! - `database_insert_batch`: symbol insertion throughput per batch size
//! - `reindex_file`: one full delete-and-record pass over a file
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                                    # Run all benchmarks
//! cargo bench -- symbol_lookup                   # Lookup only
//! cargo bench -- --baseline baseline_name        # Compare to baseline
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symdb::indexer::reindex_file;
use symdb::storage::{add_symbols_batch, find_symbols_by_name, Database, OpenOptions, Symbol};
use tempfile::TempDir;

/// Create a file-backed database for benchmarking.
fn create_benchmark_db() -> (TempDir, Database) {
    let tmpdir = TempDir::new().expect("failed to create temp dir");
    let db_path = tmpdir.path().join("bench.db");
    let db = Database::open(&db_path, OpenOptions::default()).expect("failed to open database");
    (tmpdir, db)
}

/// Generate `count` symbols spread over 50 files.
fn generate_symbols(count: usize) -> Vec<Symbol> {
    (0..count)
        .map(|i| {
            let line = u32::try_from(i / 50 + 1).unwrap_or(u32::MAX);
            let symbol = Symbol::new(
                format!("c:@F@func_{i}"),
                8,
                format!("func_{}", i % 100),
                format!("src/file_{}.c", i % 50),
                line,
                1,
            )
            .with_type("int (int)");
            if i % 3 == 0 {
                symbol.definition()
            } else {
                symbol
            }
        })
        .collect()
}

/// Benchmark: name lookup at various table sizes.
fn bench_symbol_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_lookup");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    for count in &[100usize, 1000, 10000] {
        let (_tmpdir, db) = create_benchmark_db();
        add_symbols_batch(&db, &generate_symbols(*count)).expect("batch insert failed");

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                let found = find_symbols_by_name(&db, black_box("func_42")).expect("lookup failed");
                black_box(found);
            });
        });
    }

    group.finish();
}

/// Benchmark: batch insertion throughput.
fn bench_database_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("database_insert_batch");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    for batch_size in &[10usize, 100, 500] {
        let symbols = generate_symbols(*batch_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &symbols,
            |b, symbols| {
                b.iter_batched(
                    create_benchmark_db,
                    |(_tmpdir, db)| {
                        let ids = add_symbols_batch(&db, symbols).expect("batch insert failed");
                        black_box(ids);
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark: re-indexing one file that already has symbols stored.
fn bench_reindex(c: &mut Criterion) {
    let mut group = c.benchmark_group("reindex_file");
    group.sample_size(10);

    let (_tmpdir, db) = create_benchmark_db();
    let symbols: Vec<Symbol> = generate_symbols(5000)
        .into_iter()
        .filter(|s| s.file == "src/file_0.c")
        .collect();
    add_symbols_batch(&db, &symbols).expect("batch insert failed");

    group.bench_function("file_with_100_symbols", |b| {
        b.iter(|| {
            let stats = reindex_file(&db, "src/file_0.c", |emit| {
                symbols.iter().try_for_each(|symbol| emit(symbol))
            })
            .expect("reindex failed");
            black_box(stats);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_symbol_lookup,
    bench_database_insert,
    bench_reindex,
);

criterion_main!(benches);
