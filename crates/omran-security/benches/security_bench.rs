// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for integrity hashing, envelope validation, and
// atomic backup writes in the omran-security crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::Value;

use omran_security::backup::{canonical_json, validate_envelope};
use omran_security::{BackupWriter, FingerprintGenerator, hash_bytes};

/// Build a valid envelope holding `rows` sales records.
fn envelope(rows: usize) -> String {
    let sales: Vec<Value> = (0..rows)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "customer": format!("customer-{i}"),
                "total": i as f64 * 12.5,
                "items": [{ "sku": "A-100", "qty": 2 }],
            })
        })
        .collect();
    let data = serde_json::json!({ "sales": sales });
    let checksum = hash_bytes(canonical_json(&data).expect("serialize").as_bytes());
    serde_json::json!({ "metadata": { "checksum": checksum }, "data": data }).to_string()
}

/// SHA-256 at sizes from a small settings export to a large ledger.
fn bench_integrity_hash(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[
        ("1 KiB", 1024),
        ("100 KiB", 100 * 1024),
        ("1 MiB", 1024 * 1024),
    ];

    let mut group = c.benchmark_group("integrity_hash_sha256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| black_box(hash_bytes(black_box(&data))));
        });
    }
    group.finish();
}

/// Parse, canonicalise, and checksum an envelope without touching disk.
fn bench_validate_envelope(c: &mut Criterion) {
    let input = envelope(5_000);
    c.bench_function("validate_envelope (5k rows)", |b| {
        b.iter(|| validate_envelope(black_box(&input)).expect("valid envelope"));
    });
}

/// Full write path: validation plus temp file, fsync, and rename.
fn bench_backup_write(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let writer = BackupWriter::new(dir.path().join("OmranBackups"), Vec::new());
    let input = envelope(500);

    c.bench_function("backup_write (500 rows)", |b| {
        b.iter(|| writer.write("bench", black_box(&input), None).expect("write failed"));
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let generator = FingerprintGenerator::new();
    c.bench_function("machine_fingerprint", |b| {
        b.iter(|| black_box(generator.compute()));
    });
}

criterion_group!(
    benches,
    bench_integrity_hash,
    bench_validate_envelope,
    bench_backup_write,
    bench_fingerprint,
);
criterion_main!(benches);
