use core::hint::black_box;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use multiotp_qr_core::DirectoryDiff;
use std::fs;
use tempfile::TempDir;

/// Builds `users` enrollment records of which every other one already has a
/// QR image.
fn fixture(users: usize) -> (TempDir, TempDir) {
    let enrollment = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    for i in 0..users {
        fs::write(enrollment.path().join(format!("user_{i}.db")), b"").unwrap();
        if i % 2 == 0 {
            fs::write(artifacts.path().join(format!("user_{i}.png")), b"").unwrap();
        }
    }
    (enrollment, artifacts)
}

fn bench_pending(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_diff");

    for users in [100, 1_000, 10_000] {
        let (enrollment, artifacts) = fixture(users);
        let diff = DirectoryDiff::new(enrollment.path(), artifacts.path());

        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::new("pending", users), &diff, |b, diff| {
            b.iter(|| {
                let pending = diff.pending().unwrap().count();
                black_box(pending)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pending);
criterion_main!(benches);
