//! # Bootstrap Protocol Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Canonical message build | < 1μs |
//! | HMAC sign / verify | < 10μs |
//! | Nonce issue + consume | < 10μs |

use std::time::Duration;

use bootstrap_core::{MacCodec, NonceStore, RegistrationFields, SharedSecret};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_mac(c: &mut Criterion) {
    let mut group = c.benchmark_group("mac");
    let codec = MacCodec::new(SharedSecret::new("bench_shared_secret").unwrap());
    let fields = RegistrationFields::new("a".repeat(64), "alice", "S3cret!", true);
    let message = codec.build_message(&fields);
    let digest = codec.sign(&message);

    group.bench_function("build_message", |b| {
        b.iter(|| black_box(codec.build_message(black_box(&fields))))
    });
    group.bench_function("sign", |b| b.iter(|| black_box(codec.sign(black_box(&message)))));
    group.bench_function("verify", |b| {
        b.iter(|| black_box(codec.verify(black_box(&message), black_box(&digest))))
    });

    for password_len in [8usize, 128, 512] {
        let fields = RegistrationFields::new("n", "alice", "x".repeat(password_len), true);
        group.throughput(Throughput::Bytes(password_len as u64));
        group.bench_with_input(
            BenchmarkId::new("sign_fields", password_len),
            &fields,
            |b, fields| b.iter(|| black_box(codec.sign_fields(fields))),
        );
    }

    group.finish();
}

fn bench_nonce_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("nonce_store");
    group.measurement_time(Duration::from_secs(5));

    // Short TTL keeps consumed tombstones from piling up across iterations
    let store = NonceStore::new(Duration::from_millis(50))
        .unwrap()
        .with_capacity(1 << 20);
    group.bench_function("issue_consume", |b| {
        b.iter(|| {
            if let Ok(token) = store.issue() {
                black_box(store.consume(token.as_str())).ok();
            }
        })
    });

    group.bench_function("consume_unknown", |b| {
        b.iter(|| black_box(store.consume(black_box("0000"))))
    });

    group.finish();
}

criterion_group!(benches, bench_mac, bench_nonce_store);
criterion_main!(benches);
