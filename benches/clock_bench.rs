use criterion::{criterion_group, criterion_main, Criterion};
use proofsync_core::{DeviceId, VectorClock};

fn clock_with_devices(count: usize) -> VectorClock {
    let mut clock = VectorClock::empty();
    for i in 0..count {
        let device = DeviceId::new(format!("device-{i}")).unwrap();
        clock = clock.increment_for(&device);
    }
    clock
}

fn clock_benchmarks(c: &mut Criterion) {
    for size in [2usize, 16, 64] {
        let left = clock_with_devices(size);
        let right = clock_with_devices(size / 2).increment_for(&DeviceId::new("peer").unwrap());

        c.bench_function(&format!("merge_{size}_devices"), |b| {
            b.iter(|| left.merged_with(&right))
        });

        c.bench_function(&format!("compare_{size}_devices"), |b| {
            b.iter(|| left.is_concurrent_with(&right))
        });
    }
}

criterion_group!(benches, clock_benchmarks);
criterion_main!(benches);
