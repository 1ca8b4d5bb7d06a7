use std::{
    hint::black_box,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use criterion::{criterion_group, criterion_main, Criterion};
use syncra::{CancellationToken, EventBus};

fn bench_publish_no_handler(c: &mut Criterion) {
    let bus = EventBus::new(1024).unwrap();
    c.bench_function("bus_publish_no_handler", |b| {
        b.iter(|| bus.publish(black_box(1u64)).unwrap())
    });
}

/// Публикация при работающем обработчике. Переполнение очереди
/// приводит к сбросу, поэтому измеряется только сторона издателя.
fn bench_publish_with_handler(c: &mut Criterion) {
    let bus = Arc::new(EventBus::new(4096).unwrap());
    let seen = Arc::new(AtomicU64::new(0));
    let cancel = CancellationToken::new();

    let executor = {
        let (bus, seen, cancel) = (bus.clone(), seen.clone(), cancel.clone());
        thread::spawn(move || {
            let _ = bus.subscribe(
                move |v: u64| {
                    seen.fetch_add(v, Ordering::Relaxed);
                },
                &cancel,
            );
        })
    };
    while !bus.is_subscribed::<u64>() {
        thread::sleep(Duration::from_millis(1));
    }

    c.bench_function("bus_publish_with_handler", |b| {
        b.iter(|| bus.publish(black_box(1u64)).unwrap())
    });

    cancel.cancel();
    let _ = executor.join();
    black_box(seen.load(Ordering::Relaxed));
}

criterion_group!(benches, bench_publish_no_handler, bench_publish_with_handler);
criterion_main!(benches);
