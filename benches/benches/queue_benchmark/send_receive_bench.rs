use std::{hint::black_box, sync::Arc, thread, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use syncra::{CancellationToken, MessageQueue, Timeout};

fn bench_send_then_receive(c: &mut Criterion) {
    let queue = MessageQueue::<u64>::new();
    let cancel = CancellationToken::new();
    c.bench_function("queue_send_then_receive", |b| {
        b.iter(|| {
            let _handle = queue.send(black_box(1));
            black_box(queue.receive(Duration::ZERO, &cancel).ok());
        })
    });
}

fn bench_try_cancel(c: &mut Criterion) {
    let queue = MessageQueue::<u64>::new();
    c.bench_function("queue_send_try_cancel", |b| {
        b.iter(|| {
            let handle = queue.send(black_box(1));
            black_box(handle.try_cancel())
        })
    });
}

/// Один производитель и один потребитель, потребитель блокируется в
/// `receive`.
fn bench_producer_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_producer_consumer");
    for count in [64u64, 1024] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let queue = Arc::new(MessageQueue::<u64>::new());
                let consumer = {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        let cancel = CancellationToken::new();
                        let mut sum = 0;
                        for _ in 0..count {
                            if let Ok(Some(v)) = queue.receive(Timeout::Infinite, &cancel) {
                                sum += v;
                            }
                        }
                        sum
                    })
                };
                for i in 0..count {
                    let _ = queue.send(i);
                }
                black_box(consumer.join().ok());
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_send_then_receive,
    bench_try_cancel,
    bench_producer_consumer
);
criterion_main!(benches);
