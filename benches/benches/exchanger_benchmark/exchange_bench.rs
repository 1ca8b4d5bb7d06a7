use std::{hint::black_box, sync::Arc, thread, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use syncra::{CancellationToken, KeyedExchanger, Timeout};

/// Обмен без партнёра с нулевым таймаутом: стоимость захвата замка.
fn bench_exchange_zero_timeout(c: &mut Criterion) {
    let ex = KeyedExchanger::<u64, u64>::new();
    let cancel = CancellationToken::new();
    c.bench_function("exchange_zero_timeout", |b| {
        b.iter(|| black_box(ex.exchange(black_box(7), 1, Duration::ZERO, &cancel)))
    });
}

/// Полный обмен между двумя потоками: поток-партнёр отвечает на каждый
/// обмен по тому же ключу.
fn bench_exchange_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_pair");
    for rounds in [1u64, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(rounds), &rounds, |b, &rounds| {
            b.iter(|| {
                let ex = Arc::new(KeyedExchanger::<u64, u64>::new());
                let partner = {
                    let ex = ex.clone();
                    thread::spawn(move || {
                        let cancel = CancellationToken::new();
                        for i in 0..rounds {
                            let _ = ex.exchange(i, i, Timeout::Infinite, &cancel);
                        }
                    })
                };
                let cancel = CancellationToken::new();
                for i in 0..rounds {
                    black_box(ex.exchange(i, i + 1, Timeout::Infinite, &cancel).ok());
                }
                let _ = partner.join();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exchange_zero_timeout, bench_exchange_pair);
criterion_main!(benches);
