use std::{
    hint::black_box,
    time::{Duration, Instant},
};

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanout::{Dispatcher, Envelope, Subscriber, SubscriberRegistry};
use tokio::runtime::Runtime;

fn bench_register_deregister(c: &mut Criterion) {
    let registry = SubscriberRegistry::<Envelope>::new();
    let (sub, _rx) = Subscriber::new(["block", "tx", "vote"], 16);

    c.bench_function("registry_register_deregister", |b| {
        b.iter(|| {
            registry.register([&sub]);
            registry.deregister([black_box(&sub)]);
        })
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");

    for subs in [0usize, 1, 10, 100] {
        let registry = SubscriberRegistry::<Envelope>::new();
        // Держим приёмники живыми на время замера.
        let handles: Vec<_> = (0..subs).map(|_| Subscriber::new(["tx"], 16)).collect();
        registry.register(handles.iter().map(|(sub, _)| sub));

        group.bench_with_input(BenchmarkId::from_parameter(subs), &subs, |b, _| {
            b.iter(|| black_box(registry.lookup_subscribers(black_box("tx"))))
        });
    }

    group.finish();
}

/// Постановка в очередь и получение каждым подписчиком.
fn bench_dispatch_end_to_end(c: &mut Criterion) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => panic!("failed to build tokio runtime: {e}"),
    };
    let mut group = c.benchmark_group("dispatch_end_to_end");
    group.throughput(Throughput::Elements(1));

    for subs in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(subs), &subs, |b, &subs| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let dispatcher = Dispatcher::with_capacity(1024);
                let mut receivers = Vec::with_capacity(subs);
                for _ in 0..subs {
                    let (sub, rx) = Subscriber::new(["tx"], 1024);
                    dispatcher.register([&sub]);
                    receivers.push(rx);
                }
                dispatcher.start().unwrap();

                let payload = Bytes::from_static(b"payload");
                let start = Instant::now();
                for _ in 0..iters {
                    dispatcher
                        .put_message(Envelope::new("tx", payload.clone()))
                        .await
                        .unwrap();
                    for rx in receivers.iter_mut() {
                        black_box(rx.recv().await.unwrap());
                    }
                }
                let elapsed = start.elapsed();

                dispatcher.stop().unwrap();
                dispatcher.wait_stopped().await;
                elapsed
            })
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_register_deregister, bench_lookup, bench_dispatch_end_to_end
}
criterion_main!(benches);
