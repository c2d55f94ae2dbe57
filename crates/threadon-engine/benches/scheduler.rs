use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use threadon_engine::{Context, Scheduler, SchedulerConfig, Step};

fn bench_single_shot_routines(c: &mut Criterion) {
    const TASKS: usize = 5_000;
    let mut group = c.benchmark_group("scheduler");
    group.throughput(Throughput::Elements(TASKS as u64));
    group.sample_size(20);

    let config = SchedulerConfig::default().with_queue_capacity(1 << 14);
    let scheduler = Scheduler::new(config);
    scheduler.start().unwrap();
    let completed = Arc::new(AtomicUsize::new(0));

    group.bench_function("spawn_5000_single_shot", |b| {
        b.iter(|| {
            completed.store(0, Ordering::Relaxed);
            for _ in 0..TASKS {
                let completed = completed.clone();
                scheduler
                    .spawn(move |_cx: &mut Context<'_>| {
                        completed.fetch_add(1, Ordering::Relaxed);
                        Step::Complete
                    })
                    .unwrap();
            }
            assert!(scheduler.wait_idle(Duration::from_secs(30)));
        });
    });

    group.finish();
    scheduler.shutdown();
}

criterion_group!(benches, bench_single_shot_routines);
criterion_main!(benches);
