//! Integration tests for the cooperative scheduler

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use threadon_engine::{Context, Scheduler, SchedulerConfig, Step, TaskState, MAX_TIMER_DELAY};

fn test_config() -> SchedulerConfig {
    SchedulerConfig::default()
        .with_queue_capacity(1 << 12)
        .with_poll_interval(Duration::from_micros(20))
}

fn started(config: SchedulerConfig) -> Scheduler {
    let scheduler = Scheduler::new(config);
    scheduler.start().expect("worker thread");
    scheduler
}

fn recorder(log: &Arc<Mutex<Vec<usize>>>, tag: usize) -> impl FnMut(&mut Context<'_>) -> Step {
    let log = log.clone();
    move |_cx: &mut Context<'_>| {
        log.lock().push(tag);
        Step::Complete
    }
}

#[test]
fn test_single_producer_fifo_order() {
    const N: usize = 2_000;
    let scheduler = started(test_config());
    let log = Arc::new(Mutex::new(Vec::with_capacity(N)));

    for i in 1..=N {
        scheduler.spawn(recorder(&log, i)).expect("spawn");
    }

    assert!(scheduler.wait_idle(Duration::from_secs(10)));
    let order = log.lock().clone();
    assert_eq!(order, (1..=N).collect::<Vec<_>>());

    scheduler.shutdown();
}

#[test]
fn test_timer_scenario_shorter_delay_first() {
    let scheduler = started(test_config());
    let log = Arc::new(Mutex::new(Vec::new()));

    scheduler.spawn_after(recorder(&log, 1), Duration::from_millis(50));
    scheduler.spawn_after(recorder(&log, 2), Duration::from_millis(10));

    thread::sleep(Duration::from_millis(60));
    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(*log.lock(), vec![2, 1]);

    scheduler.shutdown();
}

#[test]
fn test_distinct_deadlines_resume_once_in_order() {
    let scheduler = started(test_config());
    let log = Arc::new(Mutex::new(Vec::new()));

    // Deadlines 5ms apart, registered in scrambled order.
    let delays = [35, 5, 50, 20, 10, 45, 25, 15, 40, 30];
    for &ms in &delays {
        scheduler.spawn_after(recorder(&log, ms), Duration::from_millis(ms as u64));
    }

    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    let mut expected = delays.to_vec();
    expected.sort_unstable();
    assert_eq!(*log.lock(), expected);
    assert_eq!(scheduler.stats().timers_fired, delays.len() as u64);

    scheduler.shutdown();
}

#[test]
fn test_sleeping_routine_ticks_until_done() {
    let scheduler = started(test_config());
    let ticks = Arc::new(AtomicUsize::new(0));
    let seen = ticks.clone();
    let begun = Instant::now();

    scheduler
        .spawn(move |cx: &mut Context<'_>| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                return Step::Complete;
            }
            cx.sleep(Duration::from_millis(10));
            Step::Suspended
        })
        .expect("spawn");

    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert!(begun.elapsed() >= Duration::from_millis(20));

    let stats = scheduler.stats();
    assert_eq!(stats.resumes, 3);
    assert_eq!(stats.timers_fired, 2);

    scheduler.shutdown();
}

#[test]
fn test_yielding_routines_interleave() {
    // Both spawned before the worker exists so neither gets a head start.
    let scheduler = Scheduler::new(test_config());
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..2usize {
        let log = log.clone();
        let mut rounds = 0;
        scheduler
            .spawn(move |cx: &mut Context<'_>| {
                log.lock().push(tag);
                rounds += 1;
                if rounds == 3 {
                    return Step::Complete;
                }
                cx.yield_now();
                Step::Suspended
            })
            .expect("spawn");
    }

    scheduler.start().expect("worker thread");
    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(*log.lock(), vec![0, 1, 0, 1, 0, 1]);

    scheduler.shutdown();
}

#[test]
fn test_routine_spawns_children() {
    let scheduler = started(test_config());
    let children = Arc::new(AtomicUsize::new(0));
    let seen = children.clone();

    scheduler
        .spawn(move |cx: &mut Context<'_>| {
            for _ in 0..10 {
                let seen = seen.clone();
                cx.spawn(move |_cx: &mut Context<'_>| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Step::Complete
                });
            }
            Step::Complete
        })
        .expect("spawn");

    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(children.load(Ordering::SeqCst), 10);
    assert_eq!(scheduler.stats().tasks_spawned, 11);

    scheduler.shutdown();
}

#[test]
fn test_spawn_from_several_threads() {
    const PER_THREAD: usize = 500;
    let scheduler = Arc::new(started(test_config()));
    let completed = Arc::new(AtomicUsize::new(0));

    let spawners: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = scheduler.clone();
            let completed = completed.clone();
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    let completed = completed.clone();
                    scheduler
                        .spawn(move |_cx: &mut Context<'_>| {
                            completed.fetch_add(1, Ordering::SeqCst);
                            Step::Complete
                        })
                        .expect("spawn");
                }
            })
        })
        .collect();

    for spawner in spawners {
        spawner.join().unwrap();
    }

    assert!(scheduler.wait_idle(Duration::from_secs(10)));
    assert_eq!(completed.load(Ordering::SeqCst), 4 * PER_THREAD);
    scheduler.shutdown();
}

#[test]
fn test_small_queue_absorbs_burst() {
    const N: usize = 200;
    let config = test_config()
        .with_queue_capacity(8)
        .with_spawn_timeout(Duration::from_secs(5));
    let scheduler = started(config);
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..N {
        let completed = completed.clone();
        scheduler
            .spawn(move |_cx: &mut Context<'_>| {
                completed.fetch_add(1, Ordering::SeqCst);
                Step::Complete
            })
            .expect("spawn waits for room");
    }

    assert!(scheduler.wait_idle(Duration::from_secs(10)));
    assert_eq!(completed.load(Ordering::SeqCst), N);
    scheduler.shutdown();
}

#[test]
fn test_spawn_fails_when_worker_not_draining() {
    let config = test_config()
        .with_queue_capacity(4)
        .with_spawn_timeout(Duration::from_millis(10));
    let scheduler = Scheduler::new(config);

    for _ in 0..3 {
        scheduler
            .spawn(|_cx: &mut Context<'_>| Step::Complete)
            .expect("room for three");
    }
    let err = scheduler
        .spawn(|_cx: &mut Context<'_>| Step::Complete)
        .unwrap_err();
    assert!(err.to_string().contains("ready queue full"));
    assert_eq!(scheduler.task_count(), 3);
}

#[test]
fn test_unarmed_suspension_is_never_resumed() {
    let scheduler = started(test_config());
    let resumes = Arc::new(AtomicUsize::new(0));
    let seen = resumes.clone();

    let id = scheduler
        .spawn(move |_cx: &mut Context<'_>| {
            seen.fetch_add(1, Ordering::SeqCst);
            Step::Suspended
        })
        .expect("spawn");

    assert!(!scheduler.wait_idle(Duration::from_millis(50)));
    assert_eq!(resumes.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.task_state(id), Some(TaskState::Suspended));

    scheduler.shutdown();
    assert_eq!(scheduler.task_state(id), None);
}

#[test]
fn test_shutdown_with_busy_queue_and_timers() {
    let scheduler = started(test_config());

    for _ in 0..16 {
        scheduler
            .spawn(|cx: &mut Context<'_>| {
                cx.yield_now();
                Step::Suspended
            })
            .expect("spawn");
    }
    for _ in 0..16 {
        scheduler.spawn_after(
            |cx: &mut Context<'_>| {
                cx.sleep(Duration::from_millis(1));
                Step::Suspended
            },
            Duration::from_millis(1),
        );
    }
    scheduler.spawn_after(|_cx: &mut Context<'_>| Step::Complete, Duration::from_secs(3600));

    thread::sleep(Duration::from_millis(20));

    let begun = Instant::now();
    scheduler.stop();
    scheduler.join();
    assert!(begun.elapsed() < Duration::from_secs(5));

    scheduler.shutdown();
    let stats = scheduler.stats();
    assert_eq!(stats.live_tasks, 0);
    assert_eq!(stats.pending_timers, 0);
}

#[test]
fn test_context_reports_own_id() {
    let scheduler = started(test_config());
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();

    let id = scheduler
        .spawn(move |cx: &mut Context<'_>| {
            *slot.lock() = Some(cx.task_id());
            Step::Complete
        })
        .expect("spawn");

    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(*seen.lock(), Some(id));
    scheduler.shutdown();
}

#[test]
fn test_stop_before_start_lets_join_return() {
    let scheduler = Arc::new(Scheduler::new(test_config()));
    scheduler.stop();
    scheduler.start().expect("start after stop is a no-op");
    assert!(!scheduler.is_running());

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let joiner = {
        let scheduler = scheduler.clone();
        thread::spawn(move || {
            scheduler.join();
            let _ = done_tx.send(());
        })
    };
    assert!(
        done_rx.recv_timeout(Duration::from_millis(500)).is_ok(),
        "join blocked after stop then start"
    );
    joiner.join().unwrap();
}

#[test]
fn test_maximum_delays_do_not_overflow() {
    let scheduler = started(test_config());
    let slept = Arc::new(AtomicUsize::new(0));

    let parked = scheduler.spawn_after(|_cx: &mut Context<'_>| Step::Complete, Duration::MAX);
    scheduler
        .schedule_after(parked, Duration::MAX)
        .expect("live task accepts a huge delay");

    let seen = slept.clone();
    scheduler
        .spawn(move |cx: &mut Context<'_>| {
            cx.sleep(Duration::MAX);
            cx.spawn_after(|_cx: &mut Context<'_>| Step::Complete, Duration::MAX);
            seen.fetch_add(1, Ordering::SeqCst);
            Step::Suspended
        })
        .expect("spawn");

    let begun = Instant::now();
    while slept.load(Ordering::SeqCst) == 0 {
        assert!(begun.elapsed() < Duration::from_secs(5), "routine never ran");
        thread::sleep(Duration::from_millis(1));
    }

    let stats = scheduler.stats();
    assert_eq!(stats.live_tasks, 3);
    assert_eq!(stats.pending_timers, 4);
    assert!(MAX_TIMER_DELAY > Duration::from_secs(3600));

    scheduler.shutdown();
    assert_eq!(scheduler.stats().live_tasks, 0);
}
