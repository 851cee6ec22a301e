//! Planning throughput under the registry read lock.
//!
//! Measures `Planner::plan` for a single caller, and for several threads
//! planning while the table is being swapped out underneath them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agri_control::registry::TemplateTable;
use agri_control::{ActionTemplateRegistry, Planner};
use agri_core::types::{Action, Task, WAIT_ACTION};
use criterion::{criterion_group, criterion_main, Criterion};

/// A table with `types` task types of six steps each.
fn large_table(types: usize) -> TemplateTable {
    (0..types)
        .map(|i| {
            let actions = vec![
                Action::new("open_valve", "irrigation"),
                Action::new("pump_on", "pump"),
                Action::new(WAIT_ACTION, "system"),
                Action::new("dose", "injector"),
                Action::new("pump_off", "pump"),
                Action::new("close_valve", "irrigation"),
            ];
            (format!("scenario_{i}"), actions)
        })
        .collect()
}

fn sample_task(i: usize) -> Task {
    Task::new(format!("scenario_{}", i % 64), "valve-7")
        .with_task_id(format!("t-{i}"))
        .with_param("duration_min", 15)
        .with_param("zone", "north")
        .with_param("flow_rate", 4.5)
}

fn bench_plan(c: &mut Criterion) {
    let planner = Planner::new(Arc::new(ActionTemplateRegistry::new(large_table(64))));
    let tasks: Vec<Task> = (0..1000).map(sample_task).collect();

    let mut group = c.benchmark_group("plan");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_task", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let actions = planner.plan(&tasks[idx % tasks.len()]);
            idx += 1;
            actions
        });
    });

    group.bench_function("unknown_task_type", |b| {
        let task = Task::new("missing", "valve-7");
        b.iter(|| planner.plan(&task));
    });

    group.finish();
}

fn bench_plan_during_reload(c: &mut Criterion) {
    let registry = Arc::new(ActionTemplateRegistry::new(large_table(64)));
    let planner = Planner::new(Arc::clone(&registry));
    let tasks: Vec<Task> = (0..1000).map(sample_task).collect();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let registry = Arc::clone(&registry);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                registry.replace(large_table(64));
                std::thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let mut group = c.benchmark_group("plan_contended");
    group.measurement_time(Duration::from_secs(5));
    group.bench_function("with_concurrent_replace", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let actions = planner.plan(&tasks[idx % tasks.len()]);
            idx += 1;
            actions
        });
    });
    group.finish();

    stop.store(true, Ordering::Relaxed);
    let _ = writer.join();
}

criterion_group!(benches, bench_plan, bench_plan_during_reload);
criterion_main!(benches);
