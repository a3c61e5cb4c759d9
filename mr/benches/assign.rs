use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use mr::{create_map_tasks, create_reduce_tasks, Coordinator, Phase, TaskType};

// Hands out and completes every task of a job from a single thread.
fn run_job(files: &[String], n_reduce: usize) {
    let c = Coordinator::from_parts(
        create_map_tasks(files),
        create_reduce_tasks(n_reduce),
        n_reduce,
        Phase::Map,
    )
    .unwrap();
    loop {
        let reply = c.request_task().unwrap();
        match reply.task_type {
            TaskType::Map | TaskType::Reduce => {
                c.report_task(reply.task_type, reply.task_id).unwrap();
            }
            TaskType::Wait => unreachable!("every task is reported before asking again"),
            TaskType::Shutdown => break,
        }
    }
}

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("full job");
    for n in [100usize, 1_000, 10_000] {
        let files: Vec<String> = (0..n).map(|i| format!("pg-{}.txt", i)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &files, |b, files| {
            b.iter(|| run_job(files, 10));
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_assign,
);
criterion_main!(benches);
