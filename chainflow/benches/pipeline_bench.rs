//! Benchmarks for pipeline execution.

use chainflow::prelude::*;
use chainflow::stages::IdentityStage;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;

fn identity_chain(len: usize) -> Pipeline {
    let stages: Vec<Arc<dyn Stage>> = (0..len)
        .map(|_| Arc::new(IdentityStage::new("id")) as Arc<dyn Stage>)
        .collect();
    Pipeline::from_stages(stages)
}

fn sync_chain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_chain");
    for len in [10, 1_000, 10_000] {
        let pipeline = identity_chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &pipeline, |b, p| {
            b.iter(|| wait_for_result(&p.call(black_box(json!(1))), None));
        });
    }
    group.finish();
}

fn resolved_deferred_benchmark(c: &mut Criterion) {
    let pipeline = Pipeline::builder("resolved")
        .stage_fn("a", |v| Ok(Deferred::success(v)))
        .stage_fn("b", |v| Ok(Deferred::success(v)))
        .stage_fn("c", |v| Ok(Deferred::success(v)))
        .build()
        .unwrap();

    c.bench_function("resolved_deferred", |b| {
        b.iter(|| wait_for_result(&pipeline.call(black_box(json!({"k": 1}))), None));
    });
}

fn restart_loop_benchmark(c: &mut Criterion) {
    let pipeline = Pipeline::builder("forever")
        .stage_fn("fail", |_v| -> Result<Value, FlowError> { Err(FlowError::stage("nope")) })
        .error_handler(|_| Some(restart(None)))
        .config(FlowConfig::new().with_log_unhandled_errors(false))
        .build()
        .unwrap();

    c.bench_function("restart_until_loop_detected", |b| {
        b.iter(|| wait_for_result(&pipeline.call(black_box(json!(0))), None).is_err());
    });
}

criterion_group!(
    benches,
    sync_chain_benchmark,
    resolved_deferred_benchmark,
    restart_loop_benchmark
);
criterion_main!(benches);
