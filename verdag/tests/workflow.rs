//! End-to-end composition, wiring, and versioned re-run behavior.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use verdag::prelude::*;
use verdag::testing::CountingTask;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Assembled {
    dag: Dag,
    upstream: Arc<Unit>,
    downstream: Arc<Unit>,
    upstream_probe: CountingTask,
    downstream_probe: CountingTask,
}

/// Unit `a` (three parallel tasks), unit `b` (two sequential tasks)
/// depending on `a`, assembled into one dag.
fn assemble(registry: &Arc<dyn Registry>, a_version: &str, b_version: &str) -> Assembled {
    let upstream_probe = CountingTask::new();
    let a1 = TaskNode::new("a1", upstream_probe.clone());
    let a2 = TaskNode::new("a2", upstream_probe.clone());
    let a3 = TaskNode::new("a3", upstream_probe.clone());
    let upstream = Unit::new(
        "a",
        a_version,
        &[],
        TaskGraph::parallel([a1, a2, a3]),
        Arc::clone(registry),
    )
    .unwrap();

    let downstream_probe = CountingTask::new();
    let b1 = TaskNode::new("b1", downstream_probe.clone());
    let b2 = TaskNode::new("b2", downstream_probe.clone());
    let downstream = Unit::new(
        "b",
        b_version,
        &[upstream.clone()],
        TaskGraph::sequential([b1, b2]),
        Arc::clone(registry),
    )
    .unwrap();

    let mut dag = Dag::new("pipeline");
    upstream.insert_into(&mut dag);
    downstream.insert_into(&mut dag);

    Assembled {
        dag,
        upstream,
        downstream,
        upstream_probe,
        downstream_probe,
    }
}

#[test]
fn terminal_of_dependency_precedes_every_entry_of_dependent() {
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
    let assembled = assemble(&registry, "1", "1");

    let terminal = assembled.upstream.terminal_task();
    assert_eq!(terminal.name(), "update-a-version");

    for entry in assembled.downstream.tasks().first.iter() {
        assert!(terminal.successors().contains(&entry.id()));
        assert!(entry.predecessors().contains(&terminal.id()));
    }
    // b has a single entry task; the barrier is exactly one edge wide.
    assert_eq!(assembled.downstream.tasks().first.len(), 1);
}

#[tokio::test]
async fn first_run_executes_and_records_both_units() {
    init_tracing();
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
    let assembled = assemble(&registry, "1", "1");

    // 3 tasks + join for a, 2 tasks for b.
    assert_eq!(assembled.dag.len(), 6);

    let report = LocalExecutor::new().run(&assembled.dag).await.unwrap();
    assert!(report.success);
    assert_eq!(report.count(TaskStatus::Ok), 6);
    assert_eq!(assembled.upstream_probe.runs(), 3);
    assert_eq!(assembled.downstream_probe.runs(), 2);

    let a_records = registry.find("a").await.unwrap();
    let b_records = registry.find("b").await.unwrap();
    assert_eq!(a_records.len(), 1);
    assert_eq!(b_records.len(), 1);
    assert_eq!(b_records[0].dependencies, vec![a_records[0].id]);
}

#[tokio::test]
async fn second_run_skips_every_task_in_both_units() {
    init_tracing();
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
    let assembled = assemble(&registry, "1", "1");
    let executor = LocalExecutor::new();

    let first = executor.run(&assembled.dag).await.unwrap();
    assert!(first.success);

    let second = executor.run(&assembled.dag).await.unwrap();
    assert!(second.success);
    assert_eq!(second.count(TaskStatus::Skip), 6);
    assert_eq!(second.count(TaskStatus::Ok), 0);

    // Bodies did not run again.
    assert_eq!(assembled.upstream_probe.runs(), 3);
    assert_eq!(assembled.downstream_probe.runs(), 2);
}

#[tokio::test]
async fn resubmitted_pipeline_skips_against_prior_records() {
    init_tracing();
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());

    let first = assemble(&registry, "1", "1");
    LocalExecutor::new().run(&first.dag).await.unwrap();

    // Fresh task nodes, same names and versions: a new submission of
    // the same pipeline definition.
    let second = assemble(&registry, "1", "1");
    let report = LocalExecutor::new().run(&second.dag).await.unwrap();

    assert!(report.success);
    assert_eq!(report.count(TaskStatus::Skip), 6);
    assert_eq!(second.upstream_probe.runs(), 0);
    assert_eq!(second.downstream_probe.runs(), 0);
}

#[tokio::test]
async fn version_bump_reruns_only_the_bumped_unit() {
    init_tracing();
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());

    let first = assemble(&registry, "1", "1");
    LocalExecutor::new().run(&first.dag).await.unwrap();

    let second = assemble(&registry, "1", "2");
    let report = LocalExecutor::new().run(&second.dag).await.unwrap();

    assert!(report.success);
    // a's four tasks skip, b's two run.
    assert_eq!(report.count(TaskStatus::Skip), 4);
    assert_eq!(report.count(TaskStatus::Ok), 2);
    assert_eq!(second.upstream_probe.runs(), 0);
    assert_eq!(second.downstream_probe.runs(), 2);

    // The stale b record was replaced and relinked.
    let b_records = registry.find("b").await.unwrap();
    assert_eq!(b_records.len(), 1);
    assert_eq!(b_records[0].version, "2");
    let a_records = registry.find("a").await.unwrap();
    assert_eq!(b_records[0].dependencies, vec![a_records[0].id]);
}
