// tests/runtime_fake_backend.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use assetpipe::cli::{TaskCommand, MINIFY_CATEGORIES};
use assetpipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetpipe::types::Category;
use assetpipe_test_utils::fake_backend::FakeBackend;
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn one_shot(behaviour: TriggerWhileRunningBehaviour) -> CoreRuntime {
    CoreRuntime::new(
        behaviour,
        RuntimeOptions {
            exit_when_idle: true,
        },
    )
}

async fn trigger(tx: &mpsc::Sender<RuntimeEvent>, category: Category) -> TestResult {
    tx.send(RuntimeEvent::TaskTriggered {
        category,
        reason: TriggerReason::Manual,
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn minify_runs_each_of_four_tasks_exactly_once() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx.clone(), Arc::clone(&executed));

    for category in TaskCommand::Minify.initial_categories() {
        trigger(&tx, category).await?;
    }

    let runtime = Runtime::new(one_shot(TriggerWhileRunningBehaviour::Queue), rx, backend);
    let report = with_timeout(runtime.run()).await?;

    let mut ran = executed.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, MINIFY_CATEGORIES.to_vec());
    assert_eq!(report.total_runs(), 4);
    for category in MINIFY_CATEGORIES {
        assert_eq!(report.runs(category), 1, "{category}");
    }
    assert_eq!(report.runs(Category::IconFont), 0);
    Ok(())
}

#[tokio::test]
async fn triggers_during_a_run_coalesce_into_one_follow_up() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx.clone(), Arc::clone(&executed))
        .with_delay(Duration::from_millis(100));

    for _ in 0..4 {
        trigger(&tx, Category::Style).await?;
    }

    let runtime = Runtime::new(one_shot(TriggerWhileRunningBehaviour::Queue), rx, backend);
    let report = with_timeout(runtime.run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec![Category::Style, Category::Style]);
    assert_eq!(report.runs(Category::Style), 2);
    Ok(())
}

#[tokio::test]
async fn skip_behaviour_drops_triggers_during_a_run() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx.clone(), Arc::clone(&executed))
        .with_delay(Duration::from_millis(50));

    for _ in 0..3 {
        trigger(&tx, Category::Template).await?;
    }

    let runtime = Runtime::new(one_shot(TriggerWhileRunningBehaviour::Skip), rx, backend);
    let report = with_timeout(runtime.run()).await?;

    assert_eq!(report.runs(Category::Template), 1);
    Ok(())
}

#[tokio::test]
async fn failures_are_reported_without_stopping_other_tasks() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx.clone(), Arc::clone(&executed)).failing(Category::Style);

    for category in MINIFY_CATEGORIES {
        trigger(&tx, category).await?;
    }

    let runtime = Runtime::new(one_shot(TriggerWhileRunningBehaviour::Queue), rx, backend);
    let report = with_timeout(runtime.run()).await?;

    assert_eq!(report.total_runs(), 4);
    assert_eq!(report.failed_categories(), vec![Category::Style]);
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_a_watching_runtime() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx.clone(), Arc::clone(&executed));

    trigger(&tx, Category::Script).await?;
    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
    let handle = tokio::spawn(Runtime::new(core, rx, backend).run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let report = with_timeout(handle).await??;
    assert_eq!(report.runs(Category::Script), 1);
    Ok(())
}
