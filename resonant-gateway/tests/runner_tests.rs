use resonant_gateway::TaskRunner;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn run_delivers_output_to_callback() {
    let runner = TaskRunner::new("test-runner").unwrap();
    let (tx, rx) = mpsc::channel();

    runner.run(async { 41 + 1 }, move |value| {
        tx.send(value).unwrap();
    });

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
}

#[test]
fn spawn_executes_detached_work() {
    let runner = TaskRunner::new("test-runner").unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let task_flag = flag.clone();
    let (tx, rx) = mpsc::channel();

    runner.spawn(async move {
        task_flag.store(true, Ordering::SeqCst);
        tx.send(()).unwrap();
    });

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(flag.load(Ordering::SeqCst));
}

#[test]
fn block_on_returns_the_value() {
    let runner = TaskRunner::new("test-runner").unwrap();
    let value = runner.block_on(async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        "done"
    });
    assert_eq!(value, "done");
}

#[test]
fn callbacks_from_concurrent_tasks_all_arrive() {
    let runner = TaskRunner::new("test-runner").unwrap();
    let (tx, rx) = mpsc::channel();

    for i in 0..8 {
        let tx = tx.clone();
        runner.run(async move { i }, move |value| {
            tx.send(value).unwrap();
        });
    }
    drop(tx);

    let mut received: Vec<i32> = rx.iter().collect();
    received.sort_unstable();
    assert_eq!(received, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn dropping_runner_inside_async_context_is_safe() {
    // shutdown is non-blocking, so tearing the SDK down from a host's
    // async task must not panic
    let runner = TaskRunner::new("test-runner").unwrap();
    runner.spawn(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    drop(runner);
}
