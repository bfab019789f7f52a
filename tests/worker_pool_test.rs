//! Worker pool admission and drain tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mv_ingest::WorkerPool;
use tokio::sync::{mpsc, oneshot};

/// Tracks how many task bodies are inside their critical section.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Submit `n` tasks that each report a gate and wait for it to open.
fn submit_gated(
    pool: &WorkerPool,
    n: usize,
    gauge: &Arc<Gauge>,
) -> mpsc::UnboundedReceiver<oneshot::Sender<()>> {
    let (started_tx, started_rx) = mpsc::unbounded_channel();
    for i in 0..n {
        let gauge = Arc::clone(gauge);
        let started_tx = started_tx.clone();
        pool.submit(format!("gated-{i}"), async move {
            gauge.enter();
            let (gate_tx, gate_rx) = oneshot::channel::<()>();
            let _ = started_tx.send(gate_tx);
            let _ = gate_rx.await;
            gauge.leave();
        })
        .unwrap();
    }
    started_rx
}

async fn next_start(rx: &mut mpsc::UnboundedReceiver<oneshot::Sender<()>>) -> oneshot::Sender<()> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("a task should have started")
        .expect("channel open")
}

async fn assert_no_start(rx: &mut mpsc::UnboundedReceiver<oneshot::Sender<()>>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "no slot should be free");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_gated_jobs_never_exceed_two_slots() {
    let pool = WorkerPool::new(2);
    let gauge = Arc::new(Gauge::default());
    let mut started = submit_gated(&pool, 10, &gauge);

    let mut open = vec![next_start(&mut started).await, next_start(&mut started).await];
    assert_no_start(&mut started).await;
    assert_eq!(pool.active_count(), 2);
    assert_eq!(pool.queued_count(), 8);

    // Each release admits exactly one waiting job.
    for remaining in (0..8).rev() {
        let gate = open.remove(0);
        gate.send(()).unwrap();
        open.push(next_start(&mut started).await);
        assert_no_start(&mut started).await;
        assert!(gauge.current.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.queued_count(), remaining);
    }

    for gate in open {
        gate.send(()).unwrap();
    }
    pool.stop().await;

    assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    assert_eq!(pool.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stop_waits_for_running_and_queued_tasks() {
    let pool = WorkerPool::new(3);
    let finished = Arc::new(AtomicUsize::new(0));

    for i in 0..12 {
        let finished = Arc::clone(&finished);
        pool.submit(format!("work-{i}"), async move {
            tokio::time::sleep(Duration::from_millis(10 * (i % 4) as u64)).await;
            finished.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.stop().await;

    assert_eq!(finished.load(Ordering::SeqCst), 12);
    assert_eq!(pool.pending_count(), 0);
    assert!(pool.submit("late", async {}).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_from_another_task_blocks_until_gate_opens() {
    let pool = WorkerPool::new(1);
    let gauge = Arc::new(Gauge::default());
    let mut started = submit_gated(&pool, 1, &gauge);
    let gate = next_start(&mut started).await;

    let stopper = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.stop().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopper.is_finished(), "stop must wait for the running task");

    gate.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), stopper)
        .await
        .expect("stop should return once drained")
        .unwrap();
    assert_eq!(pool.active_count(), 0);
}
