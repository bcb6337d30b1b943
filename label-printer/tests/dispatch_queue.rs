use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use label_printer::{
    BackoffPolicy, InventoryItem, LabelGeometry, LabelImage, LabelService, LayoutEngine,
    LayoutOptions, PrintDispatchQueue, PrintError, PrintJob, PrintResult, PrinterAdapter,
    QueueConfig, QueueError, SubmitError, SubmitLimits, Variant,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Ok,
    Transient,
    Fatal,
}

/// Adapter that follows a script of outcomes, then succeeds (or keeps
/// repeating `fallback`). Jobs are identified by their image width.
struct ScriptedAdapter {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    delay: Duration,
    attempts: Mutex<Vec<u32>>,
    printed: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAdapter {
    fn new(script: &[Outcome], fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            delay: Duration::ZERO,
            attempts: Mutex::new(Vec::new()),
            printed: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Outcome::Ok,
            delay,
            attempts: Mutex::new(Vec::new()),
            printed: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    fn printed(&self) -> Vec<u32> {
        self.printed.lock().clone()
    }
}

#[async_trait]
impl PrinterAdapter for ScriptedAdapter {
    async fn print(&self, image: &LabelImage) -> PrintResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.attempts.lock().push(image.width());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let outcome = self.script.lock().pop_front().unwrap_or(self.fallback);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Outcome::Ok => {
                self.printed.lock().push(image.width());
                Ok(())
            }
            Outcome::Transient => Err(PrintError::Offline("paper out".into())),
            Outcome::Fatal => Err(PrintError::Rejected("bad format".into())),
        }
    }
}

fn fast_config(threshold: u32) -> QueueConfig {
    QueueConfig {
        failure_threshold: threshold,
        backoff: BackoffPolicy::fixed(Duration::from_millis(1)),
    }
}

fn job(tag: u32) -> PrintJob {
    PrintJob::new(Arc::new(LabelImage::blank(tag, 1)))
}

async fn idle(queue: &PrintDispatchQueue) {
    tokio::time::timeout(Duration::from_secs(10), queue.wait_idle())
        .await
        .expect("queue did not go idle");
}

#[tokio::test]
async fn test_fifo_order() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    for tag in [1, 2, 3] {
        queue.enqueue(job(tag)).unwrap();
    }
    idle(&queue).await;

    assert_eq!(adapter.printed(), vec![1, 2, 3]);
    let stats = queue.stats();
    assert_eq!(stats.printed, 3);
    assert_eq!(stats.pending, 0);
    assert!(!stats.worker_active);
}

#[tokio::test]
async fn test_transient_failure_retries_head_in_place() {
    let adapter = ScriptedAdapter::new(&[Outcome::Transient, Outcome::Transient], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.enqueue(job(1)).unwrap();
    queue.enqueue(job(2)).unwrap();
    idle(&queue).await;

    assert_eq!(*adapter.attempts.lock(), vec![1, 1, 1, 2]);
    assert_eq!(adapter.printed(), vec![1, 2]);
}

#[tokio::test]
async fn test_always_transient_clears_queue() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Transient);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    for tag in [1, 2, 3] {
        queue.enqueue(job(tag)).unwrap();
    }
    idle(&queue).await;

    // threshold exceeded on the 11th consecutive failure
    assert_eq!(adapter.attempts(), 11);
    let stats = queue.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.exhaustions, 1);
    assert_eq!(stats.dropped_exhausted, 3);
    assert!(adapter.printed().is_empty());

    // nothing more happens until a new enqueue
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(adapter.attempts(), 11);
}

#[tokio::test]
async fn test_counter_resets_after_success() {
    // 8 failures, a success, 8 failures, a success: never more than 8 in a row
    let mut script = vec![Outcome::Transient; 8];
    script.push(Outcome::Ok);
    script.extend(vec![Outcome::Transient; 8]);
    let adapter = ScriptedAdapter::new(&script, Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.enqueue(job(1)).unwrap();
    queue.enqueue(job(2)).unwrap();
    idle(&queue).await;

    assert_eq!(adapter.printed(), vec![1, 2]);
    assert_eq!(queue.stats().exhaustions, 0);
}

#[tokio::test]
async fn test_fatal_drops_only_that_job() {
    let adapter = ScriptedAdapter::new(&[Outcome::Fatal], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.enqueue(job(1)).unwrap();
    queue.enqueue(job(2)).unwrap();
    queue.enqueue(job(3)).unwrap();
    idle(&queue).await;

    assert_eq!(adapter.attempts(), 3);
    assert_eq!(adapter.printed(), vec![2, 3]);
    let stats = queue.stats();
    assert_eq!(stats.dropped_fatal, 1);
    assert_eq!(stats.exhaustions, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueue_single_worker() {
    let adapter = ScriptedAdapter::slow(Duration::from_millis(1));
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    let tasks: Vec<_> = (1..=40u32)
        .map(|tag| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(job(tag)).unwrap() })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    idle(&queue).await;

    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 1);
    let mut printed = adapter.printed();
    assert_eq!(adapter.attempts(), 40);
    printed.sort_unstable();
    assert_eq!(printed, (1..=40).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_worker_respawns_after_idle() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.enqueue(job(1)).unwrap();
    idle(&queue).await;
    queue.enqueue(job(2)).unwrap();
    idle(&queue).await;

    assert_eq!(adapter.printed(), vec![1, 2]);
    assert_eq!(queue.stats().workers_spawned, 2);
}

#[tokio::test]
async fn test_job_ids_are_sequential() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter, fast_config(10)).unwrap();

    let ids: Vec<u64> = (1..=3).map(|t| queue.enqueue(job(t)).unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    idle(&queue).await;
}

#[tokio::test]
async fn test_enqueue_after_shutdown_rejected() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.shutdown().await;
    assert!(matches!(queue.enqueue(job(1)), Err(QueueError::ShutDown)));
    assert_eq!(adapter.attempts(), 0);
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Transient);
    let config = QueueConfig {
        failure_threshold: 10,
        backoff: BackoffPolicy::fixed(Duration::from_secs(30)),
    };
    let queue = PrintDispatchQueue::new(adapter.clone(), config).unwrap();
    queue.enqueue(job(1)).unwrap();

    while adapter.attempts() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    tokio::time::timeout(Duration::from_secs(5), queue.shutdown())
        .await
        .expect("shutdown waited for the backoff");

    let stats = queue.stats();
    assert_eq!(stats.pending, 1);
    assert!(!stats.worker_active);
    assert_eq!(adapter.attempts(), 1);
}

fn service(adapter: Arc<ScriptedAdapter>) -> LabelService {
    let engine = LayoutEngine::new(LabelGeometry::default(), LayoutOptions::default()).unwrap();
    let queue = PrintDispatchQueue::new(adapter, fast_config(10)).unwrap();
    LabelService::new(Arc::new(engine), queue, SubmitLimits::default())
}

#[tokio::test]
async fn test_copies_with_transient_failures() {
    let adapter = ScriptedAdapter::new(&[Outcome::Transient, Outcome::Transient], Outcome::Ok);
    let svc = service(adapter.clone());

    let item = InventoryItem::new("A6500-01", "Sony A6500");
    let submission = svc.submit(&item, Variant::Barcode, 3).unwrap();
    assert_eq!(submission.copies(), 3);
    svc.wait_idle().await;

    assert_eq!(adapter.printed().len(), 3);
    assert_eq!(adapter.attempts(), 5);
    let stats = svc.queue_stats();
    assert_eq!(stats.printed, 3);
    assert_eq!(stats.pending, 0);
    assert!(!stats.worker_active);
}

#[tokio::test]
async fn test_too_many_copies_never_reach_queue() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let svc = service(adapter.clone());

    let item = InventoryItem::new("A6500-01", "Sony A6500");
    let err = svc.submit(&item, Variant::Qr, 15).unwrap_err();
    assert!(matches!(
        err,
        SubmitError::CopiesOutOfRange {
            requested: 15,
            max: 9
        }
    ));

    let stats = svc.queue_stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.workers_spawned, 0);
    assert_eq!(adapter.attempts(), 0);
}

/// Adapter that panics on its first call and prints normally afterwards
struct PanicOnceAdapter {
    calls: AtomicUsize,
    printed: Mutex<Vec<u32>>,
}

#[async_trait]
impl PrinterAdapter for PanicOnceAdapter {
    async fn print(&self, image: &LabelImage) -> PrintResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("driver crashed");
        }
        self.printed.lock().push(image.width());
        Ok(())
    }
}

#[tokio::test]
async fn test_adapter_panic_drops_job_and_keeps_draining() {
    let adapter = Arc::new(PanicOnceAdapter {
        calls: AtomicUsize::new(0),
        printed: Mutex::new(Vec::new()),
    });
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.enqueue(job(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.enqueue(job(2)).unwrap();
    idle(&queue).await;

    assert_eq!(*adapter.printed.lock(), vec![2]);
    let stats = queue.stats();
    assert_eq!(stats.pending, 0);
    assert!(!stats.worker_active);
    assert_eq!(stats.dropped_fatal, 1);
    assert_eq!(stats.printed, 1);
}

#[tokio::test]
async fn test_enqueue_all_is_one_batch() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    let ids = queue.enqueue_all([job(1), job(2), job(3)]).unwrap();
    assert_eq!(ids, vec![1, 2, 3]);
    idle(&queue).await;

    assert_eq!(adapter.printed(), vec![1, 2, 3]);
    assert_eq!(queue.stats().workers_spawned, 1);
    assert_eq!(queue.enqueue_all(Vec::new()).unwrap(), Vec::<u64>::new());
}

#[tokio::test]
async fn test_enqueue_all_after_shutdown_queues_nothing() {
    let adapter = ScriptedAdapter::new(&[], Outcome::Ok);
    let queue = PrintDispatchQueue::new(adapter.clone(), fast_config(10)).unwrap();

    queue.shutdown().await;
    let result = queue.enqueue_all([job(1), job(2), job(3)]);
    assert!(matches!(result, Err(QueueError::ShutDown)));
    let stats = queue.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.workers_spawned, 0);
    assert_eq!(adapter.attempts(), 0);
}
