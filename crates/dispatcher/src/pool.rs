//! WorkerPool - bounded work queue drained by a fixed set of worker threads

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{ContractError, EventKind, EventProcessor, LifecycleEvent};
use tracing::{debug, error, instrument, warn};

use crate::error::DispatcherError;

/// Result reported by a task to its submitter
pub type TaskResult = Result<(), ContractError>;

/// One event bound to a single processor invocation
pub struct Task {
    event: LifecycleEvent,
    done: mpsc::SyncSender<TaskResult>,
}

impl Task {
    /// Create a task and the completion handle its submitter waits on
    pub fn new(event: LifecycleEvent) -> (Self, Completion) {
        let (done, rx) = mpsc::sync_channel(1);
        (Self { event, done }, Completion { rx })
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Run the task on the current thread and signal the submitter
    ///
    /// `in_flight` is released before the signal so a submitter that sees
    /// the result never observes its own task as still running.
    fn run<P: EventProcessor + ?Sized>(self, processor: &P, in_flight: &AtomicUsize) {
        let kind = self.event.kind();
        let result = run_guarded(processor.name(), kind, || processor.process(&self.event));

        if let Err(ref e) = result {
            warn!(
                processor = processor.name(),
                kind = %kind,
                error = %e,
                "Event processing failed"
            );
        }

        in_flight.fetch_sub(1, Ordering::AcqRel);

        // A disconnected receiver means the submitter gave up waiting.
        if let Err(mpsc::TrySendError::Disconnected(result)) = self.done.try_send(result) {
            debug!(
                kind = %kind,
                success = result.is_ok(),
                "Task finished after caller timeout"
            );
        }
    }
}

/// Outcome of waiting on a [`Completion`]
#[derive(Debug)]
pub enum WaitResult {
    /// The task ran and reported a result
    Done(TaskResult),
    /// The wait budget elapsed first; the task may still be running
    TimedOut,
    /// The task was discarded without running
    Cancelled,
}

/// Submitter side of a task's completion signal
pub struct Completion {
    rx: mpsc::Receiver<TaskResult>,
}

impl Completion {
    /// Block up to `timeout` for the task to finish
    pub fn wait(self, timeout: Duration) -> WaitResult {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => WaitResult::Done(result),
            Err(RecvTimeoutError::Timeout) => WaitResult::TimedOut,
            Err(RecvTimeoutError::Disconnected) => WaitResult::Cancelled,
        }
    }
}

/// Run a processor call, converting a panic into an error
pub(crate) fn run_guarded<F>(processor: &str, kind: EventKind, operation: F) -> TaskResult
where
    F: FnOnce() -> TaskResult,
{
    match catch_unwind(AssertUnwindSafe(operation)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                processor = processor,
                kind = %kind,
                panic = %message,
                "Processor panicked"
            );
            Err(ContractError::Other(format!(
                "processor '{processor}' panicked on {kind} event: {message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fixed-size pool of worker threads sharing one bounded FIFO queue
pub struct WorkerPool {
    /// Queue input
    tx: Sender<Task>,
    /// Queue output, used to cancel queued tasks on forced shutdown
    rx: Receiver<Task>,
    /// Queue capacity
    capacity: usize,
    /// Worker thread handles (never joined, workers may be abandoned)
    workers: Vec<JoinHandle<()>>,
    /// Disconnects once every worker has exited
    exited: Mutex<mpsc::Receiver<()>>,
    /// Tasks accepted and not yet finished or cancelled
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create the queue and spawn `threads` named workers
    ///
    /// # Errors
    /// Returns `WorkerSpawn` if the OS refuses a thread; workers spawned
    /// so far are stopped before returning.
    #[instrument(name = "worker_pool_spawn", skip(processor), fields(processor = processor.name()))]
    pub fn spawn<P: EventProcessor + ?Sized + 'static>(
        processor: Arc<P>,
        capacity: usize,
        threads: usize,
        name_prefix: &str,
    ) -> Result<Self, DispatcherError> {
        let (tx, rx) = async_channel::bounded(capacity);
        let (exit_tx, exit_rx) = mpsc::channel::<()>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let name = format!("{name_prefix}-{index}");
            let worker_rx = rx.clone();
            let worker_processor = Arc::clone(&processor);
            let exit_guard = exit_tx.clone();
            let worker_in_flight = Arc::clone(&in_flight);

            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _exit_guard = exit_guard;
                worker_loop(worker_processor, worker_rx, worker_in_flight);
            });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    tx.close();
                    return Err(DispatcherError::WorkerSpawn {
                        thread: name,
                        source,
                    });
                }
            }
        }

        debug!(capacity, threads, "Worker pool started");

        Ok(Self {
            tx,
            rx,
            capacity,
            workers,
            exited: Mutex::new(exit_rx),
            in_flight,
        })
    }

    /// Enqueue a task without blocking
    ///
    /// # Errors
    /// `QueueFull` when the queue is at capacity, `QueueClosed` after shutdown.
    pub fn submit(&self, task: Task) -> Result<(), DispatcherError> {
        let kind = task.kind();
        // Counted before the send so a fast worker never decrements first.
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.tx.try_send(task).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            match e {
                TrySendError::Full(_) => DispatcherError::QueueFull {
                    capacity: self.capacity,
                    kind: kind.to_string(),
                },
                TrySendError::Closed(_) => DispatcherError::QueueClosed {
                    kind: kind.to_string(),
                },
            }
        })
    }

    /// Tasks queued but not yet picked up by a worker
    pub fn queue_depth(&self) -> usize {
        self.tx.len()
    }

    /// Tasks queued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Tasks a worker has picked up and not finished yet
    pub fn running(&self) -> usize {
        self.in_flight().saturating_sub(self.queue_depth())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Workers that have not exited yet
    pub fn live_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_finished()).count()
    }

    /// Stop accepting tasks; queued and running tasks are unaffected
    pub fn shutdown(&self) {
        if self.tx.close() {
            debug!(queued = self.queue_depth(), "Work queue closed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait up to `grace` for every worker to exit
    ///
    /// Returns `true` if all workers finished in time. Only meaningful after
    /// [`shutdown`](Self::shutdown), otherwise idle workers never exit.
    pub fn await_termination(&self, grace: Duration) -> Result<bool, DispatcherError> {
        let exited = self
            .exited
            .lock()
            .map_err(|_| DispatcherError::shutdown("worker exit monitor lock poisoned"))?;

        // Workers never send; the channel disconnects when the last one exits.
        match exited.recv_timeout(grace) {
            Err(RecvTimeoutError::Disconnected) => Ok(true),
            Err(RecvTimeoutError::Timeout) | Ok(()) => Ok(false),
        }
    }

    /// Close the queue and discard every task still queued
    ///
    /// Returns the number of discarded tasks. Tasks already running are left alone.
    pub fn shutdown_now(&self) -> usize {
        self.tx.close();

        let mut cancelled = 0;
        while let Ok(task) = self.rx.try_recv() {
            debug!(kind = %task.kind(), "Queued task cancelled");
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            cancelled += 1;
        }
        cancelled
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Lets idle workers exit once the queue is empty.
        self.tx.close();
    }
}

/// Worker thread body: run tasks until the queue is closed and empty
fn worker_loop<P: EventProcessor + ?Sized>(
    processor: Arc<P>,
    rx: Receiver<Task>,
    in_flight: Arc<AtomicUsize>,
) {
    debug!("Worker started");

    while let Ok(task) = rx.recv_blocking() {
        task.run(processor.as_ref(), &in_flight);
    }

    debug!("Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ApplicationEnd, JobEnd, JobResult, JobStart, OtherEvent};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    /// Processor that blocks job events until released
    struct GatedProcessor {
        processed: AtomicU64,
        gate: Mutex<mpsc::Receiver<()>>,
        fail: bool,
    }

    impl GatedProcessor {
        fn new(fail: bool) -> (Arc<Self>, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let processor = Arc::new(Self {
                processed: AtomicU64::new(0),
                gate: Mutex::new(rx),
                fail,
            });
            (processor, tx)
        }

        fn pass_gate(&self) {
            let _ = self.gate.lock().unwrap().recv();
        }
    }

    impl EventProcessor for GatedProcessor {
        fn name(&self) -> &str {
            "gated"
        }

        fn on_job_start(&self, _event: &JobStart) -> Result<(), ContractError> {
            self.pass_gate();
            self.processed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContractError::emit("gated", "mock failure"));
            }
            Ok(())
        }

        fn on_job_end(&self, _event: &JobEnd) -> Result<(), ContractError> {
            panic!("job end not supported");
        }

        fn on_other_event(&self, _event: &OtherEvent) -> Result<(), ContractError> {
            Ok(())
        }

        fn on_application_end(&self, _event: &ApplicationEnd) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn job_start(job_id: u64) -> LifecycleEvent {
        LifecycleEvent::JobStart(JobStart {
            job_id,
            time_ms: 0,
            stage_ids: vec![],
            properties: Default::default(),
        })
    }

    #[test]
    fn test_task_completes() {
        let (processor, gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(Arc::clone(&processor), 4, 1, "test-pool").unwrap();

        gate.send(()).unwrap();
        let (task, completion) = Task::new(job_start(1));
        pool.submit(task).unwrap();

        assert!(matches!(
            completion.wait(Duration::from_secs(5)),
            WaitResult::Done(Ok(()))
        ));
        assert_eq!(processor.processed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_failure_is_reported() {
        let (processor, gate) = GatedProcessor::new(true);
        let pool = WorkerPool::spawn(processor, 4, 1, "test-pool").unwrap();

        gate.send(()).unwrap();
        let (task, completion) = Task::new(job_start(1));
        pool.submit(task).unwrap();

        assert!(matches!(
            completion.wait(Duration::from_secs(5)),
            WaitResult::Done(Err(ContractError::Emit { .. }))
        ));
    }

    #[test]
    fn test_panic_is_converted_to_error() {
        let (processor, _gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(processor, 4, 1, "test-pool").unwrap();

        let (task, completion) = Task::new(LifecycleEvent::JobEnd(JobEnd {
            job_id: 1,
            time_ms: 0,
            result: JobResult::Succeeded,
        }));
        pool.submit(task).unwrap();

        match completion.wait(Duration::from_secs(5)) {
            WaitResult::Done(Err(e)) => assert!(e.to_string().contains("panicked")),
            other => panic!("unexpected wait result: {other:?}"),
        }

        // The worker survives the panic.
        assert_eq!(pool.live_workers(), 1);
    }

    #[test]
    fn test_wait_times_out_while_task_runs() {
        let (processor, gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(Arc::clone(&processor), 4, 1, "test-pool").unwrap();

        let (task, completion) = Task::new(job_start(1));
        pool.submit(task).unwrap();

        let started = Instant::now();
        assert!(matches!(
            completion.wait(Duration::from_millis(50)),
            WaitResult::TimedOut
        ));
        assert!(started.elapsed() < Duration::from_secs(2));

        // The task keeps running and completes once released.
        gate.send(()).unwrap();
        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert_eq!(processor.processed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_full_and_closed() {
        let (processor, gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(processor, 1, 1, "test-pool").unwrap();

        // First task occupies the worker, second fills the queue.
        let (running, _c1) = Task::new(job_start(1));
        pool.submit(running).unwrap();
        while pool.queue_depth() > 0 {
            thread::sleep(Duration::from_millis(1));
        }
        let (queued, _c2) = Task::new(job_start(2));
        pool.submit(queued).unwrap();
        assert_eq!(pool.queue_depth(), 1);

        let (rejected, _c3) = Task::new(job_start(3));
        assert!(matches!(
            pool.submit(rejected),
            Err(DispatcherError::QueueFull { capacity: 1, .. })
        ));

        pool.shutdown();
        assert!(pool.is_shutdown());
        let (late, _c4) = Task::new(job_start(4));
        assert!(matches!(
            pool.submit(late),
            Err(DispatcherError::QueueClosed { .. })
        ));

        gate.send(()).unwrap();
        gate.send(()).unwrap();
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn test_shutdown_now_cancels_queued_tasks() {
        let (processor, gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(Arc::clone(&processor), 10, 1, "test-pool").unwrap();

        let mut completions = Vec::new();
        for job_id in 0..4 {
            let (task, completion) = Task::new(job_start(job_id));
            pool.submit(task).unwrap();
            completions.push(completion);
        }
        while pool.queue_depth() > 3 {
            thread::sleep(Duration::from_millis(1));
        }

        pool.shutdown();
        assert!(!pool.await_termination(Duration::ZERO).unwrap());
        assert_eq!(pool.shutdown_now(), 3);
        assert_eq!(pool.queue_depth(), 0);

        // Cancelled tasks disconnect their submitters.
        let cancelled = completions.split_off(1);
        for completion in cancelled {
            assert!(matches!(
                completion.wait(Duration::from_secs(1)),
                WaitResult::Cancelled
            ));
        }

        gate.send(()).unwrap();
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert_eq!(processor.processed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_flight_tracks_queued_and_running_tasks() {
        let (processor, gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(processor, 4, 1, "test-pool").unwrap();
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.running(), 0);

        let (running, c1) = Task::new(job_start(1));
        pool.submit(running).unwrap();
        while pool.queue_depth() > 0 {
            thread::sleep(Duration::from_millis(1));
        }
        let (queued, _c2) = Task::new(job_start(2));
        pool.submit(queued).unwrap();
        assert_eq!(pool.in_flight(), 2);
        assert_eq!(pool.running(), 1);

        pool.shutdown();
        assert_eq!(pool.shutdown_now(), 1);
        assert_eq!(pool.in_flight(), 1);

        gate.send(()).unwrap();
        assert!(matches!(
            c1.wait(Duration::from_secs(5)),
            WaitResult::Done(Ok(()))
        ));
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_rejected_submission_is_not_in_flight() {
        let (processor, _gate) = GatedProcessor::new(false);
        let pool = WorkerPool::spawn(processor, 4, 1, "test-pool").unwrap();
        pool.shutdown();

        let (task, _completion) = Task::new(job_start(1));
        assert!(pool.submit(task).is_err());
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_worker_threads_are_named() {
        struct NameRecorder {
            names: Mutex<Vec<String>>,
        }

        impl EventProcessor for NameRecorder {
            fn name(&self) -> &str {
                "recorder"
            }
            fn on_job_start(&self, _event: &JobStart) -> Result<(), ContractError> {
                let name = thread::current().name().unwrap_or_default().to_string();
                self.names.lock().unwrap().push(name);
                Ok(())
            }
            fn on_job_end(&self, _event: &JobEnd) -> Result<(), ContractError> {
                Ok(())
            }
            fn on_other_event(&self, _event: &OtherEvent) -> Result<(), ContractError> {
                Ok(())
            }
            fn on_application_end(&self, _event: &ApplicationEnd) -> Result<(), ContractError> {
                Ok(())
            }
        }

        let recorder = Arc::new(NameRecorder {
            names: Mutex::new(Vec::new()),
        });
        let pool = WorkerPool::spawn(Arc::clone(&recorder), 4, 2, "named").unwrap();
        let (task, completion) = Task::new(job_start(1));
        pool.submit(task).unwrap();
        assert!(matches!(
            completion.wait(Duration::from_secs(5)),
            WaitResult::Done(Ok(()))
        ));

        let names = recorder.names.lock().unwrap();
        assert!(names[0] == "named-0" || names[0] == "named-1");
    }
}
