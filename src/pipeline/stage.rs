use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::semaphore::Semaphore;
use super::transform::Transform;
use super::{Consumer, Lifecycle, RunState};
use crate::error::{ConfigError, StageError, SubmitError, TransformError};

/// Shared handle to the consumer a stage forwards its results to.
pub type Downstream<T> = Arc<dyn Consumer<T>>;

/// Item counts of a stage since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Items for which the transform produced a result.
    pub processed: u64,
    /// Items for which the transform produced no result.
    pub skipped: u64,
    /// Items for which the transform failed or panicked.
    pub failed: u64,
}

#[derive(Default)]
pub(super) struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    pub(super) fn snapshot(&self) -> StageStats {
        StageStats {
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// What happened to a single item.
pub(super) enum Outcome {
    Done,
    Exhausted,
}

/// Runs `transform` on `input`, counting the outcome and forwarding any result.
///
/// Failures and panics are logged and counted, never propagated.
pub(super) fn run_once<T: Transform>(
    name: &str,
    transform: &Mutex<T>,
    input: T::Input,
    counters: &Counters,
    downstream: Option<&Downstream<T::Output>>,
) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| transform.lock().apply(input)));
    match result {
        Ok(Ok(Some(output))) => {
            counters.processed.fetch_add(1, Ordering::Relaxed);
            if let Some(downstream) = downstream {
                if let Err(err) = downstream.submit(output) {
                    warn!(
                        stage = name,
                        downstream = err.stage(),
                        "downstream is stopped, discarding result"
                    );
                }
            }
        }
        Ok(Ok(None)) => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            trace!(stage = name, "no result");
        }
        Ok(Err(TransformError::Exhausted)) => {
            debug!(stage = name, "input exhausted");
            return Outcome::Exhausted;
        }
        Ok(Err(err)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(stage = name, error = %err, "transform failed");
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(stage = name, "transform panicked");
        }
    }
    Outcome::Done
}

struct Queue<I> {
    items: VecDeque<I>,
    state: RunState,
}

/// A FIFO of fixed capacity.
///
/// `free_slots` counts the items that can be pushed without blocking and
/// `filled_slots` the items that can be popped. Both only change outside of the
/// queue lock. Stopping releases one extra filled slot to wake the worker once
/// the queue is drained.
struct BoundedBuffer<I> {
    queue: Mutex<Queue<I>>,
    free_slots: Semaphore,
    filled_slots: Semaphore,
}

impl<I> BoundedBuffer<I> {
    fn new(capacity: usize) -> Self {
        BoundedBuffer {
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity),
                state: RunState::Stopped,
            }),
            free_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
        }
    }

    fn state(&self) -> RunState {
        self.queue.lock().state
    }

    fn len(&self) -> usize {
        self.queue.lock().items.len()
    }

    fn set_running(&self) {
        self.queue.lock().state = RunState::Running;
    }

    /// Returns false if the buffer was not running.
    fn stop(&self) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.state == RunState::Stopped {
                return false;
            }
            queue.state = RunState::Stopped;
        }
        self.filled_slots.release();
        true
    }

    fn push(&self, stage: &str, item: I) -> Result<(), SubmitError<I>> {
        if self.state() == RunState::Stopped {
            return Err(SubmitError::new(stage, item));
        }
        self.free_slots.acquire();
        {
            let mut queue = self.queue.lock();
            if queue.state == RunState::Stopped {
                drop(queue);
                self.free_slots.release();
                return Err(SubmitError::new(stage, item));
            }
            queue.items.push_back(item);
        }
        self.filled_slots.release();
        Ok(())
    }

    /// Blocks until an item is available. Returns `None` once the buffer is
    /// stopped and drained.
    fn pop(&self) -> Option<I> {
        loop {
            self.filled_slots.acquire();
            let mut queue = self.queue.lock();
            if let Some(item) = queue.items.pop_front() {
                drop(queue);
                self.free_slots.release();
                return Some(item);
            }
            if queue.state == RunState::Stopped {
                return None;
            }
        }
    }
}

struct Control<O> {
    downstream: Option<Downstream<O>>,
    worker: Option<JoinHandle<()>>,
}

/// A processing stage: a bounded input buffer, a [`Transform`] and a worker
/// thread applying the transform to buffered items in arrival order.
///
/// Results are submitted to the downstream consumer, if any. Since `submit`
/// blocks while the downstream buffer is full, a slow consumer throttles this
/// stage, which in turn throttles its producers.
pub struct Stage<T: Transform> {
    name: Arc<str>,
    capacity: usize,
    buffer: Arc<BoundedBuffer<T::Input>>,
    transform: Arc<Mutex<T>>,
    counters: Arc<Counters>,
    control: Mutex<Control<T::Output>>,
}

impl<T: Transform> Stage<T> {
    /// Creates a stopped stage buffering at most `capacity` items.
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        transform: T,
        downstream: Option<Downstream<T::Output>>,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let name: String = name.into();
        Ok(Stage {
            name: name.into(),
            capacity,
            buffer: Arc::new(BoundedBuffer::new(capacity)),
            transform: Arc::new(Mutex::new(transform)),
            counters: Arc::new(Counters::default()),
            control: Mutex::new(Control {
                downstream,
                worker: None,
            }),
        })
    }

    /// Wraps the stage in a shared handle for use as the downstream of another stage.
    pub fn into_consumer(self) -> Downstream<T::Input> {
        Arc::new(self)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of items waiting to be processed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> StageStats {
        self.counters.snapshot()
    }

    /// Replaces the transform. Only allowed while stopped.
    pub fn set_transform(&self, transform: T) -> Result<(), StageError> {
        self.update_transform(|current| *current = transform)
    }

    /// Runs `f` on the transform. Only allowed while stopped.
    pub fn update_transform<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StageError> {
        let _control = self.control.lock();
        if self.is_running() {
            return Err(self.invalid_while_running("replace transform"));
        }
        let mut transform = self.transform.lock();
        Ok(f(&mut transform))
    }

    /// Replaces the downstream target. Only allowed while stopped.
    pub fn set_downstream(
        &self,
        downstream: Option<Downstream<T::Output>>,
    ) -> Result<(), StageError> {
        let mut control = self.control.lock();
        if self.is_running() {
            return Err(self.invalid_while_running("set downstream"));
        }
        control.downstream = downstream;
        Ok(())
    }

    fn invalid_while_running(&self, operation: &'static str) -> StageError {
        StageError::InvalidWhileRunning {
            stage: self.name.to_string(),
            operation,
        }
    }
}

impl<T: Transform> Lifecycle for Stage<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), StageError> {
        let mut control = self.control.lock();
        if self.is_running() {
            return Err(StageError::AlreadyRunning {
                stage: self.name.to_string(),
            });
        }

        if let Some(downstream) = &control.downstream {
            downstream.start()?;
        }

        self.buffer.set_running();
        let name = self.name.clone();
        let buffer = self.buffer.clone();
        let transform = self.transform.clone();
        let counters = self.counters.clone();
        let downstream = control.downstream.clone();
        let spawned = thread::Builder::new()
            .name(format!("stage-{}", self.name))
            .spawn(move || {
                debug!(stage = %name, "worker started");
                while let Some(item) = buffer.pop() {
                    run_once(&name, &transform, item, &counters, downstream.as_ref());
                }
                debug!(stage = %name, "worker finished");
            });

        match spawned {
            Ok(worker) => {
                control.worker = Some(worker);
                debug!(stage = %self.name, capacity = self.capacity, "started");
                Ok(())
            }
            Err(source) => {
                self.buffer.stop();
                if let Some(downstream) = &control.downstream {
                    if let Err(err) = downstream.stop() {
                        warn!(stage = %self.name, error = %err, "failed to stop downstream");
                    }
                }
                Err(StageError::SpawnFailed {
                    stage: self.name.to_string(),
                    source,
                })
            }
        }
    }

    fn stop(&self) -> Result<(), StageError> {
        let mut control = self.control.lock();
        let pending = self.buffer.len();
        if !self.buffer.stop() {
            return Err(StageError::NotRunning {
                stage: self.name.to_string(),
            });
        }
        debug!(stage = %self.name, pending, "stopping");

        let joined = match control.worker.take() {
            Some(worker) => worker.join(),
            None => Ok(()),
        };

        if let Some(downstream) = &control.downstream {
            downstream.stop()?;
        }

        joined.map_err(|_| StageError::WorkerPanicked {
            stage: self.name.to_string(),
        })
    }

    fn is_running(&self) -> bool {
        self.buffer.state() == RunState::Running
    }
}

impl<T: Transform> Consumer<T::Input> for Stage<T> {
    fn submit(&self, item: T::Input) -> Result<(), SubmitError<T::Input>> {
        self.buffer.push(&self.name, item)
    }
}

impl<T: Transform> Drop for Stage<T> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                warn!(stage = %self.name, error = %err, "failed to stop stage on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::transform_fn;
    use crossbeam_channel::{Receiver, Sender};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn collector<T: Send + 'static>(
        tx: Sender<T>,
    ) -> Stage<impl Transform<Input = T, Output = ()>> {
        Stage::new(
            "collector",
            4,
            transform_fn(move |item: T| {
                tx.send(item).map_err(|_| TransformError::custom("receiver dropped"))?;
                Ok(Some(()))
            }),
            None,
        )
        .unwrap()
    }

    /// A stage that forwards items once `gate` lets them through.
    fn gated(
        capacity: usize,
        gate: Receiver<()>,
        downstream: Option<Downstream<u32>>,
    ) -> Stage<impl Transform<Input = u32, Output = u32>> {
        Stage::new(
            "gated",
            capacity,
            transform_fn(move |item: u32| {
                gate.recv().map_err(|_| TransformError::custom("gate closed"))?;
                Ok(Some(item))
            }),
            downstream,
        )
        .unwrap()
    }

    fn passthrough(
        name: &str,
        downstream: Option<Downstream<u32>>,
    ) -> Stage<impl Transform<Input = u32, Output = u32>> {
        Stage::new(name, 1, transform_fn(|x: u32| Ok(Some(x))), downstream).unwrap()
    }

    #[test]
    fn test_zero_capacity() {
        let result = Stage::new("empty", 0, transform_fn(|x: u32| Ok(Some(x))), None);
        assert_eq!(result.err(), Some(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_items_arrive_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stage = Stage::new(
            "increment",
            3,
            transform_fn(|x: u32| Ok(Some(x + 1))),
            Some(collector(tx).into_consumer()),
        )
        .unwrap();

        stage.start().unwrap();
        for i in 0..100 {
            stage.submit(i).unwrap();
        }
        stage.stop().unwrap();

        let received: Vec<u32> = rx.try_iter().collect();
        assert_eq!(received, (1..=100).collect::<Vec<_>>());
        assert_eq!(stage.stats().processed, 100);
    }

    #[test]
    fn test_submit_blocks_while_buffer_is_full() {
        for capacity in [1, 2, 5] {
            let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
            let stage = Arc::new(gated(capacity, gate_rx, None));
            stage.start().unwrap();

            // The last of these only fits once the worker holds the first.
            let filled = capacity as u32 + 1;
            for i in 0..filled {
                stage.submit(i).unwrap();
            }
            assert_eq!(stage.buffered(), capacity);

            let (done_tx, done_rx) = crossbeam_channel::bounded(1);
            let producer = {
                let stage = stage.clone();
                thread::spawn(move || {
                    stage.submit(filled).unwrap();
                    done_tx.send(()).unwrap();
                })
            };

            assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
            assert_eq!(stage.buffered(), capacity, "capacity {}", capacity);

            gate_tx.send(()).unwrap();
            assert!(done_rx.recv_timeout(TIMEOUT).is_ok());
            producer.join().unwrap();
            assert!(stage.buffered() <= capacity);

            for _ in 0..filled {
                gate_tx.send(()).unwrap();
            }
            stage.stop().unwrap();
            assert_eq!(stage.stats().processed, u64::from(filled) + 1);
        }
    }

    #[test]
    fn test_stop_drains_buffer() {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let (tx, rx) = crossbeam_channel::unbounded();
        let stage = gated(2, gate_rx, Some(collector(tx).into_consumer()));
        stage.start().unwrap();

        for i in 0..3 {
            stage.submit(i).unwrap();
        }
        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }
        stage.stop().unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(stage.buffered(), 0);
    }

    #[test]
    fn test_submit_after_stop_is_rejected() {
        let stage = Stage::new("stopped", 2, transform_fn(|x: u32| Ok(Some(x))), None).unwrap();
        let err = stage.submit(7).unwrap_err();
        assert_eq!(err.stage(), "stopped");
        assert_eq!(err.into_inner(), 7);

        stage.start().unwrap();
        stage.submit(1).unwrap();
        stage.stop().unwrap();
        assert_eq!(stage.submit(8).unwrap_err().into_inner(), 8);
        assert_eq!(stage.stats().processed, 1);
    }

    #[test]
    fn test_redundant_start_and_stop() {
        let stage = Stage::new("twice", 1, transform_fn(|x: u32| Ok(Some(x))), None).unwrap();
        assert!(matches!(stage.stop(), Err(StageError::NotRunning { .. })));
        stage.start().unwrap();
        assert!(matches!(stage.start(), Err(StageError::AlreadyRunning { .. })));
        stage.stop().unwrap();
        assert!(matches!(stage.stop(), Err(StageError::NotRunning { .. })));
    }

    #[test]
    fn test_restart() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stage = Stage::new(
            "restart",
            1,
            transform_fn(|x: u32| Ok(Some(x))),
            Some(collector(tx).into_consumer()),
        )
        .unwrap();
        for i in 0..3 {
            stage.start().unwrap();
            stage.submit(i).unwrap();
            stage.stop().unwrap();
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_start_and_stop_cascade() {
        let sink = Arc::new(passthrough("sink", None));
        let downstream: Downstream<u32> = sink.clone();
        let head = passthrough("head", Some(downstream));

        head.start().unwrap();
        assert!(head.is_running());
        assert!(sink.is_running());

        head.submit(1).unwrap();
        head.stop().unwrap();
        assert!(!head.is_running());
        assert!(!sink.is_running());
        assert_eq!(sink.stats().processed, 1);
    }

    #[test]
    fn test_reconfigure_only_while_stopped() {
        let stage = Stage::new("config", 1, transform_fn(|x: u32| Ok(Some(x))), None).unwrap();
        stage.start().unwrap();
        assert!(matches!(
            stage.set_downstream(None),
            Err(StageError::InvalidWhileRunning { operation: "set downstream", .. })
        ));
        assert!(matches!(
            stage.update_transform(|_| ()),
            Err(StageError::InvalidWhileRunning { .. })
        ));
        stage.stop().unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        stage.set_downstream(Some(collector(tx).into_consumer())).unwrap();
        stage.start().unwrap();
        stage.submit(5).unwrap();
        stage.stop().unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_failures_do_not_stop_the_worker() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stage = Stage::new(
            "flaky",
            4,
            transform_fn(|x: u32| match x % 4 {
                1 => Err(TransformError::custom("odd one out")),
                2 => panic!("cannot handle {}", x),
                3 => Ok(None),
                _ => Ok(Some(x)),
            }),
            Some(collector(tx).into_consumer()),
        )
        .unwrap();

        stage.start().unwrap();
        for i in 0..12 {
            stage.submit(i).unwrap();
        }
        stage.stop().unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(
            stage.stats(),
            StageStats {
                processed: 3,
                skipped: 3,
                failed: 6,
            }
        );
    }

    #[test]
    fn test_stopped_downstream_discards_results() {
        let sink = Arc::new(passthrough("sink", None));
        let downstream: Downstream<u32> = sink.clone();
        let head = passthrough("head", Some(downstream));

        head.start().unwrap();
        sink.stop().unwrap();
        head.submit(1).unwrap();
        assert!(matches!(head.stop(), Err(StageError::NotRunning { .. })));
        assert_eq!(head.stats().processed, 1);
        assert_eq!(sink.stats().processed, 0);
    }

    #[test]
    fn test_drop_stops_worker() {
        let (tx, rx) = crossbeam_channel::unbounded();
        {
            let stage = Stage::new(
                "dropped",
                2,
                transform_fn(|x: u32| Ok(Some(x))),
                Some(collector(tx).into_consumer()),
            )
            .unwrap();
            stage.start().unwrap();
            stage.submit(9).unwrap();
        }
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 9);
    }
}
