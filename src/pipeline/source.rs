use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::stage::{run_once, Counters, Downstream, Outcome, StageStats};
use super::transform::Transform;
use super::{Lifecycle, RunState};
use crate::error::StageError;

struct Control<O> {
    downstream: Option<Downstream<O>>,
    worker: Option<JoinHandle<()>>,
}

/// The head of a pipeline.
///
/// While running, a worker thread repeatedly applies the transform to `()` and
/// submits each result downstream. The transform is expected to block until it
/// has something to produce, for example until an audio capture completes.
/// Submitting blocks while the downstream buffer is full, so a source never
/// runs ahead of its consumers by more than their buffer capacity.
///
/// The worker stops producing when the transform returns
/// [`TransformError::Exhausted`](crate::error::TransformError::Exhausted). The
/// source still counts as running until [`stop`](Lifecycle::stop) is called.
pub struct Source<T: Transform<Input = ()>> {
    name: Arc<str>,
    state: Arc<Mutex<RunState>>,
    transform: Arc<Mutex<T>>,
    counters: Arc<Counters>,
    control: Mutex<Control<T::Output>>,
}

impl<T: Transform<Input = ()>> Source<T> {
    pub fn new(
        name: impl Into<String>,
        transform: T,
        downstream: Option<Downstream<T::Output>>,
    ) -> Self {
        let name: String = name.into();
        Source {
            name: name.into(),
            state: Arc::new(Mutex::new(RunState::Stopped)),
            transform: Arc::new(Mutex::new(transform)),
            counters: Arc::new(Counters::default()),
            control: Mutex::new(Control {
                downstream,
                worker: None,
            }),
        }
    }

    pub fn stats(&self) -> StageStats {
        self.counters.snapshot()
    }

    /// Runs `f` on the transform. Only allowed while stopped.
    pub fn update_transform<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StageError> {
        let _control = self.control.lock();
        if self.is_running() {
            return Err(StageError::InvalidWhileRunning {
                stage: self.name.to_string(),
                operation: "replace transform",
            });
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
            return Err(StageError::InvalidWhileRunning {
                stage: self.name.to_string(),
                operation: "set downstream",
            });
        }
        control.downstream = downstream;
        Ok(())
    }
}

impl<T: Transform<Input = ()>> Lifecycle for Source<T> {
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

        *self.state.lock() = RunState::Running;
        let name = self.name.clone();
        let state = self.state.clone();
        let transform = self.transform.clone();
        let counters = self.counters.clone();
        let downstream = control.downstream.clone();
        let spawned = thread::Builder::new()
            .name(format!("source-{}", self.name))
            .spawn(move || {
                debug!(source = %name, "producing");
                while *state.lock() == RunState::Running {
                    if let Outcome::Exhausted =
                        run_once(&name, &transform, (), &counters, downstream.as_ref())
                    {
                        break;
                    }
                }
                debug!(source = %name, "finished producing");
            });

        match spawned {
            Ok(worker) => {
                control.worker = Some(worker);
                Ok(())
            }
            Err(source) => {
                *self.state.lock() = RunState::Stopped;
                if let Some(downstream) = &control.downstream {
                    if let Err(err) = downstream.stop() {
                        warn!(source = %self.name, error = %err, "failed to stop downstream");
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
        {
            let mut state = self.state.lock();
            if *state == RunState::Stopped {
                return Err(StageError::NotRunning {
                    stage: self.name.to_string(),
                });
            }
            *state = RunState::Stopped;
        }
        debug!(source = %self.name, "stopping");

        // The worker finishes the capture in progress and hands it over first.
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
        *self.state.lock() == RunState::Running
    }
}

impl<T: Transform<Input = ()>> Drop for Source<T> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                warn!(source = %self.name, error = %err, "failed to stop source on drop");
            }
        }
    }
}
