//! Threaded processing stages connected by bounded buffers.
//!
//! A [`Stage`] owns a [`Transform`], a fixed capacity FIFO and a worker thread.
//! Items handed to [`Consumer::submit`] are processed in order and the results
//! submitted to the stage's downstream consumer. `submit` blocks while the buffer
//! is full, so a slow stage throttles everything upstream of it.
//!
//! A [`Source`] is the head of a chain. Its transform takes no input (typically an
//! audio capture) and is invoked repeatedly while the source is running.
//!
//! References only point downstream. Starting a stage starts its downstream first,
//! so a consumer is always ready before anything is produced towards it. Stopping a
//! stage lets it drain its buffer, then stops its downstream.
//!
//! ```
//! use std::sync::Arc;
//! use micro_tuner::pipeline::{transform_fn, Consumer, Lifecycle, Stage};
//!
//! let sink = Stage::new("sink", 4, transform_fn(|x: i32| Ok(Some(x))), None).unwrap();
//! let doubler = Arc::new(
//!     Stage::new("doubler", 4, transform_fn(|x: i32| Ok(Some(2 * x))), Some(sink.into_consumer()))
//!         .unwrap(),
//! );
//!
//! doubler.start().unwrap();
//! for i in 0..10 {
//!     doubler.submit(i).unwrap();
//! }
//! // Drains both stages before returning.
//! doubler.stop().unwrap();
//! assert_eq!(doubler.stats().processed, 10);
//! ```

mod chain;
mod semaphore;
mod source;
mod stage;
mod transform;

use std::sync::Arc;

use crate::error::{StageError, SubmitError};

pub use chain::Pipeline;
pub use semaphore::Semaphore;
pub use source::Source;
pub use stage::{Downstream, Stage, StageStats};
pub use transform::{transform_fn, FnTransform, Transform};

/// Run state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Something that can be started and stopped.
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;

    /// Starts this stage and everything downstream of it, tail first.
    fn start(&self) -> Result<(), StageError>;

    /// Stops this stage once its pending work is done, then stops its downstream.
    fn stop(&self) -> Result<(), StageError>;

    fn is_running(&self) -> bool;
}

/// Something that accepts items.
pub trait Consumer<I>: Lifecycle {
    /// Hands `item` over, blocking until there is room for it.
    ///
    /// Fails, returning the item, if the consumer is stopped.
    fn submit(&self, item: I) -> Result<(), SubmitError<I>>;
}

impl<L: Lifecycle + ?Sized> Lifecycle for Arc<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&self) -> Result<(), StageError> {
        (**self).start()
    }

    fn stop(&self) -> Result<(), StageError> {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}

impl<I, C: Consumer<I> + ?Sized> Consumer<I> for Arc<C> {
    fn submit(&self, item: I) -> Result<(), SubmitError<I>> {
        (**self).submit(item)
    }
}
