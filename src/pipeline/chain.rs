use super::Lifecycle;
use crate::error::StageError;

/// Owns a chain of stages through its head.
///
/// Starting the pipeline starts every stage, the last one first. Stopping it
/// stops the head, lets each stage drain its buffer and then stops the next one,
/// so everything captured before `stop` is called reaches the end of the chain.
/// Dropping a running pipeline stops it.
pub struct Pipeline {
    head: Box<dyn Lifecycle>,
}

impl Pipeline {
    pub fn new(head: impl Lifecycle + 'static) -> Self {
        Pipeline {
            head: Box::new(head),
        }
    }

    pub fn start(&self) -> Result<(), StageError> {
        tracing::info!(head = self.head.name(), "starting pipeline");
        self.head.start()
    }

    /// Stops the pipeline, blocking until every stage has drained.
    pub fn stop(&self) -> Result<(), StageError> {
        tracing::info!(head = self.head.name(), "stopping pipeline");
        self.head.stop()
    }

    pub fn is_running(&self) -> bool {
        self.head.is_running()
    }

    pub fn head(&self) -> &dyn Lifecycle {
        self.head.as_ref()
    }
}
