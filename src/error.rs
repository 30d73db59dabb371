//! Error types for micro-tuner.
//!
//! Errors are split by concern:
//! - [`StageError`]: lifecycle misuse of a stage (reported synchronously to the caller)
//! - [`SubmitError`]: an item handed to a stopped stage, returned to the caller
//! - [`TransformError`]: a single item failed; the stage logs it and moves on
//! - [`ConfigError`]: invalid construction parameters
//!
//! "No frequency detected" and "undetermined note" are not errors. They are
//! `Ok(None)` results of [`Transform::apply`](crate::pipeline::Transform::apply).

use core::fmt;

/// Lifecycle errors of a [`Stage`](crate::pipeline::Stage) or
/// [`Source`](crate::pipeline::Source).
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// `start()` was called on a running stage.
    #[error("stage '{stage}' is already running")]
    AlreadyRunning {
        /// Name of the stage.
        stage: String,
    },

    /// `stop()` was called on a stopped stage.
    #[error("stage '{stage}' is not running")]
    NotRunning {
        /// Name of the stage.
        stage: String,
    },

    /// The transform or the downstream target was replaced while running.
    #[error("cannot {operation} on stage '{stage}' while it is running")]
    InvalidWhileRunning {
        /// Name of the stage.
        stage: String,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker for stage '{stage}': {source}")]
    SpawnFailed {
        /// Name of the stage.
        stage: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker thread panicked outside of a transform call.
    #[error("worker thread of stage '{stage}' panicked")]
    WorkerPanicked {
        /// Name of the stage.
        stage: String,
    },
}

/// Returned by [`Consumer::submit`](crate::pipeline::Consumer::submit) when the
/// receiving stage is stopped. The rejected item is handed back.
pub struct SubmitError<T> {
    stage: String,
    item: T,
}

impl<T> SubmitError<T> {
    pub(crate) fn new(stage: impl Into<String>, item: T) -> Self {
        Self {
            stage: stage.into(),
            item,
        }
    }

    /// Name of the stage that rejected the item.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Takes back the rejected item.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError")
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage '{}' is stopped, item rejected", self.stage)
    }
}

impl<T> std::error::Error for SubmitError<T> {}

/// Per-item failure of a [`Transform`](crate::pipeline::Transform).
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The sample holds fewer values than one analysis frame.
    #[error("sample has {len} values, frame size is {frame_size}")]
    SampleTooShort {
        /// Number of values in the sample.
        len: usize,
        /// Required frame size.
        frame_size: usize,
    },

    /// A capture source has no more data to produce.
    #[error("capture source exhausted")]
    Exhausted,

    /// Custom error for user-implemented transforms.
    #[error("{0}")]
    Custom(String),
}

impl TransformError {
    /// Creates a custom transform error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Invalid construction parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The frame size is not a power of two between 8 and 4096.
    #[error("unsupported frame size {0} (expected a power of two in 8..=4096)")]
    UnsupportedFrameSize(usize),

    /// The z-score is negative or not finite.
    #[error("invalid target z-score {0}")]
    InvalidZScore(f32),

    /// The silence threshold is not finite.
    #[error("invalid silence threshold {0} dB")]
    InvalidSilenceThreshold(f32),

    /// The reference frequency is not positive and finite.
    #[error("invalid reference frequency {0} Hz")]
    InvalidReferenceFrequency(f64),

    /// A stage buffer must hold at least one item.
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,

    /// Sample rate, duration or capture parameters are not positive and finite.
    #[error("invalid sample parameters: {0}")]
    InvalidSample(String),
}
