use std::time::Duration;

use thiserror::Error;

use crate::kind::GateKind;

/// Admission failures. Exhausted capacity is not one of them: a full gate
/// makes callers wait.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("gate {0} is closed")]
    Closed(GateKind),

    #[error("gate {gate} did not admit the task within {waited:?}")]
    WaitTimeout { gate: GateKind, waited: Duration },
}

/// Failure of [`crate::process_batch`].
#[derive(Debug, Error)]
pub enum BatchError<E> {
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// The transform failed on chunk `index` (zero-based); later chunks were
    /// not run.
    #[error("batch chunk {index} failed: {error}")]
    Chunk { index: usize, error: E },
}

impl<E> BatchError<E> {
    /// The transform's own error, if that is what stopped the batch.
    pub fn into_chunk_error(self) -> Option<E> {
        match self {
            BatchError::Chunk { error, .. } => Some(error),
            BatchError::InvalidBatchSize => None,
        }
    }
}
