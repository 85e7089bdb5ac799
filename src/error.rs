use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the graph and the pipeline executive.
///
/// Failure is always reported back to the original `update` caller; no layer
/// retries on its own, and already-valid downstream data is left untouched.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("node not found: {0}")]
    NodeNotFound(Uuid),
    #[error("node {node} has no {direction} port {port}")]
    PortOutOfRange {
        node: Uuid,
        direction: &'static str,
        port: usize,
    },
    #[error("input port {port} on node {node} is already connected")]
    SlotOccupied { node: Uuid, port: usize },
    #[error("cannot connect: output produces {produced} extents but input consumes {consumed} extents")]
    ExtentKindMismatch {
        produced: &'static str,
        consumed: &'static str,
    },
    #[error("cannot connect: output produces '{produced}' but input requires '{required}'")]
    DataTypeMismatch {
        produced: &'static str,
        required: &'static str,
    },
    #[error("invalid extent request: {0}")]
    InvalidExtentRequest(String),
    #[error("input port {port} on node {node} has no connection")]
    MissingConnection { node: Uuid, port: usize },
    #[error("re-entrant {pass} on node {node}; the graph likely contains a cycle")]
    ReentrantPropagation { node: Uuid, pass: &'static str },
    #[error("execution failed: {0}")]
    ExecutionFailure(String),
}

impl PipelineError {
    pub fn execution(message: impl Into<String>) -> Self {
        PipelineError::ExecutionFailure(message.into())
    }

    pub fn invalid_extent(message: impl Into<String>) -> Self {
        PipelineError::InvalidExtentRequest(message.into())
    }
}
