use thiserror::Error;

use crate::speech::SessionStatus;

/// Faults raised around the speech-recognition resource
///
/// Engine-level faults never reach the caller as errors; the controller turns
/// them into status transitions. These variants surface only from the engine
/// seam and from transition validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    /// The platform offers no speech-recognition capability (permanent)
    #[error("speech recognition capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The engine failed in a way that is worth retrying
    #[error("transient speech engine error: {0}")]
    TransientEngine(String),

    /// A session status change that the state machine does not allow
    #[error("illegal session transition {from:?} -> {to:?}")]
    IllegalTransition { from: SessionStatus, to: SessionStatus },

    /// The controller task has shut down
    #[error("speech controller is no longer running")]
    ControllerClosed,
}

/// Faults raised by the completion service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("no API credential has been configured")]
    MissingCredential,

    #[error("message is empty")]
    EmptyMessage,

    /// Any transport failure or non-success response
    #[error("completion request failed: {0}")]
    RequestFailed(String),

    #[error("message {0} not found")]
    MessageNotFound(u64),
}
