use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Lifecycle status of the speech-recognition binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session has been requested yet
    Idle,
    Starting,
    Listening,
    Stopped,
    ErroredTransient,
    ErroredFatal,
}

impl SessionStatus {
    /// Whether the engine is (or is about to be) delivering results
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Listening)
    }

    /// Transition table for a single recognition session
    ///
    /// Restarts never move an old session back to `Starting`; they create a
    /// new session instead.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, next) {
            (Idle, Starting) | (Idle, ErroredFatal) => true,
            (Starting, Listening | ErroredTransient | ErroredFatal | Stopped) => true,
            (Listening, Listening | ErroredTransient | Stopped) => true,
            (ErroredTransient, ErroredTransient | Stopped) => true,
            (ErroredFatal, Stopped) => true,
            (Stopped, Stopped) => true,
            _ => false,
        }
    }
}

/// One live binding to the external speech engine
#[derive(Debug, Clone)]
pub struct RecognitionSession {
    /// Generation that distinguishes this binding from earlier ones
    pub generation: u64,

    /// Unique identifier reported to external engines
    pub session_id: String,

    pub status: SessionStatus,

    /// Keep recognizing across utterances (always true)
    pub continuous: bool,

    /// Deliver partial hypotheses (always true)
    pub interim_results: bool,

    /// Set only by a deliberate stop; blocks every later auto-restart
    pub suppress_restart: bool,

    pub created_at: DateTime<Utc>,
}

impl RecognitionSession {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            session_id: format!("speech-{}", uuid::Uuid::new_v4()),
            status: SessionStatus::Starting,
            continuous: true,
            interim_results: true,
            suppress_restart: false,
            created_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: SessionStatus) -> Result<(), SpeechError> {
        if !self.status.can_transition_to(next) {
            return Err(SpeechError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_with_restart_allowed() {
        let session = RecognitionSession::new(3);
        assert_eq!(session.status, SessionStatus::Starting);
        assert!(session.continuous && session.interim_results);
        assert!(!session.suppress_restart);
        assert!(session.session_id.starts_with("speech-"));
    }

    #[test]
    fn stopped_session_cannot_resume() {
        let mut session = RecognitionSession::new(1);
        session.transition(SessionStatus::Listening).unwrap();
        session.transition(SessionStatus::Stopped).unwrap();

        let err = session.transition(SessionStatus::Listening).unwrap_err();
        assert_eq!(
            err,
            SpeechError::IllegalTransition {
                from: SessionStatus::Stopped,
                to: SessionStatus::Listening,
            }
        );
        assert!(!SessionStatus::Stopped.can_transition_to(SessionStatus::Starting));
    }

    #[test]
    fn transient_error_then_end_is_legal() {
        let mut session = RecognitionSession::new(1);
        session.transition(SessionStatus::Listening).unwrap();
        session.transition(SessionStatus::ErroredTransient).unwrap();
        session.transition(SessionStatus::Stopped).unwrap();
        assert_eq!(session.status, SessionStatus::Stopped);
    }
}
