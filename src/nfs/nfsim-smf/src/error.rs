//! SMF error types

use nfsim_core::{SessionId, SessionState};
use thiserror::Error;

/// SMF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmfError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session {session_id} is not active (state {state})")]
    NotActive {
        session_id: SessionId,
        state: SessionState,
    },

    #[error("Session {session_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        session_id: SessionId,
        from: SessionState,
        to: SessionState,
    },
}

pub type SmfResult<T> = Result<T, SmfError>;
