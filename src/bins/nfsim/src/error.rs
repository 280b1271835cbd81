//! Simulator error types

use nfsim_core::{ActorError, CaptureError, DispatchError, GnbId, SessionId, UeId};
use thiserror::Error;

/// Simulator errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("{nf} rejected request: {reason}")]
    Rejected { nf: String, reason: String },

    #[error("Unknown UE: {0}")]
    UnknownUe(UeId),

    #[error("Unknown gNodeB: {0}")]
    UnknownGnb(GnbId),

    #[error("UE {0} has no active session")]
    NoSession(UeId),

    #[error("Session {0} not established")]
    UnknownSession(SessionId),
}

impl SimError {
    pub(crate) fn rejected(nf: &str, reason: impl ToString) -> Self {
        SimError::Rejected {
            nf: nf.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Split a dispatch failure into an NF rejection or a dead actor
    pub(crate) fn from_dispatch<E: std::error::Error + 'static>(nf: &str, err: DispatchError<E>) -> Self {
        match err {
            DispatchError::Nf(e) => Self::rejected(nf, e),
            DispatchError::Actor(e) => SimError::Actor(e),
        }
    }

    /// True for errors raised by an NF rather than by the runtime
    pub fn is_rejection(&self) -> bool {
        matches!(self, SimError::Rejected { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
