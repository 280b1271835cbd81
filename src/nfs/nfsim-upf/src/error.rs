//! UPF error types

use nfsim_core::SessionId;
use thiserror::Error;

/// UPF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpfError {
    #[error("Session already attached: {0}")]
    Duplicate(SessionId),
}

pub type UpfResult<T> = Result<T, UpfError>;
