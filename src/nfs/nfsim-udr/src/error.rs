//! UDR error types

use nfsim_core::Imsi;
use thiserror::Error;

/// UDR errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UdrError {
    #[error("Subscription data already exists for IMSI: {0}")]
    Duplicate(Imsi),

    #[error("Subscription data not found for IMSI: {0}")]
    NotFound(Imsi),
}

pub type UdrResult<T> = Result<T, UdrError>;
