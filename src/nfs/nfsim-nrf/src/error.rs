//! NRF error types

use nfsim_core::NfType;
use thiserror::Error;

/// NRF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NrfError {
    #[error("NF instance already registered: {0}")]
    AlreadyRegistered(String),

    #[error("NF instance not found: {0}")]
    NotFound(String),

    #[error("No available NF service for type {0}")]
    Unavailable(NfType),
}

pub type NrfResult<T> = Result<T, NrfError>;
