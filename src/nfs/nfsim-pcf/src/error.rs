//! PCF error types

use thiserror::Error;

/// PCF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PcfError {
    #[error("Policy not found: {0}")]
    NotFound(String),
}

pub type PcfResult<T> = Result<T, PcfError>;
