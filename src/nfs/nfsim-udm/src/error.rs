//! UDM error types

use nfsim_core::Imsi;
use thiserror::Error;

/// UDM errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UdmError {
    #[error("No auth context found for IMSI: {0}")]
    NoContext(Imsi),
}

pub type UdmResult<T> = Result<T, UdmError>;
