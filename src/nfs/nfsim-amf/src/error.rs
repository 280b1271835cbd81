//! AMF error types

use nfsim_core::{GnbId, Imei, Imsi, UeId};
use thiserror::Error;

/// AMF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmfError {
    #[error("UE already registered: {0}")]
    Duplicate(UeId),

    #[error("Invalid IMSI {imsi} for UE {ue_id}")]
    InvalidImsi { ue_id: UeId, imsi: Imsi },

    #[error("Invalid IMEI {imei} for UE {ue_id}")]
    InvalidImei { ue_id: UeId, imei: Imei },

    #[error("UE not registered: {0}")]
    NotFound(UeId),

    #[error("IMSI mismatch for UE {ue_id}")]
    IdentityMismatch { ue_id: UeId },

    #[error("UE not authenticated: {0}")]
    NotAuthenticated(UeId),

    #[error("Source gNodeB mismatch for UE {ue_id}: expected {expected}, connected to {actual:?}")]
    SourceMismatch {
        ue_id: UeId,
        expected: GnbId,
        actual: Option<GnbId>,
    },
}

pub type AmfResult<T> = Result<T, AmfError>;
