//! gNodeB error types

use nfsim_core::{GnbId, UeId};
use thiserror::Error;

/// gNodeB errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GnbError {
    #[error("gNodeB {gnb_id} already has maximum cells ({capacity})")]
    CellCapacityExceeded { gnb_id: GnbId, capacity: usize },

    #[error("UE {ue_id} already connected to gNodeB {gnb_id}")]
    AlreadyConnected { gnb_id: GnbId, ue_id: UeId },

    #[error("gNodeB {gnb_id} at maximum UE capacity ({capacity})")]
    UeCapacityExceeded { gnb_id: GnbId, capacity: usize },
}

pub type GnbResult<T> = Result<T, GnbError>;
