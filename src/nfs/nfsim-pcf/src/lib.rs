//! nfsim PCF (Policy Control Function)
//!
//! Installs per-session policy rules and keeps a charging ledger per UE.

pub mod context;
pub mod error;
pub mod pcf_sm;

pub use context::{
    PcfContext, PolicyRule, BYTES_PER_CHARGE_UNIT, SESSION_POLICY_BITRATE, SESSION_POLICY_PRIORITY,
};
pub use error::{PcfError, PcfResult};
