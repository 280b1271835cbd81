//! nfsim SMF (Session Management Function)
//!
//! Owns PDU sessions: creation with address allocation, activation,
//! modification, release and termination, plus per-session traffic counters.

pub mod context;
pub mod error;
pub mod smf_sm;


pub use context::{PduSessionContext, SmfContext};
pub use error::{SmfError, SmfResult};
pub use smf_sm::DEFAULT_SNSSAI;
