//! nfsim UPF (User Plane Function)
//!
//! Forwards user-plane traffic for attached PDU sessions and keeps
//! per-session and total volume counters along with QoS rates.

pub mod context;
pub mod error;
pub mod upf_sm;

pub use context::{ForwardingRecord, UpfContext, DEFAULT_QOS_RATE_KBPS};
pub use error::{UpfError, UpfResult};
