//! nfsim UDR (Unified Data Repository)
//!
//! Stores subscription data, per-UE profile attributes and access-control
//! information.

pub mod context;
pub mod error;
pub mod udr_sm;

pub use context::{ProfileData, UdrContext};
pub use error::{UdrError, UdrResult};
