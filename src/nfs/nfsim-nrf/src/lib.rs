//! nfsim NRF (Network Repository Function)
//!
//! The NRF keeps the service directory of the simulated core:
//! - Registration and deregistration of NF instance profiles
//! - Discovery of available instances by NF type
//! - Availability updates

pub mod context;
pub mod error;
pub mod nrf_sm;

pub use context::NrfContext;
pub use error::{NrfError, NrfResult};
