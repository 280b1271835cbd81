//! nfsim AMF (Access and Mobility Management Function)
//!
//! The AMF tracks the UEs known to the core:
//! - Registration and deregistration
//! - Authentication and authorization flags
//! - gNodeB attachment and handover

pub mod amf_sm;
pub mod context;
pub mod error;


pub use context::{AmfContext, UeRegistration};
pub use error::{AmfError, AmfResult};
