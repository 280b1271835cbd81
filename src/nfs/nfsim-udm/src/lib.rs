//! nfsim UDM (Unified Data Management)
//!
//! The UDM handles subscriber authentication:
//! - Challenge generation and response verification
//! - Subscription cache
//! - Public key store

pub mod context;
pub mod error;
pub mod udm_sm;

pub use context::{AuthContext, UdmContext, MIN_RESPONSE_LEN};
pub use error::{UdmError, UdmResult};
pub use udm_sm::REGISTRATION_RESPONSE;
