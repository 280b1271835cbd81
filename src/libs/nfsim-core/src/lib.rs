//! nfsim Core Library
//!
//! Shared building blocks for the simulated 5G core network functions:
//! identifiers and NF types, the typed message set, the actor mailbox and
//! runtime, fixed-capacity containers, configuration, logging setup and the
//! packet capture writer.

pub mod actor;
pub mod bounded;
pub mod capture;
pub mod config;
pub mod logging;
pub mod message;
pub mod queue;
pub mod types;


pub use actor::{ActorError, ActorHandle, Dispatch, DispatchError, NetworkFunction, NfInstance};
pub use bounded::{BoundedMap, BoundedVec, CapacityError};
pub use capture::{CaptureError, CaptureResult, PcapWriter};
pub use config::{ConfigError, ConfigResult, SimConfig};
pub use logging::{init_logging, LogConfig};
pub use message::{Envelope, Message, MessageType};
pub use queue::{Mailbox, PopResult};
pub use types::*;
