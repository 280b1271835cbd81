//! nfsim - 5G Core Network Function Simulator
//!
//! Wires the network function crates together behind [`Simulator`]:
//! core NFs and gNodeBs run as actors, UEs are simulated in-process, and the
//! scenario steps drive them through their mailboxes.

pub mod error;
pub mod simulator;
pub mod ue;


pub use error::{SimError, SimResult};
pub use simulator::Simulator;
pub use ue::{UeState, UserEquipment};
