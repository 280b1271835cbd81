//! nfsim gNodeB (5G radio node)
//!
//! Tracks the cells of one radio node, the UEs attached to it and the
//! traffic carried over the radio side.

pub mod context;
pub mod error;
pub mod gnb_sm;

pub use context::{CellInfo, GnbContext, MAX_CELLS_PER_GNB, MAX_UES_PER_GNB};
pub use error::{GnbError, GnbResult};
