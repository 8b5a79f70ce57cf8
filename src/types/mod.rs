//! Value types for scenarios and the engine contract.
//!
//! Everything here is plain data: scenarios are built from these, projected
//! into a [`SimulationRequest`], and replies come back as [`SimulateReply`].

mod contract;
mod distribution;
mod results;
mod scenario;

pub use contract::*;
pub use distribution::*;
pub use results::*;
pub use scenario::*;
