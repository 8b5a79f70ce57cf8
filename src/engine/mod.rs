//! Simulation engine abstraction.
//!
//! The client never samples or evaluates formulas itself; it hands a
//! [`SimulationRequest`] to an engine and receives a [`SimulateReply`].
//!
//! # Implementations
//!
//! - [`HttpEngine`]: remote engine over JSON/HTTP
//! - [`LocalEngine`]: in-process reference engine, also servable over HTTP via [`serve`]

pub mod http;
pub mod local;
pub mod server;

use async_trait::async_trait;

use crate::prelude::Result;
use crate::types::{Distribution, PreviewReply, SimulateReply, SimulationRequest};

pub use http::HttpEngine;
pub use local::{LocalEngine, LocalEngineConfig};
pub use server::{router, serve};

/// Boundary between the scenario model and whatever produces results.
///
/// `Err` means the exchange itself failed (transport, unreadable body).
/// An engine that ran and refused the request answers `Ok(SimulateReply::Error)`.
#[async_trait]
pub trait SimulationEngine: Send + Sync {
    /// Run a full simulation.
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulateReply>;

    /// Draw preview samples for a single distribution.
    async fn preview(&self, distribution: &Distribution) -> Result<PreviewReply>;

    /// Short name for logs.
    fn label(&self) -> &'static str;
}
