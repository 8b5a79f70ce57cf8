#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;
mod helpers;
mod prelude;
mod req;

// Data model and derivations
pub mod analysis;
pub mod stats;
pub mod types;

// Engines, session and persistence
pub mod config;
pub mod engine;
pub mod session;
pub mod store;

// Re-exports
pub use consts::*;
pub use errors::{ContractBreach, Error, ValidationError};
pub use helpers::{format_stat, BaseUrl};
pub use req::HttpClient;
pub use config::AppConfig;
pub use engine::{HttpEngine, LocalEngine, LocalEngineConfig, SimulationEngine};
pub use session::{preview_distribution, run_scenario, ResultsSession, RunTicket, SharedSession};
pub use store::{FileKvStore, KeyValueStore, MemoryKvStore, ScenarioStore};
pub use types::*;
