pub mod analytics;
pub mod cache;
pub mod cognitive;
pub mod config;
pub mod engine;
pub mod error;
pub mod irt;
pub mod logging;
pub mod revision;
pub mod store;
pub mod types;
pub mod workers;

pub use config::EngineConfig;
pub use engine::ReadinessEngine;
pub use error::EngineError;
