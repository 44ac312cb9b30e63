pub mod cache;
pub mod config;
pub mod logging;
pub mod registry;
pub mod resolver;

pub use resolver::engine::{EngineBuilder, ResolutionEngine};
pub use shadeload_api as api;
