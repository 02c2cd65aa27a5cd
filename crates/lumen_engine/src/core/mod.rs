//! Engine core: configuration

pub mod config;

pub use config::{ConfigError, EngineConfig, WindowSettings};
