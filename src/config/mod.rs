//! Configuration module

pub mod settings;

pub use settings::{BackendConfig, GeminiConfig, LoggingConfig, ResolverConfig, ServerConfig, Settings};
